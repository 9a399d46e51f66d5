//! JSON Data Context
//!
//! `serde_json::Value`上のデータコンテキスト実装。
//! ノードはJSON Pointerで表し、パス解決時に配列は要素へ展開します。

use std::collections::BTreeMap;
use std::io::Read;

use serde_json::Value;

use super::DataContext;
use crate::error::ReportError;

/// JSONドキュメントを対象とするデータコンテキスト
///
/// # 使用例
///
/// ```rust
/// use serde_json::json;
/// use xlsxreport::{DataContext, JsonContext};
///
/// let mut ctx = JsonContext::new(json!({"customers": [{"name": "A"}, {"name": "B"}]}));
/// let nodes = ctx.query("customers");
/// assert_eq!(nodes.len(), 2);
///
/// ctx.cache("customers", nodes[1].clone());
/// assert_eq!(ctx.get("customers", "name", false), "B");
/// ctx.release("customers");
/// assert_eq!(ctx.get("customers", "name", false), "");
/// ```
#[derive(Debug, Clone)]
pub struct JsonContext {
    root: Value,
    /// 正規化パス -> 積まれたノードのスタック
    cache: BTreeMap<String, Vec<Layer>>,
    /// 積んだ順序を表す通し番号
    seq: u64,
}

/// パスに積まれたノード1つ分
#[derive(Debug, Clone)]
struct Layer {
    ptr: String,
    seq: u64,
    /// 子孫の無効化で退避した、この層より前に積まれた子孫の層
    hidden: Vec<(String, Vec<Layer>)>,
}

impl JsonContext {
    pub fn new(root: Value) -> Self {
        Self {
            root,
            cache: BTreeMap::new(),
            seq: 0,
        }
    }

    /// リーダーからJSONを読み込む
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReportError> {
        Ok(Self::new(serde_json::from_reader(reader)?))
    }

    /// JSON文字列から生成
    pub fn from_json_str(json: &str) -> Result<Self, ReportError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// パスに積まれているノードの値
    pub fn cached(&self, path: &str) -> Option<&Value> {
        self.top(&normalize(path))
            .and_then(|ptr| self.root.pointer(ptr))
    }

    /// 現在キャッシュされているパスの数
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    fn top(&self, key: &str) -> Option<&String> {
        self.cache.get(key).and_then(|stack| stack.last()).map(|l| &l.ptr)
    }

    /// 子孫パスのスタックをすべて取り出す
    fn take_descendants(&mut self, key: &str) -> Vec<(String, Vec<Layer>)> {
        let keys: Vec<String> = self
            .cache
            .keys()
            .filter(|k| is_descendant(key, k))
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|k| self.cache.remove_entry(&k))
            .collect()
    }

    /// 退避していた層を積み順どおりに戻す
    fn restore(&mut self, entries: Vec<(String, Vec<Layer>)>) {
        for (key, layers) in entries {
            let stack = self.cache.entry(key).or_default();
            stack.extend(layers);
            stack.sort_by_key(|l| l.seq);
        }
    }

    /// 配列は要素へ展開し、nullは除外する
    fn expand(&self, ptr: String) -> Vec<String> {
        match self.root.pointer(&ptr) {
            Some(Value::Array(items)) => (0..items.len()).map(|i| format!("{}/{}", ptr, i)).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => vec![ptr],
        }
    }

    /// パスをノード列に解決
    fn resolve(&self, path: &str, allow_root: bool) -> Vec<String> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let cached = (0..=segments.len()).rev().find_map(|k| {
            self.top(&segments[..k].join("/"))
                .map(|ptr| (vec![ptr.clone()], &segments[k..]))
        });

        let (mut current, rest) = match cached {
            Some(found) => found,
            None if allow_root => (self.expand(String::new()), &segments[..]),
            None => return Vec::new(),
        };

        for segment in rest {
            current = current
                .into_iter()
                .filter(|ptr| {
                    self.root
                        .pointer(ptr)
                        .and_then(Value::as_object)
                        .is_some_and(|map| map.contains_key(*segment))
                })
                .flat_map(|ptr| self.expand(format!("{}/{}", ptr, escape(segment))))
                .collect();
        }

        current
    }
}

impl DataContext for JsonContext {
    type Node = String;

    fn query(&self, path: &str) -> Vec<String> {
        self.resolve(path, true)
    }

    fn cache(&mut self, path: &str, node: String) {
        self.seq += 1;
        self.cache.entry(normalize(path)).or_default().push(Layer {
            ptr: node,
            seq: self.seq,
            hidden: Vec::new(),
        });
    }

    fn clear_children(&mut self, path: &str) {
        let key = normalize(path);
        let descendants = self.take_descendants(&key);
        // 積まれていないパスでは子孫を破棄するだけ
        let Some(top) = self.cache.get_mut(&key).and_then(|stack| stack.last_mut()) else {
            return;
        };
        let seq = top.seq;
        for (child, layers) in descendants {
            retain_older(child, layers, seq, &mut top.hidden);
        }
    }

    fn release(&mut self, path: &str) {
        let key = normalize(path);
        let Some(layer) = self.cache.get_mut(&key).and_then(Vec::pop) else {
            return;
        };
        if self.cache.get(&key).is_some_and(Vec::is_empty) {
            self.cache.remove(&key);
        }

        // この層より後に積まれた子孫は破棄し、退避していた層を戻す
        let mut kept = Vec::new();
        for (child, layers) in self.take_descendants(&key) {
            retain_older(child, layers, layer.seq, &mut kept);
        }
        kept.extend(layer.hidden);
        self.restore(kept);
    }

    fn get(&self, location: &str, attribute: &str, allow_search: bool) -> String {
        self.resolve(location, allow_search)
            .first()
            .and_then(|ptr| self.root.pointer(ptr))
            .and_then(Value::as_object)
            .and_then(|map| {
                map.get(attribute)
                    .or_else(|| map.get(attribute.trim_start_matches('@')))
            })
            .map(scalar_to_string)
            .unwrap_or_default()
    }
}

/// `seq`より前に積まれた層だけを`kept`に残す
///
/// 破棄する層が退避していた古い層も拾い上げます。
fn retain_older(key: String, layers: Vec<Layer>, seq: u64, kept: &mut Vec<(String, Vec<Layer>)>) {
    let mut older = Vec::new();
    for layer in layers {
        if layer.seq < seq {
            older.push(layer);
        } else {
            for (child, hidden) in layer.hidden {
                retain_older(child, hidden, seq, kept);
            }
        }
    }
    if !older.is_empty() {
        kept.push((key, older));
    }
}

fn is_descendant(key: &str, candidate: &str) -> bool {
    if key.is_empty() {
        return !candidate.is_empty();
    }
    candidate
        .strip_prefix(key)
        .is_some_and(|rest| rest.starts_with('/'))
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// JSON Pointerのエスケープ（RFC 6901）
fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
