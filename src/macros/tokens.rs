//! MacroToken Module
//!
//! セルテキストを字句解析し、リテラルとマクロ区間のトークン列に分解します。

/// マクロ区間の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpanKind {
    /// `$...$` 単純参照
    Plain,
    /// `#...#` 繰り返しグループ
    Group,
}

/// 字句解析の結果トークン
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MacroToken {
    /// マクロ以外のリテラル文字列
    Text(String),
    /// マクロ本体（マーカーを除く）
    Macro(SpanKind, String),
}

/// 閉じたマクロ区間（マーカーを含むバイト範囲）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
}

/// テキスト中の閉じたマクロ区間を左から順に列挙
///
/// 開始マーカーと同じ文字が同じ行の中に現れた場合のみ区間として扱います。
/// 閉じられていないマーカーはリテラル文字です。
pub(crate) fn scan_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let Some((offset, ch)) = rest.char_indices().find(|(_, c)| *c == '$' || *c == '#') else {
            break;
        };
        let start = pos + offset;
        let body_start = start + ch.len_utf8();
        let kind = if ch == '$' {
            SpanKind::Plain
        } else {
            SpanKind::Group
        };

        let closing = text[body_start..]
            .char_indices()
            .take_while(|(_, c)| *c != '\n')
            .find(|(_, c)| *c == ch)
            .map(|(i, _)| body_start + i);

        match closing {
            Some(close) => {
                let end = close + ch.len_utf8();
                spans.push(Span { kind, start, end });
                pos = end;
            }
            None => pos = body_start,
        }
    }

    spans
}

/// セルテキストをトークン列に分解
pub(crate) fn tokenize(text: &str) -> Vec<MacroToken> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;

    for span in scan_spans(text) {
        if span.start > literal_start {
            tokens.push(MacroToken::Text(text[literal_start..span.start].to_string()));
        }
        tokens.push(MacroToken::Macro(
            span.kind,
            text[span.start + 1..span.end - 1].to_string(),
        ));
        literal_start = span.end;
    }

    if literal_start < text.len() {
        tokens.push(MacroToken::Text(text[literal_start..].to_string()));
    }

    tokens
}

/// マクロ区間の外側にある区切り文字でテキストを分割
///
/// `~`によるフィルタ区切りや、フィルタ引数の`,`区切りに使用します。
/// マクロ本体の中の区切り文字（例: `$a|b$`）では分割しません。
pub(crate) fn split_outside_spans(text: &str, separator: char) -> Vec<&str> {
    let spans = scan_spans(text);
    let mut parts = Vec::new();
    let mut part_start = 0;

    for (idx, ch) in text.char_indices() {
        if ch != separator {
            continue;
        }
        if spans.iter().any(|s| idx >= s.start && idx < s.end) {
            continue;
        }
        parts.push(&text[part_start..idx]);
        part_start = idx + ch.len_utf8();
    }
    parts.push(&text[part_start..]);

    parts
}
