//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use crate::error::ReportError;

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// A1形式の文字列から座標を生成（例: "B3" -> (2, 1)）
    ///
    /// # 戻り値
    ///
    /// * `Ok(CellCoord)` - 変換に成功した場合
    /// * `Err(ReportError::Structural)` - 列文字または行番号が不正な場合
    pub fn from_a1(a1: &str) -> Result<Self, ReportError> {
        let a1 = a1.trim();
        let split = a1
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(a1.len());
        let (letters, digits) = a1.split_at(split);

        if letters.is_empty() {
            return Err(ReportError::Structural(format!(
                "Missing column letters in cell reference '{}'",
                a1
            )));
        }

        let row: u32 = digits.parse().map_err(|e| {
            ReportError::Structural(format!("Invalid row in cell reference '{}': {}", a1, e))
        })?;
        if row == 0 {
            return Err(ReportError::Structural(format!(
                "Row numbers start at 1 in cell reference '{}'",
                a1
            )));
        }

        Ok(Self::new(row - 1, Self::letter_to_col_index(letters)?))
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }

    /// 列文字をインデックスに変換（"A" -> 0, "AZ" -> 51）
    fn letter_to_col_index(letters: &str) -> Result<u32, ReportError> {
        let mut index: u32 = 0;
        for ch in letters.chars() {
            let digit = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            index = index
                .checked_mul(26)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| {
                    ReportError::Structural(format!("Column '{}' is out of range", letters))
                })?;
        }
        Ok(index - 1)
    }
}

/// テンプレートシート上の生のセル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCell {
    /// セル座標
    pub coord: CellCoord,
    /// セルのテキスト（マクロを含む）
    pub text: String,
}

/// テンプレートシート
///
/// テンプレートブックの1シート分のセルテキストです。calamineで読み込むか、
/// コード上で`with_cell`を使って組み立てます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSheet {
    /// シート名（マクロを含む場合は複数シートに展開される）
    pub name: String,
    /// 空でないセルのリスト
    pub cells: Vec<TemplateCell>,
}

impl TemplateSheet {
    /// 空のシートを生成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: Vec::new(),
        }
    }

    /// 0始まりの座標でセルを追加
    pub fn push_cell(&mut self, row: u32, col: u32, text: impl Into<String>) {
        self.cells.push(TemplateCell {
            coord: CellCoord::new(row, col),
            text: text.into(),
        });
    }

    /// A1記法でセルを追加（ビルダー形式）
    ///
    /// ```rust
    /// use xlsxreport::TemplateSheet;
    ///
    /// let sheet = TemplateSheet::new("Invoice")
    ///     .with_cell("A1", "$g.title$")?
    ///     .with_cell("A3", "#items.name#")?
    ///     .with_cell("A5", "#end#")?;
    /// assert_eq!(sheet.cells.len(), 3);
    /// # Ok::<(), xlsxreport::ReportError>(())
    /// ```
    pub fn with_cell(mut self, a1: &str, text: impl Into<String>) -> Result<Self, ReportError> {
        let coord = CellCoord::from_a1(a1)?;
        self.cells.push(TemplateCell {
            coord,
            text: text.into(),
        });
        Ok(self)
    }
}
