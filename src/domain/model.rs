use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 結果欄位中代表「已檢查但找不到」的文字
pub const NOT_FOUND_CELL: &str = "Not found";
/// 失敗結果的前綴
pub const FAILED_CELL_PREFIX: &str = "Error: ";

/// 表格中的一列資料；`index` 從 1 開始，不含標題列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub index: usize,
    pub raw_url: String,
    pub existing_result: Option<String>,
}

impl SourceRow {
    pub fn new(index: usize, raw_url: impl Into<String>) -> Self {
        Self {
            index,
            raw_url: raw_url.into(),
            existing_result: None,
        }
    }

    pub fn with_existing_result(mut self, value: impl Into<String>) -> Self {
        self.existing_result = Some(value.into());
        self
    }

    pub fn is_blank(&self) -> bool {
        self.raw_url.trim().is_empty()
    }

    pub fn has_result(&self) -> bool {
        self.existing_result
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }

    pub fn normalized_url(&self) -> NormalizedUrl {
        NormalizedUrl::new(&self.raw_url)
    }
}

/// 補上 scheme 後的 URL；沒有 `http://` 或 `https://` 時加上 `https://`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self(trimmed.to_string())
        } else {
            Self(format!("https://{}", trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success {
        status: u16,
        /// 依回應宣告的 charset 解碼後的內容
        body: String,
        effective_url: String,
    },
    TransportFailure(String),
    HttpError(u16),
}

/// 從頁面擷取出的超連結，依文件順序排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: Option<String>,
    pub text: String,
}

impl Anchor {
    pub fn new(href: Option<&str>, text: &str) -> Self {
        Self {
            href: href.map(str::to_string),
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSignal {
    AnchorText,
    HrefPattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub target_url: String,
    pub source_signal: SourceSignal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionResult {
    Found(String),
    NotFound,
    Failed(String),
}

impl ResolutionResult {
    pub fn transport_failure(reason: &str) -> Self {
        ResolutionResult::Failed(format!("transport: {}", reason))
    }

    pub fn http_status(status: u16) -> Self {
        ResolutionResult::Failed(format!("http status {}", status))
    }

    /// 寫回表格的文字；永遠不是空字串
    pub fn cell_value(&self) -> String {
        match self {
            ResolutionResult::Found(url) => url.clone(),
            ResolutionResult::NotFound => NOT_FOUND_CELL.to_string(),
            ResolutionResult::Failed(description) => {
                format!("{}{}", FAILED_CELL_PREFIX, description)
            }
        }
    }
}

impl fmt::Display for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cell_value())
    }
}

/// 欄位參照：標題名稱或試算表字母 (`A`, `AB`)；標題名稱優先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef(String);

impl ColumnRef {
    pub fn parse(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 字母形式的 1-based 欄號；不是字母形式時為 `None`
    pub fn letter_number(&self) -> Option<usize> {
        let is_letters = !self.0.is_empty()
            && self.0.len() <= 3
            && self.0.chars().all(|c| c.is_ascii_uppercase());
        is_letters.then(|| {
            self.0
                .chars()
                .fold(0usize, |acc, c| acc * 26 + (c as usize - 'A' as usize + 1))
        })
    }

    /// 在標題列中找出 1-based 欄號
    pub fn position_in(&self, header: &[String]) -> Option<usize> {
        header
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(&self.0))
            .map(|i| i + 1)
            .or_else(|| self.letter_number())
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn column_letter(number: usize) -> String {
    let mut n = number;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// 資料列範圍（1-based，不含標題列）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub first: usize,
    pub last: Option<usize>,
}

impl RowRange {
    pub fn all() -> Self {
        Self {
            first: 1,
            last: None,
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.first && self.last.map_or(true, |last| index <= last)
    }
}

impl Default for RowRange {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    Blank,
    AlreadyResolved,
}

/// 送給 observer 的逐列事件
#[derive(Debug, Clone, PartialEq)]
pub enum RowEvent {
    Started {
        index: usize,
        position: usize,
        total: usize,
        url: String,
    },
    Resolved {
        index: usize,
        result: ResolutionResult,
    },
    Skipped {
        index: usize,
        reason: SkipReason,
    },
    WritebackFailed {
        index: usize,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
    pub skipped: usize,
    pub rerun_rows: Vec<usize>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            found: 0,
            not_found: 0,
            failed: 0,
            skipped: 0,
            rerun_rows: Vec::new(),
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, result: &ResolutionResult) {
        self.processed += 1;
        match result {
            ResolutionResult::Found(_) => self.found += 1,
            ResolutionResult::NotFound => self.not_found += 1,
            ResolutionResult::Failed(_) => self.failed += 1,
        }
    }

    pub fn needs_rerun(&self) -> bool {
        !self.rerun_rows.is_empty()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_url_prepends_https() {
        assert_eq!(NormalizedUrl::new("example.com").as_str(), "https://example.com");
        assert_eq!(
            NormalizedUrl::new("  example.com/path ").as_str(),
            "https://example.com/path"
        );
        assert_eq!(NormalizedUrl::new("http://example.com").as_str(), "http://example.com");
        assert_eq!(NormalizedUrl::new("HTTPS://Example.com").as_str(), "HTTPS://Example.com");
    }

    #[test]
    fn test_cell_values_are_distinguishable() {
        assert_eq!(
            ResolutionResult::Found("https://a.test/privacy".to_string()).cell_value(),
            "https://a.test/privacy"
        );
        assert_eq!(ResolutionResult::NotFound.cell_value(), "Not found");
        assert_eq!(ResolutionResult::http_status(404).cell_value(), "Error: http status 404");
        assert_eq!(
            ResolutionResult::transport_failure("dns error").cell_value(),
            "Error: transport: dns error"
        );
    }

    #[test]
    fn test_column_ref_letters() {
        assert_eq!(ColumnRef::parse("A").letter_number(), Some(1));
        assert_eq!(ColumnRef::parse("B").letter_number(), Some(2));
        assert_eq!(ColumnRef::parse("AA").letter_number(), Some(27));
        assert_eq!(ColumnRef::parse("website").letter_number(), None);
        assert_eq!(column_letter(28), "AB");
        assert_eq!(column_letter(2), "B");
    }

    #[test]
    fn test_column_ref_position_in_header() {
        let header = vec!["URL".to_string(), "Privacy URL".to_string()];
        assert_eq!(ColumnRef::parse("url").position_in(&header), Some(1));
        // header name wins over the letter reading of "URL"
        assert_eq!(ColumnRef::parse("URL").position_in(&header), Some(1));
        assert_eq!(ColumnRef::parse("privacy url").position_in(&header), Some(2));
        assert_eq!(ColumnRef::parse("D").position_in(&header), Some(4));
        assert_eq!(ColumnRef::parse("missing").position_in(&header), None);
    }

    #[test]
    fn test_source_row_flags() {
        assert!(SourceRow::new(1, "   ").is_blank());
        assert!(!SourceRow::new(1, "example.com").is_blank());
        assert!(SourceRow::new(1, "example.com").with_existing_result("x").has_result());
        assert!(!SourceRow::new(1, "example.com").with_existing_result(" ").has_result());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::new(3);
        summary.record(&ResolutionResult::Found("u".to_string()));
        summary.record(&ResolutionResult::NotFound);
        summary.record(&ResolutionResult::Failed("x".to_string()));
        assert_eq!(
            (summary.processed, summary.found, summary.not_found, summary.failed),
            (3, 1, 1, 1)
        );
        assert!(!summary.needs_rerun());
    }
}
