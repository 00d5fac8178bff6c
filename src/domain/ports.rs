use crate::domain::model::{Anchor, FetchOutcome, ResolutionResult, RowEvent, RowRange};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 表格資料來源。列與欄皆為 1-based，第 1 列是標題列。
pub trait Table: Send + Sync {
    fn header(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// 讀取資料列，回傳 `(資料列序號, 儲存格)`；序號不含標題列
    fn read_rows(
        &self,
        range: RowRange,
    ) -> impl std::future::Future<Output = Result<Vec<(usize, Vec<String>)>>> + Send;

    /// `row` 是表格列號（標題列為 1）
    fn write_cell(
        &self,
        row: usize,
        column: usize,
        value: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// 找不到同名欄位時在標題列尾端新增，回傳欄號
    fn ensure_column(&self, name: &str) -> impl std::future::Future<Output = Result<usize>> + Send;
}

pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl std::future::Future<Output = FetchOutcome> + Send;
}

pub trait DocumentParser: Send + Sync {
    fn find_links(&self, body: &str) -> Result<Vec<Anchor>>;
}

#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolutionResult>;
}

#[async_trait]
pub trait Writeback: Send + Sync {
    /// `row_index` 是資料列序號（不含標題列）
    async fn write_result(&self, row_index: usize, result: &ResolutionResult) -> Result<()>;
}

pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &RowEvent);
}

pub trait ConfigProvider: Send + Sync {
    fn source_path(&self) -> &str;
    fn url_column(&self) -> &str;
    fn result_column(&self) -> &str;
    fn privacy_terms(&self) -> Vec<String>;
    fn timeout_secs(&self) -> u64;
    fn user_agent(&self) -> &str;
    fn concurrency(&self) -> usize;
    fn skip_resolved(&self) -> bool;
    fn collect_all(&self) -> bool;
    fn row_range(&self) -> RowRange;
}
