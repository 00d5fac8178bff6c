use crate::core::batch::BatchRunner;
use crate::domain::model::{column_letter, BatchSummary, ColumnRef, ResolutionResult, SourceRow};
use crate::domain::ports::{BatchObserver, ConfigProvider, Resolve, Table, Writeback};
use crate::utils::error::{AuditError, Result};
use async_trait::async_trait;

/// 欄位配置在批次開始時決定一次，之後不再變動
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub url_column: usize,
    pub result_column: usize,
}

/// 把結果寫到該列的結果欄；資料列序號加 1 才是表格列號（跳過標題列）
pub struct TableWriteback<'a, T: Table> {
    table: &'a T,
    column: usize,
}

impl<'a, T: Table> TableWriteback<'a, T> {
    pub fn new(table: &'a T, column: usize) -> Self {
        Self { table, column }
    }
}

#[async_trait]
impl<'a, T: Table> Writeback for TableWriteback<'a, T> {
    async fn write_result(&self, row_index: usize, result: &ResolutionResult) -> Result<()> {
        let value = result.cell_value();
        tracing::debug!(
            "Writing result to {}{}: {}",
            column_letter(self.column),
            row_index + 1,
            value
        );
        self.table.write_cell(row_index + 1, self.column, &value).await
    }
}

/// 唯讀的欄位查詢結果；標題列沒有結果欄時 `result_column` 為 `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLookup {
    pub url_column: usize,
    pub result_column: Option<usize>,
}

/// dry run 的結果：會處理的列，以及實際執行時才會新增的結果欄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub rows: Vec<SourceRow>,
    pub missing_result_column: Option<String>,
}

/// 已決定欄位並讀入資料列的批次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRun {
    pub layout: ColumnLayout,
    pub rows: Vec<SourceRow>,
}

pub struct AuditEngine<T: Table, C: ConfigProvider> {
    table: T,
    config: C,
}

impl<T: Table, C: ConfigProvider> AuditEngine<T, C> {
    pub fn new(table: T, config: C) -> Self {
        Self { table, config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// 只讀標題列，不修改表格
    pub async fn lookup_columns(&self) -> Result<ColumnLookup> {
        let header = self.table.header().await?;

        let url_ref = ColumnRef::parse(self.config.url_column());
        let url_column = url_ref
            .position_in(&header)
            .ok_or_else(|| AuditError::ColumnNotFound {
                column: url_ref.to_string(),
            })?;

        let result_column = ColumnRef::parse(self.config.result_column()).position_in(&header);
        if let Some(column) = result_column {
            Self::check_distinct(url_column, column)?;
        }

        Ok(ColumnLookup {
            url_column,
            result_column,
        })
    }

    fn check_distinct(url_column: usize, result_column: usize) -> Result<()> {
        if result_column == url_column {
            return Err(AuditError::ConfigValidationError {
                field: "result_column".to_string(),
                message: format!(
                    "result column {} is the same as the URL column",
                    column_letter(result_column)
                ),
            });
        }
        Ok(())
    }

    /// 決定欄位配置；結果欄不存在時會新增到標題列
    pub async fn resolve_columns(&self) -> Result<ColumnLayout> {
        let lookup = self.lookup_columns().await?;

        let result_column = match lookup.result_column {
            Some(column) => column,
            None => {
                let column = self.table.ensure_column(self.config.result_column().trim()).await?;
                Self::check_distinct(lookup.url_column, column)?;
                column
            }
        };

        tracing::debug!(
            "Reading URLs from column {} and writing results to column {}",
            column_letter(lookup.url_column),
            column_letter(result_column)
        );

        Ok(ColumnLayout {
            url_column: lookup.url_column,
            result_column,
        })
    }

    async fn read_source_rows(
        &self,
        url_column: usize,
        result_column: Option<usize>,
    ) -> Result<Vec<SourceRow>> {
        let rows = self.table.read_rows(self.config.row_range()).await?;

        Ok(rows
            .into_iter()
            .map(|(index, cells)| {
                let raw_url = cells.get(url_column - 1).cloned().unwrap_or_default();
                let existing = result_column
                    .and_then(|column| cells.get(column - 1))
                    .filter(|value| !value.trim().is_empty())
                    .cloned();

                SourceRow {
                    index,
                    raw_url,
                    existing_result: existing,
                }
            })
            .collect())
    }

    pub async fn load_rows(&self, layout: &ColumnLayout) -> Result<Vec<SourceRow>> {
        self.read_source_rows(layout.url_column, Some(layout.result_column))
            .await
    }

    /// 不發出任何請求也不寫入表格，只列出會被處理的列
    pub async fn plan(&self, skip_resolved: bool) -> Result<RunPlan> {
        let lookup = self.lookup_columns().await?;
        let rows = self
            .read_source_rows(lookup.url_column, lookup.result_column)
            .await?;

        let missing_result_column = lookup
            .result_column
            .is_none()
            .then(|| self.config.result_column().trim().to_string());

        Ok(RunPlan {
            rows: rows
                .into_iter()
                .filter(|row| !row.is_blank())
                .filter(|row| !(skip_resolved && row.has_result()))
                .collect(),
            missing_result_column,
        })
    }

    /// 欄位配置與資料列在這裡決定一次，之後整個批次沿用
    pub async fn prepare(&self) -> Result<PreparedRun> {
        let layout = self.resolve_columns().await?;
        let rows = self.load_rows(&layout).await?;

        if rows.is_empty() {
            tracing::warn!("⚠️ No data rows found below the header; add site URLs to the table");
        } else {
            tracing::info!("🔍 Found {} rows to process", rows.len());
        }

        Ok(PreparedRun { layout, rows })
    }

    pub async fn execute<R, O>(
        &self,
        prepared: &PreparedRun,
        resolver: &R,
        runner: &BatchRunner<O>,
    ) -> BatchSummary
    where
        R: Resolve + ?Sized,
        O: BatchObserver,
    {
        let writeback = TableWriteback::new(&self.table, prepared.layout.result_column);
        let summary = runner.run(&prepared.rows, resolver, &writeback).await;

        tracing::info!(
            "📊 Processed {} rows: {} found, {} not found, {} failed, {} skipped",
            summary.processed,
            summary.found,
            summary.not_found,
            summary.failed,
            summary.skipped
        );
        if summary.needs_rerun() {
            tracing::warn!(
                "⚠️ Results for rows {:?} could not be written; re-run them",
                summary.rerun_rows
            );
        }

        summary
    }

    pub async fn run<R, O>(&self, resolver: &R, runner: &BatchRunner<O>) -> Result<BatchSummary>
    where
        R: Resolve + ?Sized,
        O: BatchObserver,
    {
        let prepared = self.prepare().await?;
        Ok(self.execute(&prepared, resolver, runner).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::BatchOptions;
    use crate::domain::model::{RowEvent, RowRange};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MemoryTable {
        rows: Arc<Mutex<Vec<Vec<String>>>>,
        writes: Arc<Mutex<Vec<(usize, usize, String)>>>,
        header_reads: Arc<AtomicUsize>,
    }

    impl MemoryTable {
        fn from_rows(rows: &[&[&str]]) -> Self {
            let rows = rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect();
            Self {
                rows: Arc::new(Mutex::new(rows)),
                writes: Arc::new(Mutex::new(Vec::new())),
                header_reads: Arc::new(AtomicUsize::new(0)),
            }
        }

        async fn writes(&self) -> Vec<(usize, usize, String)> {
            self.writes.lock().await.clone()
        }

        async fn snapshot(&self) -> Vec<Vec<String>> {
            self.rows.lock().await.clone()
        }

        fn header_reads(&self) -> usize {
            self.header_reads.load(Ordering::SeqCst)
        }
    }

    impl Table for MemoryTable {
        async fn header(&self) -> Result<Vec<String>> {
            self.header_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().await.first().cloned().unwrap_or_default())
        }

        async fn read_rows(&self, range: RowRange) -> Result<Vec<(usize, Vec<String>)>> {
            let rows = self.rows.lock().await;
            Ok(rows
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(i, _)| range.contains(*i))
                .map(|(i, cells)| (i, cells.clone()))
                .collect())
        }

        async fn write_cell(&self, row: usize, column: usize, value: &str) -> Result<()> {
            self.writes
                .lock()
                .await
                .push((row, column, value.to_string()));
            Ok(())
        }

        async fn ensure_column(&self, name: &str) -> Result<usize> {
            let mut rows = self.rows.lock().await;
            rows[0].push(name.to_string());
            Ok(rows[0].len())
        }
    }

    struct TestConfig {
        url_column: String,
        result_column: String,
        range: RowRange,
    }

    impl TestConfig {
        fn new(url_column: &str, result_column: &str) -> Self {
            Self {
                url_column: url_column.to_string(),
                result_column: result_column.to_string(),
                range: RowRange::all(),
            }
        }
    }

    impl ConfigProvider for TestConfig {
        fn source_path(&self) -> &str {
            "memory"
        }
        fn url_column(&self) -> &str {
            &self.url_column
        }
        fn result_column(&self) -> &str {
            &self.result_column
        }
        fn privacy_terms(&self) -> Vec<String> {
            vec!["privacy".to_string()]
        }
        fn timeout_secs(&self) -> u64 {
            10
        }
        fn user_agent(&self) -> &str {
            "test"
        }
        fn concurrency(&self) -> usize {
            1
        }
        fn skip_resolved(&self) -> bool {
            false
        }
        fn collect_all(&self) -> bool {
            false
        }
        fn row_range(&self) -> RowRange {
            self.range
        }
    }

    struct MapResolver(HashMap<String, ResolutionResult>);

    #[async_trait]
    impl Resolve for MapResolver {
        async fn resolve(&self, url: &str) -> Result<ResolutionResult> {
            Ok(self.0.get(url).cloned().unwrap_or(ResolutionResult::NotFound))
        }
    }

    struct NullObserver;

    impl BatchObserver for NullObserver {
        fn on_event(&self, _event: &RowEvent) {}
    }

    #[tokio::test]
    async fn test_columns_by_letter_and_name() {
        let table = MemoryTable::from_rows(&[&["Company", "Website", "Privacy"]]);
        let engine = AuditEngine::new(table, TestConfig::new("website", "C"));

        let layout = engine.resolve_columns().await.unwrap();
        assert_eq!(
            layout,
            ColumnLayout {
                url_column: 2,
                result_column: 3
            }
        );
    }

    #[tokio::test]
    async fn test_missing_result_column_is_added() {
        let table = MemoryTable::from_rows(&[&["site"]]);
        let engine = AuditEngine::new(table.clone(), TestConfig::new("site", "privacy_url"));

        let layout = engine.resolve_columns().await.unwrap();

        assert_eq!(layout.result_column, 2);
        assert_eq!(table.header().await.unwrap(), vec!["site", "privacy_url"]);
    }

    #[tokio::test]
    async fn test_unknown_url_column_is_fatal() {
        let table = MemoryTable::from_rows(&[&["site"]]);
        let engine = AuditEngine::new(table, TestConfig::new("homepage", "B"));

        let err = engine.resolve_columns().await.unwrap_err();
        assert!(matches!(err, AuditError::ColumnNotFound { .. }));
    }

    #[tokio::test]
    async fn test_same_url_and_result_column_rejected() {
        let table = MemoryTable::from_rows(&[&["site"]]);
        let engine = AuditEngine::new(table, TestConfig::new("A", "site"));

        assert!(engine.resolve_columns().await.is_err());
    }

    #[tokio::test]
    async fn test_run_writes_below_header() {
        let table = MemoryTable::from_rows(&[
            &["site", "privacy"],
            &["a.test"],
            &[""],
            &["b.test", "old"],
        ]);
        let engine = AuditEngine::new(table.clone(), TestConfig::new("A", "B"));
        let resolver = MapResolver(HashMap::from([(
            "https://a.test".to_string(),
            ResolutionResult::Found("https://a.test/privacy".to_string()),
        )]));
        let runner = BatchRunner::new(BatchOptions::default(), NullObserver);

        let summary = engine.run(&resolver, &runner).await.unwrap();

        assert_eq!(
            table.writes().await,
            vec![
                (2, 2, "https://a.test/privacy".to_string()),
                (4, 2, "Not found".to_string()),
            ]
        );
        assert_eq!(summary.total, 3);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_plan_lists_pending_rows() {
        let table = MemoryTable::from_rows(&[
            &["site", "privacy"],
            &["a.test", "https://a.test/privacy"],
            &["  "],
            &["c.test"],
        ]);
        let engine = AuditEngine::new(table, TestConfig::new("site", "privacy"));

        let all: Vec<usize> = engine.plan(false).await.unwrap().rows.iter().map(|r| r.index).collect();
        let pending: Vec<usize> = engine.plan(true).await.unwrap().rows.iter().map(|r| r.index).collect();

        assert_eq!(all, vec![1, 3]);
        assert_eq!(pending, vec![3]);
    }

    #[tokio::test]
    async fn test_plan_leaves_header_untouched() {
        let table = MemoryTable::from_rows(&[&["site"], &["example.com"]]);
        let engine = AuditEngine::new(table.clone(), TestConfig::new("site", "privacy_url"));

        let plan = engine.plan(false).await.unwrap();

        assert_eq!(plan.missing_result_column.as_deref(), Some("privacy_url"));
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(table.snapshot().await, vec![vec!["site"], vec!["example.com"]]);
        assert!(table.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_prepared_run_reads_header_once() {
        let table = MemoryTable::from_rows(&[&["site", "privacy"], &["a.test"], &["b.test"]]);
        let engine = AuditEngine::new(table.clone(), TestConfig::new("A", "B"));
        let resolver = MapResolver(HashMap::new());
        let runner = BatchRunner::new(BatchOptions::default(), NullObserver);

        let prepared = engine.prepare().await.unwrap();
        assert_eq!(prepared.rows.len(), 2);
        let summary = engine.execute(&prepared, &resolver, &runner).await;

        assert_eq!(table.header_reads(), 1);
        assert_eq!(summary.not_found, 2);
        assert_eq!(
            table.writes().await,
            vec![(2, 2, "Not found".to_string()), (3, 2, "Not found".to_string())]
        );
    }
}
