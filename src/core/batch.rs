use crate::domain::model::{BatchSummary, ResolutionResult, RowEvent, SkipReason, SourceRow};
use crate::domain::ports::{BatchObserver, ConfigProvider, Resolve, Writeback};
use futures::{stream, FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// 結果欄已有值的列直接略過
    pub skip_resolved: bool,
    /// 同時進行的解析數；寫回仍依列序逐筆進行
    pub concurrency: usize,
}

impl BatchOptions {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            skip_resolved: config.skip_resolved(),
            concurrency: config.concurrency().max(1),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            skip_resolved: false,
            concurrency: 1,
        }
    }
}

enum RowOutcome {
    Skipped(usize, SkipReason),
    Resolved(usize, ResolutionResult),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 逐列執行解析並立即寫回。單列的任何錯誤都在該列內轉成 `Failed`，
/// 不會中斷整批；寫回失敗的列記錄在 `BatchSummary::rerun_rows`。
pub struct BatchRunner<O: BatchObserver> {
    options: BatchOptions,
    observer: O,
    cancel: Arc<AtomicBool>,
}

impl<O: BatchObserver> BatchRunner<O> {
    pub fn new(options: BatchOptions, observer: O) -> Self {
        Self {
            options,
            observer,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    async fn process_row<R: Resolve + ?Sized>(
        &self,
        position: usize,
        total: usize,
        row: &SourceRow,
        resolver: &R,
    ) -> RowOutcome {
        if row.is_blank() {
            return RowOutcome::Skipped(row.index, SkipReason::Blank);
        }
        if self.options.skip_resolved && row.has_result() {
            return RowOutcome::Skipped(row.index, SkipReason::AlreadyResolved);
        }

        let url = row.normalized_url();
        self.observer.on_event(&RowEvent::Started {
            index: row.index,
            position,
            total,
            url: url.to_string(),
        });

        let result = match AssertUnwindSafe(resolver.resolve(url.as_str()))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ResolutionResult::Failed(e.to_string()),
            Err(payload) => ResolutionResult::Failed(format!(
                "unexpected error: {}",
                panic_message(payload.as_ref())
            )),
        };

        RowOutcome::Resolved(row.index, result)
    }

    pub async fn run<R, W>(&self, rows: &[SourceRow], resolver: &R, writeback: &W) -> BatchSummary
    where
        R: Resolve + ?Sized,
        W: Writeback + ?Sized,
    {
        let total = rows.len();
        let mut summary = BatchSummary::new(total);

        // buffered() 依輸入順序產出，寫回因此永遠照列序
        let outcomes = stream::iter(rows.iter().enumerate())
            .map(|(offset, row)| self.process_row(offset + 1, total, row, resolver))
            .buffered(self.options.concurrency.max(1));
        futures::pin_mut!(outcomes);

        let mut handled = 0;
        while handled < total {
            if self.is_cancelled() {
                tracing::warn!(
                    "⚠️ Batch cancelled after {} of {} rows",
                    handled,
                    total
                );
                summary.cancelled = true;
                break;
            }

            let Some(outcome) = outcomes.next().await else {
                break;
            };
            handled += 1;

            match outcome {
                RowOutcome::Skipped(index, reason) => {
                    summary.skipped += 1;
                    self.observer.on_event(&RowEvent::Skipped { index, reason });
                }
                RowOutcome::Resolved(index, result) => {
                    self.observer.on_event(&RowEvent::Resolved {
                        index,
                        result: result.clone(),
                    });

                    match writeback.write_result(index, &result).await {
                        Ok(()) => summary.record(&result),
                        Err(e) => {
                            tracing::error!("❌ Failed to write result for row {}: {}", index, e);
                            summary.rerun_rows.push(index);
                            self.observer.on_event(&RowEvent::WritebackFailed {
                                index,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        summary.finish();
        summary
    }
}
