use crate::domain::model::{ResolutionResult, RowEvent, SkipReason};
use crate::domain::ports::BatchObserver;

/// 把每列事件寫進 tracing 日誌
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BatchObserver for TracingObserver {
    fn on_event(&self, event: &RowEvent) {
        match event {
            RowEvent::Started {
                index,
                position,
                total,
                url,
            } => tracing::info!(row = *index, "[{}/{}] Checking {}", position, total, url),
            RowEvent::Resolved { index, result } => match result {
                ResolutionResult::Found(link) => {
                    tracing::info!(row = *index, "✅ Privacy link: {}", link)
                }
                ResolutionResult::NotFound => {
                    tracing::warn!(row = *index, "No privacy link found")
                }
                ResolutionResult::Failed(reason) => {
                    tracing::error!(row = *index, "❌ Check failed: {}", reason)
                }
            },
            RowEvent::Skipped { index, reason } => match reason {
                SkipReason::Blank => tracing::debug!(row = *index, "Skipping empty row"),
                SkipReason::AlreadyResolved => {
                    tracing::debug!(row = *index, "Skipping row with existing result")
                }
            },
            RowEvent::WritebackFailed { index, error } => {
                tracing::error!(row = *index, "❌ Write-back failed, row needs a re-run: {}", error)
            }
        }
    }
}

impl<A: BatchObserver, B: BatchObserver> BatchObserver for (A, B) {
    fn on_event(&self, event: &RowEvent) {
        self.0.on_event(event);
        self.1.on_event(event);
    }
}

impl<O: BatchObserver> BatchObserver for Option<O> {
    fn on_event(&self, event: &RowEvent) {
        if let Some(observer) = self {
            observer.on_event(event);
        }
    }
}

#[cfg(feature = "cli")]
pub use bar::ProgressBarObserver;

#[cfg(feature = "cli")]
mod bar {
    use super::*;
    use indicatif::{ProgressBar, ProgressStyle};

    pub struct ProgressBarObserver {
        bar: ProgressBar,
    }

    impl ProgressBarObserver {
        pub fn new(total: usize) -> Self {
            let bar = ProgressBar::new(total as u64);
            let style = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            bar.set_style(style);
            Self { bar }
        }

        pub fn finish(&self) {
            self.bar.finish_and_clear();
        }
    }

    impl BatchObserver for ProgressBarObserver {
        fn on_event(&self, event: &RowEvent) {
            match event {
                RowEvent::Started { url, .. } => self.bar.set_message(url.clone()),
                RowEvent::Resolved { .. } | RowEvent::Skipped { .. } => self.bar.inc(1),
                RowEvent::WritebackFailed { .. } => {}
            }
        }
    }
}
