pub mod batch;
pub mod engine;
pub mod resolver;

pub use crate::domain::model::{BatchSummary, ResolutionResult, RowEvent, SourceRow};
pub use crate::domain::ports::{
    BatchObserver, ConfigProvider, DocumentParser, Fetcher, Resolve, Table, Writeback,
};
pub use crate::utils::error::Result;
