// Adapters layer: concrete implementations of the domain ports.

pub mod csv_table;
pub mod html;
pub mod http;

pub use csv_table::CsvTable;
pub use html::ScraperParser;
pub use http::{HttpFetcher, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
