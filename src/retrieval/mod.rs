mod driver;
mod fetcher;
mod search_body;

use std::future::Future;

use crate::error::Result;

pub use self::driver::extract_all;
pub use self::fetcher::SearchFetcher;
pub use self::search_body::build_search_body;

/// A single normalised log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub log: String,
}

impl Record {
    pub fn new(raw: &str) -> Self {
        Self {
            log: normalize_log(raw),
        }
    }
}

/// One bounded response of an offset-paginated query
#[derive(Debug, Clone)]
pub struct Page {
    pub records: Vec<Record>,
    /// Total matches for the whole index as reported by this response
    pub total_count: u64,
    pub offset: u64,
}

/// Issues one bounded search request against an index.
pub trait PageFetcher {
    /// Number of records requested per page; also the offset stride.
    fn page_size(&self) -> u64;

    fn fetch(&self, index: &str, offset: u64) -> impl Future<Output = Result<Page>> + Send;
}

/// Strip every `\r` and `\n` so a multi-line entry collapses onto one row.
/// Lossy: embedded line breaks are dropped, not replaced.
pub fn normalize_log(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}
