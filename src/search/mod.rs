//! Search service access
//!
//! This module models the paginated, cursor-driven query used to read the
//! whole index:
//!
//! 1. **SearchGateway**: the query capability of the search service
//! 2. **PageFetcher**: turns the gateway into a finite sequence of batches,
//!    threading the cursor from one page to the next
//! 3. **CloudSearchClient**: HTTP implementation of the gateway

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod cloudsearch;
pub mod fetcher;

pub use cloudsearch::CloudSearchClient;
pub use fetcher::PageFetcher;

/// Wire value that asks the service for the start of the result set.
pub const INITIAL_CURSOR: &str = "initial";

/// Position in the paginated result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cursor {
    /// No page fetched yet.
    #[default]
    Initial,

    /// Token returned by the service with the previous page.
    Continuation(String),
}

impl Cursor {
    /// Value sent in the `cursor` request parameter.
    pub fn as_wire(&self) -> &str {
        match self {
            Cursor::Initial => INITIAL_CURSOR,
            Cursor::Continuation(token) => token,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::Initial => write!(f, "<initial>"),
            Cursor::Continuation(token) => write!(f, "{token}"),
        }
    }
}

/// Query predicate. Backups always read everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    MatchAll,
}

/// Which fields each hit carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnFields {
    AllFields,
}

/// One paginated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub predicate: Predicate,
    pub cursor: Cursor,
    pub page_size: u32,
    pub return_fields: ReturnFields,
}

impl SearchRequest {
    /// Match-all request returning all fields, starting at `cursor`.
    pub fn match_all(cursor: Cursor, page_size: u32) -> Self {
        Self {
            predicate: Predicate::MatchAll,
            cursor,
            page_size,
            return_fields: ReturnFields::AllFields,
        }
    }
}

/// Raw answer to one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub records: Vec<Value>,
    pub cursor: Option<String>,
    pub server_time_ms: u64,
}

/// One page of records.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBatch {
    pub records: Vec<Value>,
    /// Cursor for the page after this one.
    pub cursor: Cursor,
    pub server_time_ms: u64,
}

impl DocumentBatch {
    /// An empty batch marks the end of the result set.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Paginated query capability of the search service.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Run one query and return one page.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::error::{BackupError, SearchError};

    /// Gateway answering from a script of pages, recording every request.
    pub(crate) struct ScriptedSearch {
        pages: Mutex<VecDeque<Result<SearchResponse>>>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    impl ScriptedSearch {
        pub(crate) fn new(pages: Vec<Result<SearchResponse>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Pages of the given sizes followed by the terminating empty page.
        pub(crate) fn with_page_sizes(sizes: &[usize]) -> Self {
            let mut next_id = 0;
            let mut pages = Vec::new();
            for (i, size) in sizes.iter().enumerate() {
                let records = (0..*size)
                    .map(|_| {
                        next_id += 1;
                        serde_json::json!({ "id": next_id.to_string(), "fields": { "n": next_id } })
                    })
                    .collect();
                pages.push(Ok(page(records, &format!("c{}", i + 1), 2)));
            }
            pages.push(Ok(page(Vec::new(), "end", 1)));
            Self::new(pages)
        }

        /// Records of the non-empty pages still queued.
        pub(crate) fn page_records(&self) -> Vec<Vec<Value>> {
            self.pages
                .lock()
                .unwrap()
                .iter()
                .filter_map(|p| p.as_ref().ok())
                .filter(|p| !p.records.is_empty())
                .map(|p| p.records.clone())
                .collect()
        }

        pub(crate) fn requests(&self) -> Vec<SearchRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    pub(crate) fn page(records: Vec<Value>, cursor: &str, server_time_ms: u64) -> SearchResponse {
        SearchResponse {
            records,
            cursor: Some(cursor.to_string()),
            server_time_ms,
        }
    }

    #[async_trait]
    impl SearchGateway for ScriptedSearch {
        async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.pages.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(BackupError::Search(SearchError::RequestFailed(
                    "script exhausted".to_string(),
                )))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_wire_form() {
        assert_eq!(Cursor::Initial.as_wire(), "initial");
        assert_eq!(Cursor::Continuation("abc".into()).as_wire(), "abc");
        assert_eq!(Cursor::default(), Cursor::Initial);
    }

    #[test]
    fn test_continuation_matching_sentinel_is_not_initial() {
        let cursor = Cursor::Continuation(INITIAL_CURSOR.to_string());
        assert_ne!(cursor, Cursor::Initial);
    }

    #[test]
    fn test_match_all_request() {
        let request = SearchRequest::match_all(Cursor::Initial, 500);
        assert_eq!(request.predicate, Predicate::MatchAll);
        assert_eq!(request.return_fields, ReturnFields::AllFields);
        assert_eq!(request.page_size, 500);
    }
}
