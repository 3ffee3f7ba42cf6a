//! Page fetcher over the paginated search query
//!
//! Pages are fetched strictly one at a time: each request carries the cursor
//! returned with the previous page.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, SearchError};

use super::{Cursor, DocumentBatch, SearchGateway, SearchRequest};

/// Lazy, finite sequence of document batches.
///
/// The sequence ends with the first empty batch.
pub struct PageFetcher {
    gateway: Arc<dyn SearchGateway>,
    page_size: u32,
    cursor: Cursor,
    fetch_calls: u64,
    total_fetched: u64,
}

impl PageFetcher {
    /// Start at the beginning of the result set.
    pub fn new(gateway: Arc<dyn SearchGateway>, page_size: u32) -> Self {
        Self::resume_from(gateway, page_size, Cursor::Initial)
    }

    /// Start at an arbitrary cursor.
    pub fn resume_from(gateway: Arc<dyn SearchGateway>, page_size: u32, cursor: Cursor) -> Self {
        Self {
            gateway,
            page_size,
            cursor,
            fetch_calls: 0,
            total_fetched: 0,
        }
    }

    /// Fetch the page at the current cursor and advance past it.
    ///
    /// # Returns
    /// * `Result<DocumentBatch>` - Next page; empty when the result set is exhausted
    pub async fn fetch_page(&mut self) -> Result<DocumentBatch> {
        let request = SearchRequest::match_all(self.cursor.clone(), self.page_size);
        debug!("Fetching page at cursor {}", self.cursor);

        self.fetch_calls += 1;
        let response = self.gateway.search(&request).await?;
        let hits = response.records.len();

        if hits > self.page_size as usize {
            warn!(
                "Search returned {} records for a page size of {}",
                hits, self.page_size
            );
        }

        let cursor = match response.cursor {
            Some(token) => Cursor::Continuation(token),
            None if hits == 0 => self.cursor.clone(),
            None => return Err(SearchError::MissingCursor { batch_hits: hits }.into()),
        };

        self.total_fetched += hits as u64;
        self.cursor = cursor.clone();
        debug!(
            "Fetched page of {} records (total: {})",
            hits, self.total_fetched
        );

        Ok(DocumentBatch {
            records: response.records,
            cursor,
            server_time_ms: response.server_time_ms,
        })
    }

    /// Cursor the next fetch will use.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Number of queries issued so far.
    pub fn fetch_calls(&self) -> u64 {
        self.fetch_calls
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}
