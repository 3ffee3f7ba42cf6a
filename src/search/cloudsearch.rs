//! HTTP client for the CloudSearch search API
//!
//! Issues `GET {endpoint}/2013-01-01/search` with a structured match-all
//! query. Hits are kept verbatim (`{"id", "fields"}`) as the exported records.
//!
//! Requests are not SigV4-signed. The domain's access policy has to allow
//! the caller's address; otherwise every query is refused with 403.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::BackupConfig;
use crate::error::{Result, SearchError};

use super::{Predicate, ReturnFields, SearchGateway, SearchRequest, SearchResponse};

const API_VERSION: &str = "2013-01-01";

/// Search gateway talking to a CloudSearch domain over HTTPS.
pub struct CloudSearchClient {
    http: reqwest::Client,
    search_url: Url,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    status: RawStatus,
    hits: RawHits,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(default)]
    rid: Option<String>,
    #[serde(rename = "time-ms", default)]
    time_ms: u64,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    #[serde(default)]
    found: u64,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    hit: Vec<Value>,
}

impl CloudSearchClient {
    /// Create a client for the given search endpoint
    ///
    /// # Arguments
    /// * `endpoint` - Domain endpoint, with or without scheme
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let search_url = Self::search_url(endpoint)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("csbackup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SearchError::RequestFailed(format!("Failed to build client: {e}")))?;

        debug!("Created search client for {}", search_url);
        Ok(Self { http, search_url })
    }

    /// Create a client from the search section of the configuration
    pub fn from_config(config: &BackupConfig) -> Result<Self> {
        Self::new(&config.search.endpoint, config.request_timeout())
    }

    /// Build the search URL from a configured endpoint
    fn search_url(endpoint: &str) -> Result<Url> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(SearchError::InvalidEndpoint("<empty>".to_string()).into());
        }

        let base = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        };

        Url::parse(&format!("{base}/{API_VERSION}/search"))
            .map_err(|e| SearchError::InvalidEndpoint(format!("{endpoint}: {e}")).into())
    }

    /// Query parameters for one request
    fn query_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
        let query = match request.predicate {
            Predicate::MatchAll => "matchall",
        };
        let fields = match request.return_fields {
            ReturnFields::AllFields => "_all_fields",
        };

        vec![
            ("q", query.to_string()),
            ("q.parser", "structured".to_string()),
            ("cursor", request.cursor.as_wire().to_string()),
            ("size", request.page_size.to_string()),
            ("return", fields.to_string()),
        ]
    }
}

impl From<RawSearchResponse> for SearchResponse {
    fn from(raw: RawSearchResponse) -> Self {
        SearchResponse {
            records: raw.hits.hit,
            cursor: raw.hits.cursor,
            server_time_ms: raw.status.time_ms,
        }
    }
}

fn service_error(status: u16, body: String) -> SearchError {
    let message = if status == 403 {
        format!("{body} (requests are unsigned; the domain access policy must allow this caller)")
    } else {
        body
    };
    SearchError::ServiceError { status, message }
}

#[async_trait]
impl SearchGateway for CloudSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let response = self
            .http
            .get(self.search_url.clone())
            .query(&Self::query_params(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status.as_u16(), body).into());
        }

        let raw: RawSearchResponse = response.json().await?;
        debug!(
            "Search rid={} found={} returned {} hits",
            raw.status.rid.as_deref().unwrap_or("-"),
            raw.hits.found,
            raw.hits.hit.len()
        );

        Ok(raw.into())
    }
}
