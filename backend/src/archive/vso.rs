//! HTTP client for a VSO search gateway.
//!
//! The client posts one JSON query per call to `{base_url}/search` and expects
//! `{"records": [...]}` back. Transport failures, timeouts, 5xx and 429
//! responses are reported as retryable; whether to retry is decided by the
//! caller (see [`super::retry::RetryingSearch`]).

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{ArchiveError, ArchiveResult};
use super::search::{ArchiveSearch, SearchQuery};
use crate::config::ArchiveSettings;
use crate::models::{ObservationRecord, SearchResult, Timestamp};

/// Time layout the VSO query interface uses.
const VSO_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    time: TimeWindow,
    instrument: &'a str,
    provider: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    physobs: &'a str,
    /// Sampling period in seconds
    sample: u64,
}

#[derive(Debug, Serialize)]
struct TimeWindow {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    records: Vec<ObservationRecord>,
    #[serde(default)]
    error: Option<String>,
}

fn vso_time(t: Timestamp) -> String {
    t.format(VSO_TIME_FORMAT).to_string()
}

impl<'a> SearchRequest<'a> {
    fn from_query(query: &'a SearchQuery) -> Self {
        Self {
            time: TimeWindow {
                start: vso_time(query.interval.start()),
                end: vso_time(query.interval.end()),
            },
            instrument: &query.filter.instrument,
            provider: &query.filter.provider,
            source: query.filter.source.as_deref(),
            physobs: &query.physobs,
            sample: query.sample_seconds(),
        }
    }
}

/// Decode a search response body.
fn parse_search_response(body: &str) -> ArchiveResult<Vec<ObservationRecord>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| ArchiveError::response(format!("Failed to parse search response: {}", e)))?;

    if let Some(message) = response.error {
        return Err(ArchiveError::query(message));
    }

    Ok(response.records)
}

/// Archive client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct VsoClient {
    client: reqwest::Client,
    base_url: String,
}

impl VsoClient {
    /// Build a client from archive settings.
    ///
    /// # Errors
    /// Returns a configuration error if the base URL is empty or the HTTP
    /// client cannot be built.
    pub fn new(settings: &ArchiveSettings) -> ArchiveResult<Self> {
        if settings.base_url.trim().is_empty() {
            return Err(ArchiveError::configuration(
                "archive.base_url must be set for the vso archive",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| {
                ArchiveError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

#[async_trait]
impl ArchiveSearch for VsoClient {
    async fn search(&self, query: &SearchQuery) -> ArchiveResult<SearchResult> {
        let context = query.error_context("search");

        let response = self
            .client
            .post(self.search_url())
            .json(&SearchRequest::from_query(query))
            .send()
            .await
            .map_err(|e| ArchiveError::from(e).with_context(context.clone()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ArchiveError::from(e).with_context(context.clone()))?;

        if !status.is_success() {
            let details = context.clone().with_details(format!("status={}", status));
            let details = if status.is_server_error() || status.as_u16() == 429 {
                details.retryable()
            } else {
                details
            };
            return Err(ArchiveError::query_with_context(
                format!("archive returned {}: {}", status, body.trim()),
                details,
            ));
        }

        let records = parse_search_response(&body).map_err(|e| e.with_context(context))?;

        debug!(
            "vso: {} records for {} ({})",
            records.len(),
            query.interval,
            query.filter
        );

        Ok(SearchResult::new(query.interval, records))
    }

    fn name(&self) -> &str {
        "vso"
    }
}
