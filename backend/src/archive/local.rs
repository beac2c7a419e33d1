//! In-memory archive implementation.
//!
//! This module provides a local implementation of [`ArchiveSearch`] suitable for
//! unit testing and offline development. Records live in a sorted `Vec`; every
//! query is applied the way the remote archive applies it (time window,
//! instrument filter, observable, cadence thinning) and then truncated at the
//! archive's own result cap, so saturation can be reproduced deterministically.
//!
//! Every received query is kept in a log, and failures can be injected to
//! exercise error propagation.

use async_trait::async_trait;
use chrono::Duration;
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

use super::error::{ArchiveError, ArchiveResult};
use super::search::{ArchiveSearch, SearchQuery};
use crate::models::{Instrument, ObservationRecord, SearchResult, TimeInterval};
use crate::services::sampler::NSO_CAP_QUERY_SIZE;

/// In-memory archive.
///
/// # Example
/// ```
/// use vso_sampler::archive::{ArchiveSearch, LocalArchive, SearchQuery};
/// use vso_sampler::models::{Instrument, TimeInterval};
///
/// # tokio_test_block_on(async {
/// let archive = LocalArchive::new();
/// let interval = TimeInterval::parse("2012-01-01", "2012-01-02").unwrap();
/// archive.generate_regular(Instrument::MaunaLoa, interval, chrono::Duration::minutes(1));
///
/// let query = SearchQuery::new(interval, Instrument::MaunaLoa.filter(), 60);
/// let result = archive.search(&query).await.unwrap();
/// assert_eq!(result.len(), 25);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalArchive {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    // sorted by `time_start`
    records: Vec<ObservationRecord>,
    server_cap: usize,
    queries: Vec<SearchQuery>,
    failure: Option<FailurePlan>,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            server_cap: NSO_CAP_QUERY_SIZE,
            queries: Vec::new(),
            failure: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FailurePlan {
    /// Queries to let through before failing
    skip: usize,
    /// Failures left; `None` fails forever
    remaining: Option<usize>,
    retryable: bool,
}

impl Default for LocalArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalArchive {
    /// Create an empty archive truncating at the NSO cap.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Change the cap at which this archive truncates results.
    pub fn with_server_cap(self, cap: usize) -> Self {
        self.data.write().server_cap = cap;
        self
    }

    pub fn server_cap(&self) -> usize {
        self.data.read().server_cap
    }

    /// Add records, keeping the store sorted by start time.
    pub fn insert_records<I>(&self, records: I)
    where
        I: IntoIterator<Item = ObservationRecord>,
    {
        let mut data = self.data.write();
        data.records.extend(records);
        data.records.sort_by_key(|r| r.time_start);
    }

    /// Fill `interval` with one record every `step` for `instrument`.
    ///
    /// Records get JPEG, FITS and header URLs derived from their file id.
    /// Returns the number of records added.
    pub fn generate_regular(
        &self,
        instrument: Instrument,
        interval: TimeInterval,
        step: Duration,
    ) -> usize {
        if step <= Duration::zero() {
            return 0;
        }

        let filter = instrument.filter();
        let site = instrument.site_code().unwrap_or("XX");
        let mut records = Vec::new();
        let mut t = interval.start();
        while t <= interval.end() {
            let fileid = format!("{}{}h", t.format("%Y%m%d%H%M%S"), site);
            let base = format!("https://gong.local/{}/{}", site.to_lowercase(), fileid);
            records.push(
                ObservationRecord::new(&fileid, &filter.provider, &filter.instrument, t)
                    .with_source(instrument.site_code())
                    .with_fits_url(format!("{}.fits.fz", base))
                    .with_header_url(format!("{}.hdr", base))
                    .with_jpg_url(format!("{}.jpg", base)),
            );
            t += step;
        }

        let added = records.len();
        self.insert_records(records);
        added
    }

    pub fn record_count(&self) -> usize {
        self.data.read().records.len()
    }

    /// Every query received so far, in order.
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.data.read().queries.clone()
    }

    pub fn query_count(&self) -> usize {
        self.data.read().queries.len()
    }

    pub fn clear_queries(&self) {
        self.data.write().queries.clear();
    }

    /// Fail every query after the first `after` succeed.
    pub fn fail_after(&self, after: usize) {
        self.data.write().failure = Some(FailurePlan {
            skip: after,
            remaining: None,
            retryable: false,
        });
    }

    /// Fail the next `times` queries with a retryable connection error.
    pub fn fail_transiently(&self, times: usize) {
        self.data.write().failure = Some(FailurePlan {
            skip: 0,
            remaining: Some(times),
            retryable: true,
        });
    }

    pub fn clear_failure(&self) {
        self.data.write().failure = None;
    }

    /// Drop records, queries and injected failures; keeps the cap.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let server_cap = data.server_cap;
        *data = LocalData {
            server_cap,
            ..Default::default()
        };
    }

    fn injected_failure(data: &mut LocalData, query: &SearchQuery) -> Option<ArchiveError> {
        let plan = data.failure.as_mut()?;
        if plan.skip > 0 {
            plan.skip -= 1;
            return None;
        }

        let retryable = plan.retryable;
        let remaining = plan.remaining;
        match remaining {
            Some(0) => {
                data.failure = None;
                return None;
            }
            Some(left) => plan.remaining = Some(left - 1),
            None => {}
        }

        let context = query.error_context("search");
        Some(if retryable {
            ArchiveError::connection_with_context("simulated connection reset", context)
        } else {
            ArchiveError::query_with_context("simulated archive failure", context)
        })
    }
}

#[async_trait]
impl ArchiveSearch for LocalArchive {
    async fn search(&self, query: &SearchQuery) -> ArchiveResult<SearchResult> {
        let mut data = self.data.write();
        data.queries.push(query.clone());

        if let Some(err) = Self::injected_failure(&mut data, query) {
            return Err(err);
        }

        let cadence = Duration::minutes(i64::from(query.cadence_minutes));
        let mut selected = Vec::new();
        let mut last_kept = None;

        for record in data.records.iter().filter(|r| {
            query.interval.contains(r.time_start)
                && query.filter.matches(r)
                && r.physobs.eq_ignore_ascii_case(&query.physobs)
        }) {
            if let Some(previous) = last_kept {
                if record.time_start - previous < cadence {
                    continue;
                }
            }
            last_kept = Some(record.time_start);
            selected.push(record.clone());
            if selected.len() >= data.server_cap {
                break;
            }
        }

        debug!(
            "local archive: {} records for {} ({})",
            selected.len(),
            query.interval,
            query.filter
        );

        Ok(SearchResult::new(query.interval, selected))
    }

    fn name(&self) -> &str {
        "local"
    }
}
