//! Capped interval sampler.
//!
//! Archives truncate a search at a fixed number of records. The sampler runs
//! the full query first and, only when that query comes back at the cap,
//! estimates how many sub-intervals the window needs and re-issues the same
//! query over each of them in order.
//!
//! The estimate assumes one observation per minute:
//! `n = floor(whole_minutes / cadence / cap)`. A sub-interval that is still
//! saturated is reported with a warning and kept as returned.
//!
//! Neighbouring sub-intervals share their boundary instant and archive time
//! filters are inclusive at both ends, so a record observed exactly on a
//! boundary appears in both sub-results. Callers needing unique records (for
//! example one image per URL) must deduplicate the batch.

use log::{debug, info, warn};

use crate::archive::{ArchiveSearch, SearchQuery};
use crate::error::{SamplerError, SamplerResult};
use crate::models::{
    resolve_instrument, validate_time_interval, IntoTimestamp, SampleBatch, TimeInterval,
};

/// Result cap of the NSO GONG search endpoint.
pub const NSO_CAP_QUERY_SIZE: usize = 10_000;

// Progress narration: `info` when verbose, `debug` otherwise.
macro_rules! narrate {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// Estimate-then-split sampling strategy over an [`ArchiveSearch`].
///
/// # Example
/// ```
/// use vso_sampler::archive::LocalArchive;
/// use vso_sampler::models::TimeInterval;
/// use vso_sampler::services::CappedSampler;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let archive = LocalArchive::new();
/// let interval = TimeInterval::parse("2012-01-01", "2012-01-02").unwrap();
/// let batch = CappedSampler::new(&archive)
///     .with_cap(500)
///     .sample(interval, 60, "mauna loa")
///     .await
///     .unwrap();
/// assert_eq!(batch.len(), 1);
/// # });
/// ```
pub struct CappedSampler<'a> {
    search: &'a dyn ArchiveSearch,
    cap: usize,
    verbose: bool,
}

impl<'a> CappedSampler<'a> {
    pub fn new(search: &'a dyn ArchiveSearch) -> Self {
        Self {
            search,
            cap: NSO_CAP_QUERY_SIZE,
            verbose: false,
        }
    }

    /// Record count at which the archive is assumed to have truncated.
    ///
    /// A cap of zero is treated as one.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap.max(1);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Number of sub-intervals a saturated query over `interval` is split into.
    pub fn estimate_intervals(&self, interval: &TimeInterval, cadence_minutes: u32) -> usize {
        if cadence_minutes == 0 {
            return 0;
        }
        let expected_population = interval.whole_minutes().max(0) as u64;
        let expected_samples = expected_population / u64::from(cadence_minutes);
        usize::try_from(expected_samples / self.cap as u64).unwrap_or(usize::MAX)
    }

    /// Query `interval` at `cadence_minutes`, splitting when the archive caps out.
    ///
    /// # Errors
    /// - `InvalidCadence` when `cadence_minutes` is zero
    /// - `UnknownInstrument` when `instrument` does not resolve
    /// - `UpstreamQuery` for any archive failure; partial results are dropped
    pub async fn sample(
        &self,
        interval: TimeInterval,
        cadence_minutes: u32,
        instrument: &str,
    ) -> SamplerResult<SampleBatch> {
        if cadence_minutes == 0 {
            return Err(SamplerError::InvalidCadence(cadence_minutes));
        }
        let filter = resolve_instrument(instrument)?;
        let query = SearchQuery::new(interval, filter, cadence_minutes);

        narrate!(
            self.verbose,
            "querying {} for {} every {} min",
            self.search.name(),
            query.filter,
            cadence_minutes
        );
        narrate!(self.verbose, "query interval: {}", interval);

        let result = self.search.search(&query).await?;
        narrate!(self.verbose, "found {} observations", result.len());

        if result.len() < self.cap {
            return Ok(SampleBatch::single(result));
        }

        let n_intervals = self.estimate_intervals(&interval, cadence_minutes);
        if n_intervals == 0 {
            warn!(
                "query for {} returned {} records (cap {}) but the estimate needs no split; \
                 keeping the capped result",
                interval,
                result.len(),
                self.cap
            );
            return Ok(SampleBatch::single(result));
        }

        narrate!(
            self.verbose,
            "result hit the cap of {}, splitting into {} sub-intervals",
            self.cap,
            n_intervals
        );

        let sub_intervals = interval.split(n_intervals)?;
        let mut results = Vec::with_capacity(sub_intervals.len());
        for (i, sub) in sub_intervals.into_iter().enumerate() {
            let sub = validate_time_interval(sub.start(), sub.end())?;
            narrate!(
                self.verbose,
                "sub-query {}/{}: {}",
                i + 1,
                n_intervals,
                sub
            );

            let sub_result = self.search.search(&query.with_interval(sub)).await?;
            narrate!(self.verbose, "found {} observations", sub_result.len());

            if sub_result.len() >= self.cap {
                warn!(
                    "sub-interval {} is still at the cap ({} records); results may be incomplete",
                    sub,
                    sub_result.len()
                );
            }
            results.push(sub_result);
        }

        Ok(SampleBatch::from(results))
    }
}

/// Sample `[start, end]` for `instrument` at `cadence_minutes` with the default cap.
///
/// `start` and `end` may be timestamps or strings (see
/// [`parse_timestamp`](crate::models::parse_timestamp)). Verbose mode logs the
/// progress at `info` level; it does not change the result.
pub async fn sample_by_cadence(
    search: &dyn ArchiveSearch,
    start: impl IntoTimestamp,
    end: impl IntoTimestamp,
    cadence_minutes: u32,
    instrument: &str,
    verbose: bool,
) -> SamplerResult<SampleBatch> {
    let interval = validate_time_interval(start, end)?;
    CappedSampler::new(search)
        .verbose(verbose)
        .sample(interval, cadence_minutes, instrument)
        .await
}
