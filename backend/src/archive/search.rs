//! The search capability every archive backend implements.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::error::{ArchiveResult, ErrorContext};
use crate::models::{InstrumentFilter, SearchResult, TimeInterval, PHYSOBS_INTENSITY};

/// One archive query: time window, instrument, observable and cadence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub interval: TimeInterval,
    pub filter: InstrumentFilter,
    pub physobs: String,
    pub cadence_minutes: u32,
}

impl SearchQuery {
    /// Intensity query at the given cadence.
    pub fn new(interval: TimeInterval, filter: InstrumentFilter, cadence_minutes: u32) -> Self {
        Self {
            interval,
            filter,
            physobs: PHYSOBS_INTENSITY.to_string(),
            cadence_minutes,
        }
    }

    /// Same filters over a different window.
    pub fn with_interval(&self, interval: TimeInterval) -> Self {
        Self {
            interval,
            ..self.clone()
        }
    }

    /// Sampling period as the archive expects it.
    pub fn sample_seconds(&self) -> u64 {
        u64::from(self.cadence_minutes) * 60
    }

    /// Error context describing this query.
    pub fn error_context(&self, operation: &str) -> ErrorContext {
        ErrorContext::new(operation)
            .with_instrument(self.filter.to_string())
            .with_interval(self.interval)
    }
}

/// Search capability for an observation archive.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ArchiveSearch: Send + Sync {
    /// Run one query and return whatever the archive hands back.
    ///
    /// Implementations must not split, page or retry on their own; a result
    /// truncated by the archive's cap is returned as-is.
    async fn search(&self, query: &SearchQuery) -> ArchiveResult<SearchResult>;

    /// Short backend name for log lines.
    fn name(&self) -> &str {
        "archive"
    }
}

#[async_trait]
impl<T: ArchiveSearch + ?Sized> ArchiveSearch for Arc<T> {
    async fn search(&self, query: &SearchQuery) -> ArchiveResult<SearchResult> {
        (**self).search(query).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
