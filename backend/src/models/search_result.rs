//! Observation records and the result sets built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time::TimeInterval;

/// Physical observable every sampler query filters on.
pub const PHYSOBS_INTENSITY: &str = "intensity";

fn default_physobs() -> String {
    PHYSOBS_INTENSITY.to_string()
}

/// A single observation returned by the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub fileid: String,
    pub provider: String,
    pub instrument: String,
    /// GONG site code, when the archive reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default = "default_physobs")]
    pub physobs: String,
    pub time_start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<DateTime<Utc>>,
    /// Size in kB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fits_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpg_url: Option<String>,
}

impl ObservationRecord {
    /// Minimal intensity record; optional fields start empty.
    pub fn new(
        fileid: impl Into<String>,
        provider: impl Into<String>,
        instrument: impl Into<String>,
        time_start: DateTime<Utc>,
    ) -> Self {
        Self {
            fileid: fileid.into(),
            provider: provider.into(),
            instrument: instrument.into(),
            source: None,
            physobs: default_physobs(),
            time_start,
            time_end: None,
            size: None,
            fits_url: None,
            header_url: None,
            jpg_url: None,
        }
    }

    pub fn with_source(mut self, source: Option<&str>) -> Self {
        self.source = source.map(str::to_string);
        self
    }

    pub fn with_physobs(mut self, physobs: impl Into<String>) -> Self {
        self.physobs = physobs.into();
        self
    }

    pub fn with_fits_url(mut self, url: impl Into<String>) -> Self {
        self.fits_url = Some(url.into());
        self
    }

    pub fn with_header_url(mut self, url: impl Into<String>) -> Self {
        self.header_url = Some(url.into());
        self
    }

    pub fn with_jpg_url(mut self, url: impl Into<String>) -> Self {
        self.jpg_url = Some(url.into());
        self
    }
}

/// Which URL lists [`SearchResult::generate_url_metadata`] should build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlKinds {
    pub fits: bool,
    pub header: bool,
    pub jpg: bool,
}

impl UrlKinds {
    pub fn all() -> Self {
        Self {
            fits: true,
            header: true,
            jpg: true,
        }
    }

    pub fn jpg_only() -> Self {
        Self {
            jpg: true,
            ..Default::default()
        }
    }
}

/// Download URLs derived from a result set. Unrequested kinds stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UrlMetadata {
    pub fits_urls: Vec<String>,
    pub header_urls: Vec<String>,
    pub jpg_urls: Vec<String>,
}

impl UrlMetadata {
    fn extend(&mut self, other: UrlMetadata) {
        self.fits_urls.extend(other.fits_urls);
        self.header_urls.extend(other.header_urls);
        self.jpg_urls.extend(other.jpg_urls);
    }
}

fn collect_urls(
    records: &[ObservationRecord],
    enabled: bool,
    pick: fn(&ObservationRecord) -> Option<&String>,
) -> Vec<String> {
    if !enabled {
        return Vec::new();
    }
    records.iter().filter_map(pick).cloned().collect()
}

/// Records returned by the archive for one interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    interval: TimeInterval,
    records: Vec<ObservationRecord>,
}

impl SearchResult {
    pub fn new(interval: TimeInterval, records: Vec<ObservationRecord>) -> Self {
        Self { interval, records }
    }

    /// Interval the query was issued for.
    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ObservationRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of files the query returned.
    pub fn n_queried_files(&self) -> usize {
        self.records.len()
    }

    /// Collect the requested URL kinds, skipping records that lack them.
    pub fn generate_url_metadata(&self, kinds: UrlKinds) -> UrlMetadata {
        UrlMetadata {
            fits_urls: collect_urls(&self.records, kinds.fits, |r| r.fits_url.as_ref()),
            header_urls: collect_urls(&self.records, kinds.header, |r| r.header_url.as_ref()),
            jpg_urls: collect_urls(&self.records, kinds.jpg, |r| r.jpg_url.as_ref()),
        }
    }

    pub fn fits_urls(&self) -> Vec<String> {
        self.generate_url_metadata(UrlKinds {
            fits: true,
            ..Default::default()
        })
        .fits_urls
    }

    pub fn header_urls(&self) -> Vec<String> {
        self.generate_url_metadata(UrlKinds {
            header: true,
            ..Default::default()
        })
        .header_urls
    }

    pub fn jpg_urls(&self) -> Vec<String> {
        self.generate_url_metadata(UrlKinds::jpg_only()).jpg_urls
    }
}

/// Ordered result sets, one per queried sub-interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleBatch {
    results: Vec<SearchResult>,
}

impl SampleBatch {
    /// Batch holding a single unsplit result.
    pub fn single(result: SearchResult) -> Self {
        Self {
            results: vec![result],
        }
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<SearchResult> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether the query had to be split into sub-intervals.
    pub fn is_split(&self) -> bool {
        self.results.len() > 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchResult> {
        self.results.iter()
    }

    /// Total files across every sub-interval.
    pub fn n_queried_files(&self) -> usize {
        self.results.iter().map(SearchResult::n_queried_files).sum()
    }

    /// URL metadata of every result, concatenated in interval order.
    pub fn generate_url_metadata(&self, kinds: UrlKinds) -> UrlMetadata {
        let mut metadata = UrlMetadata::default();
        for result in &self.results {
            metadata.extend(result.generate_url_metadata(kinds));
        }
        metadata
    }

    /// All records, concatenated in interval order.
    pub fn records(&self) -> impl Iterator<Item = &ObservationRecord> {
        self.results.iter().flat_map(|r| r.records.iter())
    }
}

impl From<Vec<SearchResult>> for SampleBatch {
    fn from(results: Vec<SearchResult>) -> Self {
        Self { results }
    }
}

impl IntoIterator for SampleBatch {
    type Item = SearchResult;
    type IntoIter = std::vec::IntoIter<SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a SampleBatch {
    type Item = &'a SearchResult;
    type IntoIter = std::slice::Iter<'a, SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
