//! Error types for sampling and brightness analysis.

use thiserror::Error;

use crate::archive::ArchiveError;

/// Result type for sampler operations
pub type SamplerResult<T> = std::result::Result<T, SamplerError>;

/// Result type for brightness-grid operations
pub type DetectorResult<T> = std::result::Result<T, DetectorError>;

/// Errors that can occur while sampling an archive
#[derive(Error, Debug)]
pub enum SamplerError {
    /// Malformed, unparseable or inverted time range
    #[error("Invalid time interval: {0}")]
    InvalidInterval(String),

    /// Cadence must be a positive number of minutes
    #[error("Invalid cadence: {0} minutes")]
    InvalidCadence(u32),

    /// Instrument name not present in the catalogue
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// Failure raised by the archive, passed through unchanged
    #[error("Upstream query failed: {0}")]
    UpstreamQuery(#[from] ArchiveError),
}

/// Errors that can occur while building or analysing a brightness grid
#[derive(Error, Debug)]
pub enum DetectorError {
    /// The image could not be retrieved
    #[error("Failed to fetch image: {0}")]
    Fetch(#[from] ArchiveError),

    /// The retrieved bytes are not a decodable image
    #[error("Failed to decode image {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    /// Grid parameters incompatible with the image
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// An image reduced to a different number of cells than the rest of the batch
    #[error("Grid shape mismatch for {url}: expected {expected} cells, got {actual}")]
    ShapeMismatch {
        url: String,
        expected: usize,
        actual: usize,
    },

    /// Percentiles outside 0..=100, not ordered, or a negative multiplier
    #[error("Invalid fence: {0}")]
    InvalidFence(String),

    /// Percentile fences need at least one image
    #[error("No images to analyse")]
    EmptyBatch,
}
