//! # VSO Sampler
//!
//! Capped interval sampling of the Virtual Solar Observatory.
//!
//! Archive searches are truncated at a fixed number of records. This crate
//! queries a time range once and, only when the archive returns a capped
//! result, re-issues the query over equal-width sub-intervals so the whole
//! range is covered. A second, independent component screens the returned
//! images with a brightness-grid heuristic and reports the ones that look
//! corrupted.
//!
//! ## Architecture
//!
//! - [`models`]: Time intervals, the instrument catalogue and search results
//! - [`archive`]: The search capability plus HTTP, in-memory and retrying backends
//! - [`services`]: The capped sampler and the brightness-anomaly heuristic
//! - [`config`]: TOML configuration with environment overrides
//! - [`error`]: Sampler and detector error types
//!
//! ## Example
//!
//! ```no_run
//! use vso_sampler::archive::ArchiveFactory;
//! use vso_sampler::config::SamplerConfig;
//! use vso_sampler::services::sample_by_cadence;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SamplerConfig::load(None)?;
//!     let archive = ArchiveFactory::create(&config)?;
//!
//!     let batch = sample_by_cadence(
//!         archive.as_ref(),
//!         "2012-01-01 00:00:01",
//!         "2012-02-01 23:59:59",
//!         100,
//!         "mauna loa",
//!         true,
//!     )
//!     .await?;
//!     println!("{} observations", batch.n_queried_files());
//!     Ok(())
//! }
//! ```

// ArchiveError carries a full ErrorContext
#![allow(clippy::result_large_err)]

pub mod archive;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use error::{DetectorError, DetectorResult, SamplerError, SamplerResult};
