//! Sampler configuration file support.
//!
//! Configuration is read from a TOML file (`sampler.toml`) and can be
//! overridden by environment variables. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! # Environment Variables
//! - `ARCHIVE_TYPE`: `vso` | `local`
//! - `VSO_BASE_URL`: base URL of the search gateway
//! - `VSO_TIMEOUT_SECS`: HTTP request timeout in seconds
//! - `SAMPLER_CAP_SIZE`: archive result cap used to decide when to split

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::archive::factory::ArchiveType;
use crate::archive::retry::RetryPolicy;
use crate::archive::{ArchiveError, ArchiveResult};
use crate::services::brightness::{FenceParams, DEFAULT_GRID_SIZE};
use crate::services::sampler::NSO_CAP_QUERY_SIZE;

/// Configuration file name searched for by [`SamplerConfig::find_default_location`].
pub const CONFIG_FILE_NAME: &str = "sampler.toml";

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplerConfig {
    #[serde(default)]
    pub archive: ArchiveSettings,
    #[serde(default)]
    pub sampler: SamplingSettings,
    #[serde(default)]
    pub detector: DetectorSettings,
}

/// Archive connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSettings {
    #[serde(rename = "type", default = "default_archive_type")]
    pub archive_type: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Cap and retry settings for the sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingSettings {
    #[serde(default = "default_cap_size")]
    pub cap_size: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Brightness heuristic settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSettings {
    #[serde(default = "default_grid_size")]
    pub grid_size: u32,
    #[serde(default = "default_lower_percentile")]
    pub lower_percentile: f64,
    #[serde(default = "default_upper_percentile")]
    pub upper_percentile: f64,
    #[serde(default = "default_fence_multiplier")]
    pub fence_multiplier: f64,
}

fn default_archive_type() -> String {
    "vso".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    format!("vso-sampler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_cap_size() -> usize {
    NSO_CAP_QUERY_SIZE
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_grid_size() -> u32 {
    DEFAULT_GRID_SIZE
}

fn default_lower_percentile() -> f64 {
    FenceParams::default().lower_percentile
}

fn default_upper_percentile() -> f64 {
    FenceParams::default().upper_percentile
}

fn default_fence_multiplier() -> f64 {
    FenceParams::default().multiplier
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            archive_type: default_archive_type(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            cap_size: default_cap_size(),
            max_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl SamplingSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            lower_percentile: default_lower_percentile(),
            upper_percentile: default_upper_percentile(),
            fence_multiplier: default_fence_multiplier(),
        }
    }
}

impl DetectorSettings {
    pub fn fence_params(&self) -> FenceParams {
        FenceParams {
            lower_percentile: self.lower_percentile,
            upper_percentile: self.upper_percentile,
            multiplier: self.fence_multiplier,
        }
    }
}

impl SamplerConfig {
    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> ArchiveResult<Self> {
        toml::from_str(content).map_err(|e| {
            ArchiveError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(SamplerConfig)` if successful
    /// * `Err(ArchiveError)` if file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ArchiveError::configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// First existing `sampler.toml` among the standard locations.
    ///
    /// Searches:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn find_default_location() -> Option<PathBuf> {
        [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load configuration from the default location.
    ///
    /// # Returns
    /// * `Err(ArchiveError)` if no config file is found or it fails to parse
    pub fn from_default_location() -> ArchiveResult<Self> {
        match Self::find_default_location() {
            Some(path) => Self::from_file(path),
            None => Err(ArchiveError::configuration(format!(
                "No {} found in standard locations",
                CONFIG_FILE_NAME
            ))),
        }
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> ArchiveResult<Self> {
        Self::default().apply_env_overrides()
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist. Without one the default locations are
    /// tried, falling back to built-in defaults. Environment overrides are
    /// applied last and the result is validated.
    pub fn load(path: Option<&Path>) -> ArchiveResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::find_default_location() {
                Some(found) => Self::from_file(found)?,
                None => Self::default(),
            },
        };
        let config = config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ARCHIVE_TYPE`, `VSO_BASE_URL`, `VSO_TIMEOUT_SECS` and `SAMPLER_CAP_SIZE`.
    pub fn apply_env_overrides(mut self) -> ArchiveResult<Self> {
        if let Ok(value) = env::var("ARCHIVE_TYPE") {
            self.archive.archive_type = value;
        }
        if let Ok(value) = env::var("VSO_BASE_URL") {
            self.archive.base_url = value;
        }
        if let Ok(value) = env::var("VSO_TIMEOUT_SECS") {
            self.archive.timeout_secs = value.parse().map_err(|_| {
                ArchiveError::configuration("VSO_TIMEOUT_SECS must be a whole number of seconds")
            })?;
        }
        if let Ok(value) = env::var("SAMPLER_CAP_SIZE") {
            self.sampler.cap_size = value.parse().map_err(|_| {
                ArchiveError::configuration("SAMPLER_CAP_SIZE must be a positive integer")
            })?;
        }
        Ok(self)
    }

    /// Get the archive type from configuration.
    pub fn archive_type(&self) -> ArchiveResult<ArchiveType> {
        ArchiveType::from_str(&self.archive.archive_type).map_err(ArchiveError::configuration)
    }

    /// Reject settings the sampler or detector cannot run with.
    pub fn validate(&self) -> ArchiveResult<()> {
        self.archive_type()?;

        if self.sampler.cap_size == 0 {
            return Err(ArchiveError::configuration("sampler.cap_size must be positive"));
        }
        if self.archive.timeout_secs == 0 {
            return Err(ArchiveError::configuration("archive.timeout_secs must be positive"));
        }
        if self.detector.grid_size == 0 {
            return Err(ArchiveError::configuration("detector.grid_size must be positive"));
        }

        self.detector
            .fence_params()
            .validate()
            .map_err(|e| ArchiveError::configuration(format!("detector: {}", e)))?;

        Ok(())
    }
}
