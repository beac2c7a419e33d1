//! Archive factory for dependency injection.
//!
//! Builds the search backend named by the runtime configuration, wrapped in a
//! [`RetryingSearch`] when retries are enabled.

use log::info;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::error::ArchiveResult;
use super::local::LocalArchive;
use super::retry::{RetryPolicy, RetryingSearch};
use super::search::ArchiveSearch;
use super::vso::VsoClient;
use crate::config::{ArchiveSettings, SamplerConfig};

/// Archive backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    /// Remote VSO search gateway over HTTP
    Vso,
    /// In-memory archive
    Local,
}

impl FromStr for ArchiveType {
    type Err = String;

    /// Parse archive type from string.
    ///
    /// # Arguments
    /// * `s` - String representation ("vso", "local")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vso" | "http" | "remote" => Ok(Self::Vso),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown archive type: {}", s)),
        }
    }
}

/// Archive factory.
///
/// # Example
/// ```no_run
/// use vso_sampler::archive::ArchiveFactory;
/// use vso_sampler::config::SamplerConfig;
///
/// let config = SamplerConfig::load(None).unwrap();
/// let archive = ArchiveFactory::create(&config).unwrap();
/// println!("using {} archive", archive.name());
/// ```
pub struct ArchiveFactory;

impl ArchiveFactory {
    /// Create the archive named by `config.archive.type`.
    pub fn create(config: &SamplerConfig) -> ArchiveResult<Arc<dyn ArchiveSearch>> {
        let archive = match config.archive_type()? {
            ArchiveType::Vso => Self::create_vso(&config.archive)?,
            ArchiveType::Local => Self::create_local(),
        };
        Ok(Self::with_retries(archive, config.sampler.retry_policy()))
    }

    /// Create an empty in-memory archive.
    pub fn create_local() -> Arc<dyn ArchiveSearch> {
        Arc::new(LocalArchive::new())
    }

    /// Create an HTTP client for a VSO search gateway.
    pub fn create_vso(settings: &ArchiveSettings) -> ArchiveResult<Arc<dyn ArchiveSearch>> {
        let client = VsoClient::new(settings)?;
        info!("vso archive at {}", client.base_url());
        Ok(Arc::new(client))
    }

    /// Wrap `archive` in a retry layer unless `policy` disables retries.
    pub fn with_retries(
        archive: Arc<dyn ArchiveSearch>,
        policy: RetryPolicy,
    ) -> Arc<dyn ArchiveSearch> {
        if policy.is_enabled() {
            Arc::new(RetryingSearch::new(archive, policy))
        } else {
            archive
        }
    }

    /// Create an archive from a configuration file.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> ArchiveResult<Arc<dyn ArchiveSearch>> {
        let config = SamplerConfig::load(Some(path.as_ref()))?;
        Self::create(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_type_from_str() {
        assert_eq!("vso".parse::<ArchiveType>().unwrap(), ArchiveType::Vso);
        assert_eq!("HTTP".parse::<ArchiveType>().unwrap(), ArchiveType::Vso);
        assert_eq!(" local ".parse::<ArchiveType>().unwrap(), ArchiveType::Local);
        assert_eq!("memory".parse::<ArchiveType>().unwrap(), ArchiveType::Local);
        assert!("ftp".parse::<ArchiveType>().is_err());
    }

    #[test]
    fn test_create_local() {
        let mut config = SamplerConfig::default();
        config.archive.archive_type = "local".to_string();

        let archive = ArchiveFactory::create(&config).unwrap();
        assert_eq!(archive.name(), "local");
    }

    #[test]
    fn test_create_vso() {
        let config = SamplerConfig::default();
        let archive = ArchiveFactory::create(&config).unwrap();
        assert_eq!(archive.name(), "vso");
    }

    #[test]
    fn test_retry_layer_keeps_name() {
        let mut config = SamplerConfig::default();
        config.archive.archive_type = "local".to_string();
        config.sampler.max_retries = 2;

        let archive = ArchiveFactory::create(&config).unwrap();
        assert_eq!(archive.name(), "local");
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        let mut config = SamplerConfig::default();
        config.archive.archive_type = "ftp".to_string();

        assert!(ArchiveFactory::create(&config).is_err());
    }
}
