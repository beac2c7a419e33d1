//! Archive access layer.
//!
//! - [`ArchiveSearch`]: the search capability the sampler is written against
//! - [`VsoClient`]: HTTP client for a VSO search gateway
//! - [`LocalArchive`]: in-memory archive for tests and offline runs
//! - [`RetryingSearch`]: bounded retry around any search backend
//! - [`ImageSource`]: image retrieval for the brightness heuristic
//! - [`ArchiveFactory`]: builds a backend from configuration

pub mod error;
pub mod factory;
pub mod images;
pub mod local;
pub mod retry;
pub mod search;
pub mod vso;

pub use error::{ArchiveError, ArchiveResult, ErrorContext};
pub use factory::{ArchiveFactory, ArchiveType};
pub use images::{HttpImageSource, ImageSource, MemoryImageSource};
pub use local::LocalArchive;
pub use retry::{RetryPolicy, RetryingSearch};
pub use search::{ArchiveSearch, SearchQuery};
pub use vso::VsoClient;
