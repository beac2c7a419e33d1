#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Duration;
use vso_sampler::archive::LocalArchive;
use vso_sampler::models::{Instrument, TimeInterval};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Every variable the configuration layer reads.
pub const SAMPLER_ENV_VARS: &[&str] = &[
    "ARCHIVE_TYPE",
    "VSO_BASE_URL",
    "VSO_TIMEOUT_SECS",
    "SAMPLER_CAP_SIZE",
];

/// Runs `f` with environment variables temporarily modified.
///
/// Restores variables on unwind and serializes access to the process
/// environment across parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

/// Runs `f` with every sampler variable removed except the ones in `set`.
pub fn with_sampler_env<F, R>(set: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let mut changes: Vec<(&str, Option<&str>)> = SAMPLER_ENV_VARS
        .iter()
        .filter(|key| !set.iter().any(|(k, _)| k == *key))
        .map(|key| (*key, None))
        .collect();
    changes.extend(set.iter().map(|(k, v)| (*k, Some(*v))));
    with_scoped_env(&changes, f)
}

/// Runs `f` with the process working directory set to `dir`.
///
/// Shares the environment lock and restores the previous directory on unwind.
pub fn with_current_dir<F, R>(dir: &Path, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedDir::enter(dir);
    f()
}

struct ScopedDir {
    previous: PathBuf,
}

impl ScopedDir {
    fn enter(dir: &Path) -> Self {
        let previous = std::env::current_dir().expect("current dir");
        std::env::set_current_dir(dir).expect("enter dir");
        Self { previous }
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Write `content` to `sampler.toml` inside `dir`.
pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("sampler.toml");
    std::fs::write(&path, content).expect("write config");
    path
}

/// The reference month used throughout the tests.
pub fn reference_month() -> TimeInterval {
    TimeInterval::parse("2012-01-01 00:00:01", "2012-02-01 23:59:59").expect("valid interval")
}

/// Archive holding one Mauna Loa record per minute over the reference month.
pub fn minute_archive(server_cap: usize) -> LocalArchive {
    let archive = LocalArchive::new().with_server_cap(server_cap);
    archive.generate_regular(Instrument::MaunaLoa, reference_month(), Duration::minutes(1));
    archive
}
