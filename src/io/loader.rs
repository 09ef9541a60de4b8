//! Source resolution and memoized dataset loading.
//!
//! The dataset is a static snapshot per process: we load it once and treat it
//! as read-only afterwards. The memo here is a pure cache of a deterministic
//! load, keyed by source identity (canonical path + length + mtime), with an
//! explicit `invalidate` instead of framework magic. Serving a stale entry is
//! logically safe; invalidation only has to notice that the file changed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::SystemTime;

use crate::error::AppError;
use crate::io::ingest::{IngestedData, read_dataset};

/// Environment variable that overrides the source location (`.env` honored).
pub const SOURCE_ENV_VAR: &str = "SIPSA_MASTER_CSV";

/// Default locations probed in order when no explicit path is given.
pub const DEFAULT_SOURCE_PATHS: [&str; 2] = ["data/processed/sipsa_master.csv", "sipsa_master.csv"];

/// A loaded dataset together with the path it came from.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub data: Arc<IngestedData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceSignature {
    len: u64,
    modified: Option<SystemTime>,
}

impl SourceSignature {
    fn probe(path: &Path) -> Result<Self, AppError> {
        let meta = fs::metadata(path).map_err(|e| {
            AppError::source_unavailable(format!("Failed to stat source '{}': {e}", path.display()))
        })?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct CacheEntry {
    signature: SourceSignature,
    data: Arc<IngestedData>,
}

fn cache() -> &'static Mutex<HashMap<PathBuf, CacheEntry>> {
    static CACHE: OnceLock<Mutex<HashMap<PathBuf, CacheEntry>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn cache_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve the source path: explicit flag > `SIPSA_MASTER_CSV` > defaults.
pub fn resolve_source(explicit: Option<&Path>) -> Result<PathBuf, AppError> {
    if let Some(path) = explicit {
        return validate_source_path(path);
    }

    dotenvy::dotenv().ok();
    if let Ok(value) = std::env::var(SOURCE_ENV_VAR) {
        let value = value.trim();
        if !value.is_empty() {
            return validate_source_path(Path::new(value));
        }
    }

    for candidate in DEFAULT_SOURCE_PATHS {
        let path = Path::new(candidate);
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
    }

    Err(AppError::source_unavailable(format!(
        "No readable dataset found. Tried: {}. Set {SOURCE_ENV_VAR} or pass -f <file.csv>.",
        DEFAULT_SOURCE_PATHS.join(", ")
    )))
}

/// Validate that the provided path points to an existing `.csv` file.
pub fn validate_source_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::source_unavailable(format!(
            "Source CSV not found: {}",
            path.display()
        )));
    }
    if path.is_dir() {
        return Err(AppError::source_unavailable(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        != Some(true)
    {
        return Err(AppError::source_unavailable(format!(
            "Expected a .csv file (got: {}).",
            path.display()
        )));
    }

    Ok(path.to_path_buf())
}

/// Load the dataset, reusing the cached copy while the file is unchanged.
pub fn load(explicit: Option<&Path>) -> Result<LoadedSource, AppError> {
    let path = resolve_source(explicit)?;
    let key = cache_key(&path);
    let signature = SourceSignature::probe(&path)?;

    let mut map = cache().lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(entry) = map.get(&key) {
        if entry.signature == signature {
            return Ok(LoadedSource {
                path,
                data: Arc::clone(&entry.data),
            });
        }
    }

    let data = Arc::new(read_dataset(&path)?);
    map.insert(
        key,
        CacheEntry {
            signature,
            data: Arc::clone(&data),
        },
    );

    Ok(LoadedSource { path, data })
}

/// Drop the cached dataset for `path`; the next `load` re-reads the file.
pub fn invalidate(path: &Path) {
    let mut map = cache().lock().unwrap_or_else(PoisonError::into_inner);
    map.remove(&cache_key(path));
}

/// Drop every cached dataset.
pub fn invalidate_all() {
    let mut map = cache().lock().unwrap_or_else(PoisonError::into_inner);
    map.clear();
}
