//! # Data Directory and Context Setup
//!
//! All records live in one data directory, resolved in priority order:
//!
//! 1. `data_override` (the CLI's `--data DIR`)
//! 2. `MARGIN_DATA` environment variable
//! 3. The OS-appropriate data directory (via the `directories` crate)
//!
//! ## Configuration Lookup
//!
//! `margin.toml` is read from the global data directory first, then from the
//! override directory when one is given; later files override earlier ones
//! key by key ([`SearchMode::Merge`]). Missing or unreadable files fall back
//! to compiled defaults.

use crate::api::MarginApi;
use crate::config::MarginConfig;
use crate::error::{MarginError, Result};
use crate::store::fs_backend::FsBackend;
use clapfig::{Clapfig, SearchMode, SearchPath};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DATA_ENV_VAR: &str = "MARGIN_DATA";
pub const CONFIG_FILE_NAME: &str = "margin.toml";

pub struct MarginContext {
    pub api: MarginApi<FsBackend>,
    pub config: MarginConfig,
    pub data_dir: PathBuf,
    pub global_dir: PathBuf,
}

/// The global data directory: `MARGIN_DATA` or the OS data dir.
pub fn global_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_ENV_VAR).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "margin", "margin")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| MarginError::Config("could not determine a data directory".to_string()))
}

/// Config search paths: global first, the override directory last.
pub fn config_search_paths(global_dir: &Path, data_override: Option<&Path>) -> Vec<SearchPath> {
    let mut paths = vec![SearchPath::Path(global_dir.to_path_buf())];
    if let Some(dir) = data_override.filter(|d| *d != global_dir) {
        paths.push(SearchPath::Path(dir.to_path_buf()));
    }
    paths
}

/// Resolve the data directory, load configuration and open the store.
pub fn initialize(data_override: Option<PathBuf>) -> Result<MarginContext> {
    let global_dir = match global_data_dir() {
        Ok(dir) => dir,
        Err(e) => data_override.clone().ok_or(e)?,
    };

    let config: MarginConfig = Clapfig::builder()
        .app_name("margin")
        .file_name(CONFIG_FILE_NAME)
        .search_paths(config_search_paths(&global_dir, data_override.as_deref()))
        .search_mode(SearchMode::Merge)
        .load()
        .unwrap_or_default();

    let data_dir = data_override.unwrap_or_else(|| global_dir.clone());
    tracing::debug!(data_dir = %data_dir.display(), "initializing store");

    let api = MarginApi::new(FsBackend::new(data_dir.clone()), config.clone())?;
    Ok(MarginContext {
        api,
        config,
        data_dir,
        global_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_paths_skip_duplicate_override() {
        let global = Path::new("/data/margin");
        assert_eq!(config_search_paths(global, None).len(), 1);
        assert_eq!(config_search_paths(global, Some(global)).len(), 1);
        assert_eq!(
            config_search_paths(global, Some(Path::new("/tmp/other"))).len(),
            2
        );
    }

    #[test]
    fn test_initialize_with_override_uses_it() {
        let temp = tempfile::tempdir().unwrap();
        let ctx = initialize(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(ctx.data_dir, temp.path());
        assert_eq!(ctx.config.reenhance_interval_ms, 1500);
    }
}
