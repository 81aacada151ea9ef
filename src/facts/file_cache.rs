//! A persistent cache mapping path-like keys to whole-file text documents.
//!
//! A key such as `/api.launchpad.net/1.0/~owner/+archive/ppa/bpph` is stored at
//! `<root>/api.launchpad.net/1.0/~owner/+archive/ppa/bpph.data`. Content is read and written
//! in full; there is no locking, so a crash mid-write can leave a truncated document behind.

use crate::Result;
use directories::BaseDirs;
use ohno::{IntoAppError, app_err};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::PathBuf;
use url::Url;

const LOG_TARGET: &str = "     cache";

/// Suffix appended to every key to form the file name.
const DATA_SUFFIX: &str = ".data";

/// Directory under the user's home holding all ppastats state.
pub const STATE_DIR_NAME: &str = ".ppastats";

#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    ignore: bool,
}

impl FileCache {
    /// Create a cache rooted at `root`.
    ///
    /// When `ignore_cache` is set every lookup is a miss, but fresh content is still written
    /// so that the next run benefits from it.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, ignore_cache: bool) -> Self {
        Self {
            root: root.into(),
            ignore: ignore_cache,
        }
    }

    /// Map a key to its file path, or `None` if the key is not a valid cache key.
    #[must_use]
    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        if !is_valid_key(key) {
            return None;
        }

        let mut path = OsString::from(self.root.as_os_str());
        path.push(key);
        path.push(DATA_SUFFIX);
        Some(PathBuf::from(path))
    }

    /// Read the document stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let Some(path) = self.path_for(key) else {
            log::error!(target: LOG_TARGET, "Invalid file cache key: '{key}'");
            return None;
        };

        if self.ignore {
            log::debug!(target: LOG_TARGET, "Ignoring cached data for {key}");
            return None;
        }

        match fs::read_to_string(&path) {
            Ok(content) => {
                log::debug!(target: LOG_TARGET, "File cache hit for {key}");
                Some(content)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(target: LOG_TARGET, "File cache miss for {key}");
                None
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not read cache file '{}': {e:#}", path.display());
                None
            }
        }
    }

    /// Store `content` under `key`, replacing any previous document.
    ///
    /// Failures are logged and otherwise ignored; use [`try_put`](Self::try_put) to observe them.
    pub fn put(&self, key: &str, content: &str) {
        if let Err(e) = self.try_put(key, content) {
            log::error!(target: LOG_TARGET, "Could not save cache entry {key}: {e:#}");
        }
    }

    /// Store `content` under `key`, creating intermediate directories as needed.
    pub fn try_put(&self, key: &str, content: &str) -> Result<()> {
        let path = self.path_for(key).ok_or_else(|| app_err!("invalid file cache key: '{key}'"))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
        }

        fs::write(&path, content).into_app_err_with(|| format!("writing cache file '{}'", path.display()))?;
        log::debug!(target: LOG_TARGET, "Saved {} bytes for {key}", content.len());
        Ok(())
    }
}

/// Directory holding ppastats state for the current user (`<home>/.ppastats`).
pub fn state_dir() -> Result<PathBuf> {
    let dirs = BaseDirs::new().into_app_err("could not determine the home directory")?;
    Ok(dirs.home_dir().join(STATE_DIR_NAME))
}

/// Default cache root (`<home>/.ppastats/cache`).
pub fn default_root() -> Result<PathBuf> {
    Ok(state_dir()?.join("cache"))
}

/// Derive a cache key from a URL by dropping its scheme: `https://host/a/b` becomes `/host/a/b`.
///
/// Query strings are not part of the key.
#[must_use]
pub fn key_for_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let path = parsed.path().trim_end_matches('/');

    let key = match parsed.port() {
        Some(port) => format!("/{host}:{port}{path}"),
        None => format!("/{host}{path}"),
    };

    is_valid_key(&key).then_some(key)
}

fn is_valid_key(key: &str) -> bool {
    key.len() > 1 && key.starts_with('/') && !key.split('/').any(|segment| segment == "..")
}
