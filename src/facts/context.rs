use super::file_cache::{FileCache, key_for_url};
use super::launchpad::{ArchSeries, DistroSeries};
use super::memory_cache::{DEFAULT_CAPACITY, MemoryCache};
use super::resilient_http::{FetchError, Fetcher, RetryPolicy, decode_json};
use crate::Result;
use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};
use core::time::Duration;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;

const LOG_TARGET: &str = "   context";

/// Days younger than this are never written to the file cache.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(28 * 24 * 60 * 60);

/// Everything needed to open a [`Context`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_root: PathBuf,
    pub ignore_cache: bool,
    pub retry: RetryPolicy,
    pub freshness_window: Duration,
    pub memory_cache_capacity: usize,
    pub user_agent: String,

    /// Reference time for the run; recent-day filtering and fallback loops are bounded by it.
    pub now: DateTime<Utc>,
}

impl Settings {
    #[must_use]
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ignore_cache: false,
            retry: RetryPolicy::default(),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            memory_cache_capacity: DEFAULT_CAPACITY,
            user_agent: format!("ppastats/{}", env!("CARGO_PKG_VERSION")),
            now: Utc::now(),
        }
    }
}

/// Series metadata shared by many publications.
#[derive(Debug, Clone)]
enum Metadata {
    Arch(Arc<ArchSeries>),
    Distro(Arc<DistroSeries>),
}

impl Display for Metadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Arch(arch) => write!(f, "architecture {}", arch.architecture_tag),
            Self::Distro(distro) => write!(f, "distribution {}", distro.name),
        }
    }
}

/// Resources shared by one run: the HTTP fetcher, the on-disk cache and the in-process
/// metadata cache.
///
/// Created with [`Context::open`] and released with [`Context::close`].
#[derive(Debug)]
pub struct Context {
    fetcher: Fetcher,
    files: FileCache,
    memory: MemoryCache<Metadata>,
    freshness_window: Duration,
    now: DateTime<Utc>,
}

impl Context {
    pub fn open(settings: Settings) -> Result<Self> {
        log::debug!(
            target: LOG_TARGET,
            "Opening context with cache root '{}'{}",
            settings.cache_root.display(),
            if settings.ignore_cache { " (ignoring cached data)" } else { "" }
        );

        Ok(Self {
            fetcher: Fetcher::new(&settings.user_agent, settings.retry)?,
            files: FileCache::new(settings.cache_root, settings.ignore_cache),
            memory: MemoryCache::new(settings.memory_cache_capacity),
            freshness_window: settings.freshness_window,
            now: settings.now,
        })
    }

    #[must_use]
    pub const fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    #[must_use]
    pub const fn files(&self) -> &FileCache {
        &self.files
    }

    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    #[must_use]
    pub const fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Fetch `url`, going through the file cache when `use_cache` is set.
    ///
    /// A cache hit is returned without touching the network. Freshly fetched content is written
    /// back to the cache when caching is requested. The cache key ignores the query string.
    pub async fn get_url_content(&self, url: &str, use_cache: bool) -> Result<String, FetchError> {
        let key = if use_cache { key_for_url(url) } else { None };

        if let Some(key) = &key
            && let Some(content) = self.files.get(key)
        {
            return Ok(content);
        }

        let content = self.fetcher.fetch(url).await?;

        if let Some(key) = &key {
            self.files.put(key, &content);
        }

        Ok(content)
    }

    /// Resolve the architecture series at `url`.
    pub async fn arch_series(&mut self, url: &str) -> Result<Arc<ArchSeries>, FetchError> {
        if let Some(Metadata::Arch(arch)) = self.memory.get(url) {
            return Ok(Arc::clone(arch));
        }

        let arch = Arc::new(self.resolve::<ArchSeries>(url).await?);
        self.remember(url, Metadata::Arch(Arc::clone(&arch)));
        Ok(arch)
    }

    /// Resolve the distribution series at `url`.
    pub async fn distro_series(&mut self, url: &str) -> Result<Arc<DistroSeries>, FetchError> {
        if let Some(Metadata::Distro(distro)) = self.memory.get(url) {
            return Ok(Arc::clone(distro));
        }

        let distro = Arc::new(self.resolve::<DistroSeries>(url).await?);
        self.remember(url, Metadata::Distro(Arc::clone(&distro)));
        Ok(distro)
    }

    /// Release every cached resource and report what the run cost.
    pub fn close(self) {
        log::info!(
            target: LOG_TARGET,
            "Issued {} HTTP requests ({} retries), {} metadata entries cached",
            self.fetcher.request_count(),
            self.fetcher.retry_count(),
            self.memory.len()
        );

        self.memory.close();
    }

    /// Decode the metadata document at `url`, from the file cache when possible.
    ///
    /// A cached document that no longer decodes is refetched. A fetched document is only
    /// cached once it decodes.
    async fn resolve<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let key = key_for_url(url);

        if let Some(key) = &key
            && let Some(body) = self.files.get(key)
        {
            match serde_json::from_str(&body) {
                Ok(value) => return Ok(value),
                Err(e) => log::warn!(target: LOG_TARGET, "Refetching unreadable cached metadata for {url}: {e}"),
            }
        }

        let body = self.fetcher.fetch(url).await?;
        let value = decode_json(url, &body)?;

        if let Some(key) = &key {
            self.files.put(key, &body);
        }

        Ok(value)
    }

    fn remember(&mut self, url: &str, metadata: Metadata) {
        let key = url.to_string();
        let _ = self.memory.put(url, metadata, move |released| {
            log::trace!(target: LOG_TARGET, "Released {released} ({key})");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(root: &std::path::Path) -> Settings {
        Settings {
            retry: RetryPolicy::new(0, Duration::from_millis(1)),
            ..Settings::new(root)
        }
    }

    #[test]
    fn default_settings() {
        let s = Settings::new("/tmp/cache");
        assert_eq!(s.retry, RetryPolicy::default());
        assert_eq!(s.freshness_window, Duration::from_secs(2_419_200));
        assert_eq!(s.memory_cache_capacity, 1024);
        assert!(s.user_agent.starts_with("ppastats/"));
        assert!(!s.ignore_cache);
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn cached_content_is_served_without_network() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::open(settings(tmp.path())).unwrap();
        ctx.files().put("/unreachable.invalid/ubuntu/jammy", "{\"name\":\"jammy\"}");

        let content = ctx.get_url_content("https://unreachable.invalid/ubuntu/jammy", true).await.unwrap();

        assert_eq!(content, "{\"name\":\"jammy\"}");
        assert_eq!(ctx.fetcher().request_count(), 0);
        ctx.close();
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn distro_series_comes_from_file_cache_then_memory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut ctx = Context::open(settings(tmp.path())).unwrap();
        ctx.files().put("/unreachable.invalid/ubuntu/noble", "{\"name\":\"noble\",\"version\":\"24.04\"}");

        let first = ctx.distro_series("https://unreachable.invalid/ubuntu/noble").await.unwrap();
        let second = ctx.distro_series("https://unreachable.invalid/ubuntu/noble").await.unwrap();

        assert_eq!(first.version, "24.04");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.fetcher().request_count(), 0);
        ctx.close();
    }
}
