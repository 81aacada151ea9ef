//! Data collection for Launchpad PPAs
//!
//! This module retrieves publication records and daily download totals from the Launchpad
//! web service and keeps a local copy of everything that can no longer change.
//!
//! # Implementation Model
//!
//! All shared resources live in a [`Context`] which is opened once per run and closed at the
//! end of it:
//! - **Fetcher**: HTTP GET with linear backoff retries on 500/502/503/504
//! - **File cache**: whole-document text files under `<home>/.ppastats/cache`, keyed by the
//!   URL path of the resource they were derived from
//! - **Memory cache**: bounded first-come cache of architecture and distribution series
//!   metadata, which are referenced by many publications
//!
//! [`sync_publications`] reconciles the saved publication snapshot of an archive with the
//! remote collection, and [`daily_totals`] does the same for the download history of a single
//! publication. Both only ever request what is newer than the saved data.

mod context;
pub mod file_cache;
mod history;
pub mod launchpad;
pub mod memory_cache;
pub mod resilient_http;
mod sync;

pub use context::{Context, DEFAULT_FRESHNESS_WINDOW, Settings};
pub use history::daily_totals;
pub use resilient_http::{FetchError, RetryPolicy};
pub use sync::{SyncOptions, SyncOutcome, sync_publications};
