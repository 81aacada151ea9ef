//! Download statistics for Launchpad PPAs.
//!
//! # Overview
//!
//! `ppastats` reports how many times the binary packages of a Personal Package Archive
//! (PPA) hosted on Launchpad were downloaded, broken down by package, version,
//! distribution and architecture.
//!
//! Launchpad only serves the raw publication records and per-day download counts, and
//! fetching them is slow. Everything that can no longer change is therefore kept under
//! `~/.ppastats/cache`, so that subsequent runs only request what is new.
//!
//! # Basic Usage
//!
//! **Statistics of a PPA:**
//! ```bash
//! ppastats jfi psensor
//! ```
//!
//! **Only count published packages:**
//! ```bash
//! ppastats --status Published jfi psensor
//! ```
//!
//! **Write the statistics, including per-day totals, as JSON:**
//! ```bash
//! ppastats --json psensor.json jfi psensor
//! ```
//!
//! **Refetch everything:**
//! ```bash
//! ppastats --ignore-cache jfi psensor
//! ```
//!
//! # Configuration
//!
//! Settings are read from `~/.ppastats/ppastats.toml` when it exists, or from the file given
//! with `--config`:
//!
//! ```toml
//! base_url = "https://api.launchpad.net/1.0"
//! page_size = 150
//! max_retries = 10
//! retry_delay_step = "2s"
//! freshness_window = "28days"
//! memory_cache_capacity = 1024
//! ```
//!
//! Requests answered with HTTP 500, 502, 503 or 504 are retried up to `max_retries` times,
//! waiting `retry_delay_step`, then twice as long, then three times as long, and so on.
//! Download counts younger than `freshness_window` are never cached because Launchpad may
//! still revise them.
//!
//! # Logging
//!
//! Diagnostics are written to stderr. Use `--log-level` (`none`, `error`, `warn`, `info`,
//! `debug`, `trace`) or the `RUST_LOG` environment variable to control them.

use ppastats::{Host, run};
use std::io::Write;
use std::io::{stderr, stdout};

/// Default host that runs real OS commands.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[tokio::main]
async fn main() -> Result<(), ohno::AppError> {
    run(&mut RealHost, std::env::args()).await
}
