//! Command-line interface and orchestration for ppastats
//!
//! `ppastats [OPTIONS] <OWNER> <PPA>` synchronizes the publication history and download
//! totals of a PPA with the local cache, rolls them up into a statistics tree, and prints
//! the tree to the terminal or writes it as JSON.
//!
//! # Implementation Model
//!
//! The `run` function parses command-line arguments using clap and hands them to the report
//! command, which:
//!
//! 1. Loads the configuration file (or the embedded defaults)
//! 2. Opens a `Context` over the cache directory
//! 3. Synchronizes the publication list of the archive
//! 4. Builds the statistics tree, fetching each publication's download history
//! 5. Closes the context and renders the tree
//!
//! All output goes through a `Host` so the command can be exercised in tests.

mod common;
mod config;
mod host;
mod report;
mod run;

pub use common::{ColorMode, LogLevel};
pub use config::Config;
pub use host::Host;
pub use report::{ReportArgs, process_report};
pub use run::run;
