//! Aggregation of download counts into a repository → package → version → distribution →
//! architecture tree.
//!
//! Counts are summed at every level. Repository, package, version and package-distribution
//! nodes also carry a per-day series accumulated from the same contributions.

mod builder;
mod tree;

pub use builder::build_repository_stats;
pub use tree::{ArchStats, Contribution, DistroStats, PackageDistroStats, PackageStats, RepositoryStats, VersionStats};
