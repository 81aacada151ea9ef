//! ppastats crate
//!
//! Collects per-package download statistics for a Launchpad PPA. Publication records and
//! daily download totals are synchronized incrementally with an on-disk cache so that
//! unchanged history is not fetched again, then rolled up into a tree of
//! repository → package → version → distribution → architecture statistics.
//!
//! This crate is an implementation detail of the `ppastats` tool. Its API is fluid and may
//! change without warning and in a semver-incompatible way.

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub(crate) type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub(crate) type HashSet<K> = rustc_hash::FxHashSet<K>;

pub(crate) fn hash_map_with_capacity<K, V>(capacity: usize) -> HashMap<K, V> {
    HashMap::with_capacity_and_hasher(capacity, rustc_hash::FxBuildHasher::default())
}

pub(crate) fn hash_set_with_capacity<K>(capacity: usize) -> HashSet<K> {
    HashSet::with_capacity_and_hasher(capacity, rustc_hash::FxBuildHasher::default())
}

#[doc(hidden)]
pub mod commands;

#[doc(hidden)]
pub mod facts;

#[doc(hidden)]
pub mod reports;

#[doc(hidden)]
pub mod stats;

pub use crate::commands::{Host, run};
