use serde::{Deserialize, Serialize};

/// An architecture of a distribution release, e.g. `amd64` of Ubuntu Jammy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchSeries {
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub title: String,

    pub architecture_tag: String,

    /// Whether architecture-independent packages are built on this architecture.
    #[serde(default)]
    pub is_nominated_arch_indep: bool,

    pub distroseries_link: String,
}

/// A distribution release, e.g. Ubuntu 22.04 `jammy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroSeries {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub displayname: String,
}
