use crate::facts::launchpad::{PublicationRecord, TotalSeries};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Download statistics of a whole PPA.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepositoryStats {
    pub name: String,
    pub download_count: u64,
    pub totals: TotalSeries,
    pub packages: BTreeMap<String, PackageStats>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageStats {
    pub name: String,
    pub download_count: u64,
    pub totals: TotalSeries,

    /// Downloads of every version of the package, per distribution.
    pub distros: BTreeMap<String, PackageDistroStats>,

    pub versions: BTreeMap<String, VersionStats>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageDistroStats {
    pub name: String,
    pub download_count: u64,
    pub totals: TotalSeries,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VersionStats {
    pub name: String,
    pub download_count: u64,
    pub totals: TotalSeries,

    /// Creation time of the last publication seen for this version.
    pub date_created: Option<DateTime<Utc>>,

    pub distros: BTreeMap<String, DistroStats>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DistroStats {
    pub name: String,
    pub download_count: u64,
    pub archs: BTreeMap<String, ArchStats>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchStats {
    pub name: String,
    pub download_count: u64,
}

/// The share of one publication in the statistics.
#[derive(Debug, Clone, Copy)]
pub struct Contribution<'a> {
    pub record: &'a PublicationRecord,

    /// Distribution series name, e.g. `jammy`.
    pub distro: &'a str,

    /// Architecture tag, e.g. `amd64`.
    pub arch: &'a str,

    pub totals: &'a TotalSeries,
}

impl Contribution<'_> {
    #[must_use]
    pub fn download_count(&self) -> u64 {
        self.totals.total()
    }
}

impl RepositoryStats {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Accumulate a publication into every level of the tree, creating nodes as needed.
    pub fn add(&mut self, contribution: &Contribution<'_>) {
        let count = contribution.download_count();
        self.download_count += count;
        self.totals.accumulate_in_place(contribution.totals);

        let record = contribution.record;
        self.packages
            .entry(record.binary_package_name.clone())
            .or_insert_with(|| PackageStats::new(&record.binary_package_name))
            .add(contribution, count);
    }
}

impl PackageStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn add(&mut self, contribution: &Contribution<'_>, count: u64) {
        self.download_count += count;
        self.totals.accumulate_in_place(contribution.totals);

        let distro = self
            .distros
            .entry(contribution.distro.to_string())
            .or_insert_with(|| PackageDistroStats {
                name: contribution.distro.to_string(),
                ..PackageDistroStats::default()
            });
        distro.download_count += count;
        distro.totals.accumulate_in_place(contribution.totals);

        let record = contribution.record;
        let version = self
            .versions
            .entry(record.binary_package_version.clone())
            .or_insert_with(|| VersionStats {
                name: record.binary_package_version.clone(),
                ..VersionStats::default()
            });
        version.add(contribution, count);
    }
}

impl VersionStats {
    fn add(&mut self, contribution: &Contribution<'_>, count: u64) {
        self.download_count += count;
        self.totals.accumulate_in_place(contribution.totals);
        self.date_created = Some(contribution.record.date_created);

        let distro = self
            .distros
            .entry(contribution.distro.to_string())
            .or_insert_with(|| DistroStats {
                name: contribution.distro.to_string(),
                ..DistroStats::default()
            });
        distro.download_count += count;

        distro
            .archs
            .entry(contribution.arch.to_string())
            .or_insert_with(|| ArchStats {
                name: contribution.arch.to_string(),
                download_count: 0,
            })
            .download_count += count;
    }
}
