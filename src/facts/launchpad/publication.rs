use super::time_format;
use crate::HashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One binary package publishing history record.
///
/// Only the fields needed for aggregation are kept; everything else the service returns is
/// discarded during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub binary_package_name: String,
    pub binary_package_version: String,
    pub distro_arch_series_link: String,

    /// Unique identity of the record.
    pub self_link: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub architecture_specific: bool,

    #[serde(with = "time_format")]
    pub date_created: DateTime<Utc>,
}

/// One page of a publication collection, also used as the on-disk snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_collection_link: Option<String>,

    #[serde(default)]
    pub entries: Vec<PublicationRecord>,
}

/// An ordered collection of publications with no two records sharing a `self_link`.
#[derive(Debug, Clone, Default)]
pub struct PublicationList {
    records: Vec<PublicationRecord>,
    identities: HashSet<String>,
}

impl PublicationList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record unless one with the same `self_link` is already present.
    ///
    /// Returns `true` if the record was added.
    pub fn insert(&mut self, record: PublicationRecord) -> bool {
        if self.identities.contains(&record.self_link) {
            return false;
        }

        let _ = self.identities.insert(record.self_link.clone());
        self.records.push(record);
        true
    }

    #[must_use]
    pub fn contains(&self, self_link: &str) -> bool {
        self.identities.contains(self_link)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, PublicationRecord> {
        self.records.iter()
    }

    /// Most recent creation time of any record, used as the resume point of an incremental sync.
    #[must_use]
    pub fn last_created(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.date_created).max()
    }

    /// Decode a snapshot written by [`to_snapshot`](Self::to_snapshot).
    ///
    /// Duplicate records in the snapshot are dropped.
    pub fn from_snapshot(json: &str) -> Result<Self, serde_json::Error> {
        let page: PublicationPage = serde_json::from_str(json)?;
        Ok(page.entries.into_iter().collect())
    }

    /// Encode the list as `{"entries":[...]}`.
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            entries: &'a [PublicationRecord],
        }

        serde_json::to_string(&Snapshot { entries: &self.records })
    }
}

impl FromIterator<PublicationRecord> for PublicationList {
    fn from_iter<I: IntoIterator<Item = PublicationRecord>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut list = Self {
            records: Vec::with_capacity(iter.size_hint().0),
            identities: crate::hash_set_with_capacity(iter.size_hint().0),
        };
        for record in iter {
            let _ = list.insert(record);
        }
        list
    }
}

impl<'a> IntoIterator for &'a PublicationList {
    type Item = &'a PublicationRecord;
    type IntoIter = core::slice::Iter<'a, PublicationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::launchpad::parse_time;

    fn record(id: u32, created: &str) -> PublicationRecord {
        PublicationRecord {
            binary_package_name: "psensor".to_string(),
            binary_package_version: "1.0.0".to_string(),
            distro_arch_series_link: "https://lp.test/ubuntu/jammy/amd64".to_string(),
            self_link: format!("https://lp.test/~o/+archive/p/+binarypub/{id}"),
            status: "Published".to_string(),
            architecture_specific: true,
            date_created: parse_time(created).unwrap(),
        }
    }

    #[test]
    fn insert_is_idempotent_on_self_link() {
        let mut list = PublicationList::new();
        assert!(list.insert(record(1, "2024-01-01T00:00:00")));
        assert!(!list.insert(record(1, "2024-02-01T00:00:00")));
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().unwrap().date_created, parse_time("2024-01-01T00:00:00").unwrap());
    }

    #[test]
    fn collect_drops_duplicates_and_keeps_order() {
        let list: PublicationList = [
            record(1, "2024-01-01T00:00:00"),
            record(2, "2024-01-02T00:00:00"),
            record(2, "2024-01-02T00:00:00"),
            record(3, "2024-01-03T00:00:00"),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.len(), 3);
        let links: Vec<_> = list.iter().map(|r| r.self_link.rsplit('/').next().unwrap().to_string()).collect();
        assert_eq!(links, ["1", "2", "3"]);
    }

    #[test]
    fn last_created_is_the_maximum() {
        let list: PublicationList = [
            record(1, "2024-01-05T00:00:00"),
            record(2, "2024-03-01T12:00:00"),
            record(3, "2024-02-01T00:00:00"),
        ]
        .into_iter()
        .collect();

        assert_eq!(list.last_created(), parse_time("2024-03-01T12:00:00"));
        assert_eq!(PublicationList::new().last_created(), None);
    }

    #[test]
    fn snapshot_round_trip() {
        let list: PublicationList = [record(1, "2024-01-05T00:00:00"), record(2, "2024-01-06T00:00:00")].into_iter().collect();

        let json = list.to_snapshot().unwrap();
        assert!(json.starts_with("{\"entries\":["));

        let restored = PublicationList::from_snapshot(&json).unwrap();
        assert!(restored.iter().eq(list.iter()));
    }

    #[test]
    fn decodes_service_page_ignoring_unknown_fields() {
        let json = r#"{
            "start": 0,
            "total_size": 1,
            "next_collection_link": "https://lp.test/next",
            "entries": [{
                "binary_package_name": "psensor",
                "binary_package_version": "1.1.0",
                "distro_arch_series_link": "https://lp.test/ubuntu/jammy/i386",
                "self_link": "https://lp.test/~o/+archive/p/+binarypub/7",
                "status": "Superseded",
                "architecture_specific": false,
                "date_created": "2023-11-02T08:15:30.123456+00:00",
                "resource_type_link": "https://lp.test/#binary_package_publishing_history"
            }]
        }"#;

        let page: PublicationPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_collection_link.as_deref(), Some("https://lp.test/next"));
        assert_eq!(page.entries.len(), 1);
        assert!(!page.entries[0].architecture_specific);
        assert_eq!(page.entries[0].date_created, parse_time("2023-11-02T08:15:30").unwrap());
    }
}
