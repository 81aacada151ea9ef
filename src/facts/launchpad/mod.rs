//! Launchpad web service data model and query construction.
//!
//! Three kinds of documents are consumed:
//!
//! - paginated collections of binary package publishing history records
//!   ([`PublicationRecord`]), returned by `getPublishedBinaries` on an archive;
//! - daily download totals of a single publication ([`TotalSeries`]), returned by
//!   `getDailyDownloadTotals` as an object keyed by ISO 8601 date-times;
//! - architecture and distribution series metadata ([`ArchSeries`], [`DistroSeries`]),
//!   referenced by URL from every publication.

mod daily_totals;
mod publication;
mod series;

pub use daily_totals::{DailyTotal, TotalSeries};
pub use publication::{PublicationList, PublicationPage, PublicationRecord};
pub use series::{ArchSeries, DistroSeries};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use url::Url;

/// Root of the Launchpad web service.
pub const DEFAULT_BASE_URL: &str = "https://api.launchpad.net/1.0";

/// Number of entries requested per page of publications unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 150;

/// Largest page size the service accepts.
pub const MAX_PAGE_SIZE: u32 = 300;

/// Format of timestamps exchanged with the service (`YYYY-MM-DDTHH:MM:SS`).
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Publication status filter accepted by `getPublishedBinaries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, strum::Display)]
#[value(rename_all = "PascalCase")]
pub enum PackageStatus {
    Pending,
    Published,
    Superseded,
    Deleted,
    Obsolete,
}

/// URL of the archive holding the PPA `ppa` owned by `owner`.
#[must_use]
pub fn archive_url(base_url: &str, owner: &str, ppa: &str) -> String {
    format!("{}/~{owner}/+archive/{ppa}", base_url.trim_end_matches('/'))
}

/// Resolve a requested page size, falling back to the default when it is out of range.
#[must_use]
pub fn effective_page_size(requested: Option<u32>) -> u32 {
    match requested {
        Some(size) if (1..=MAX_PAGE_SIZE).contains(&size) => size,
        Some(size) => {
            log::warn!("Page size {size} is outside 1..={MAX_PAGE_SIZE}, using {DEFAULT_PAGE_SIZE}");
            DEFAULT_PAGE_SIZE
        }
        None => DEFAULT_PAGE_SIZE,
    }
}

/// First page of the publications of an archive, optionally limited to records created at or
/// after `since`.
pub fn publications_url(
    archive_url: &str,
    status: Option<PackageStatus>,
    page_size: u32,
    since: Option<DateTime<Utc>>,
) -> Result<String, url::ParseError> {
    let mut url = Url::parse(archive_url)?;

    {
        let mut query = url.query_pairs_mut();
        let _ = query.append_pair("ws.op", "getPublishedBinaries");
        let _ = query.append_pair("ws.size", &page_size.to_string());

        if let Some(status) = status {
            let _ = query.append_pair("status", &status.to_string());
        }

        if let Some(since) = since {
            let _ = query.append_pair("created_since_date", &format_time(&since));
        }
    }

    Ok(url.into())
}

/// Daily download totals of a publication from `start`, either open-ended or up to `end`
/// inclusive.
pub fn daily_totals_url(self_link: &str, start: NaiveDate, end: Option<NaiveDate>) -> Result<String, url::ParseError> {
    let mut url = Url::parse(self_link)?;

    {
        let mut query = url.query_pairs_mut();
        let _ = query.append_pair("ws.op", "getDailyDownloadTotals");
        let _ = query.append_pair("start_date", &start.format(DATE_FORMAT).to_string());

        if let Some(end) = end {
            let _ = query.append_pair("end_date", &end.format(DATE_FORMAT).to_string());
        }
    }

    Ok(url.into())
}

/// Parse a service timestamp, ignoring fractional seconds and offset.
#[must_use]
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_and_remainder(s, TIME_FORMAT).ok().map(|(time, _)| time.and_utc())
}

#[must_use]
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse the calendar day of an ISO 8601 date or date-time, discarding time of day and offset.
#[must_use]
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_and_remainder(s, DATE_FORMAT).ok().map(|(date, _)| date)
}

/// Serde adapter for service timestamps.
pub(crate) mod time_format {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_time(&s).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{s}'")))
    }
}
