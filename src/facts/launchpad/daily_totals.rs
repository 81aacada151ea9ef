use super::parse_day;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Download count of a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub count: u64,
}

/// Day-ordered download counts with at most one entry per calendar day.
///
/// The JSON form is the one served by `getDailyDownloadTotals`: an object mapping
/// `YYYY-MM-DDT00:00:00+00:00` to a count. Only the calendar day of each key is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct TotalSeries {
    days: BTreeMap<NaiveDate, u64>,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid daily total date '{0}'")]
pub struct InvalidDay(String);

impl TotalSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count of a day, replacing any existing count.
    pub fn insert(&mut self, date: NaiveDate, count: u64) {
        let _ = self.days.insert(date, count);
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<u64> {
        self.days.get(&date).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Entries in ascending day order.
    pub fn iter(&self) -> impl Iterator<Item = DailyTotal> + '_ {
        self.days.iter().map(|(&date, &count)| DailyTotal { date, count })
    }

    #[must_use]
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    /// Sum of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.days.values().sum()
    }

    /// Combine two series of the same publication. Where both have a day, `incoming` wins.
    #[must_use]
    pub fn union(&self, incoming: &Self) -> Self {
        let mut merged = self.clone();
        merged.union_in_place(incoming);
        merged
    }

    pub fn union_in_place(&mut self, incoming: &Self) {
        self.days.extend(incoming.days.iter().map(|(&date, &count)| (date, count)));
    }

    /// Combine series of different publications. Where both have a day, the counts are added.
    #[must_use]
    pub fn accumulate(&self, other: &Self) -> Self {
        let mut sum = self.clone();
        sum.accumulate_in_place(other);
        sum
    }

    pub fn accumulate_in_place(&mut self, other: &Self) {
        for (&date, &count) in &other.days {
            let slot = self.days.entry(date).or_insert(0);
            *slot = slot.saturating_add(count);
        }
    }

    /// Days old enough that their counts will no longer change.
    ///
    /// A day is kept when more than `window` has elapsed between its start (midnight UTC) and
    /// `now`.
    #[must_use]
    pub fn settled(&self, now: DateTime<Utc>, window: Duration) -> Self {
        let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);

        let days = self
            .days
            .iter()
            .filter(|&(&date, _)| now.signed_duration_since(date.and_time(NaiveTime::MIN).and_utc()) > window)
            .map(|(&date, &count)| (date, count))
            .collect();

        Self { days }
    }
}

impl FromIterator<DailyTotal> for TotalSeries {
    /// Later entries for the same day replace earlier ones.
    fn from_iter<I: IntoIterator<Item = DailyTotal>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().map(|t| (t.date, t.count)).collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, u64>> for TotalSeries {
    type Error = InvalidDay;

    fn try_from(raw: BTreeMap<String, u64>) -> Result<Self, Self::Error> {
        let mut series = Self::new();
        for (key, count) in raw {
            let date = parse_day(&key).ok_or(InvalidDay(key))?;
            series.insert(date, count);
        }
        Ok(series)
    }
}

impl From<TotalSeries> for BTreeMap<String, u64> {
    fn from(series: TotalSeries) -> Self {
        series
            .days
            .into_iter()
            .map(|(date, count)| (format!("{}T00:00:00+00:00", date.format("%Y-%m-%d")), count))
            .collect()
    }
}
