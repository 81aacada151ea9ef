//! Daily download history of a single publication.
//!
//! The saved series is resumed from its latest day, or from the publication's creation day
//! when nothing is saved. The remote query is first tried as one open-ended range; if that
//! fails, days are requested one at a time up to today, switching back to an open-ended
//! query as soon as one succeeds. Only days past the freshness window are saved, so recent
//! days are always re-fetched.

use super::Context;
use super::file_cache::key_for_url;
use super::launchpad::{TotalSeries, daily_totals_url};
use super::resilient_http::FetchError;
use chrono::{DateTime, NaiveDate, Utc};

const LOG_TARGET: &str = "   history";

const HISTORY_SUFFIX: &str = "/ddts";

/// Daily download totals of the publication at `self_link`, created at `date_created`.
///
/// When the remote source cannot be reached but a saved series exists, the saved series is
/// returned as is. The error is only surfaced when there is nothing to fall back on.
pub async fn daily_totals(ctx: &Context, self_link: &str, date_created: DateTime<Utc>) -> Result<TotalSeries, FetchError> {
    let key = key_for_url(self_link).map(|key| format!("{key}{HISTORY_SUFFIX}"));
    let cached = key.as_deref().and_then(|key| load_history(ctx, key));

    let start = cached
        .as_ref()
        .and_then(TotalSeries::last_date)
        .unwrap_or_else(|| date_created.date_naive());

    let fresh = match fetch_from(ctx, self_link, start).await {
        Ok(fresh) => fresh,
        Err(e) => {
            return match cached {
                Some(cached) => {
                    log::warn!(target: LOG_TARGET, "Using saved download history of {self_link} only: {e}");
                    Ok(cached)
                }
                None => Err(e),
            };
        }
    };

    let merged = match cached {
        Some(cached) => cached.union(&fresh),
        None => fresh,
    };

    if let Some(key) = &key {
        save_history(ctx, key, &merged);
    }

    Ok(merged)
}

async fn fetch_from(ctx: &Context, self_link: &str, start: NaiveDate) -> Result<TotalSeries, FetchError> {
    let open_ended = daily_totals_url(self_link, start, None).map_err(|e| FetchError::invalid_url(self_link, e))?;

    let error = match ctx.fetcher().fetch_json::<TotalSeries>(&open_ended).await {
        Ok(series) => return Ok(series),
        Err(e) => e,
    };

    log::warn!(target: LOG_TARGET, "Falling back to day-by-day download totals for {self_link}: {error}");

    let today = ctx.now().date_naive();
    let mut series = TotalSeries::new();
    let mut fetched_any = false;
    let mut day = start;

    while day <= today {
        let single = daily_totals_url(self_link, day, Some(day)).map_err(|e| FetchError::invalid_url(self_link, e))?;

        match ctx.fetcher().fetch_json::<TotalSeries>(&single).await {
            Ok(totals) => {
                series.union_in_place(&totals);
                fetched_any = true;
            }
            Err(e) => {
                log::error!(target: LOG_TARGET, "Download totals of {self_link} for {day} unavailable: {e}");
                break;
            }
        }

        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;

        let resumed = daily_totals_url(self_link, day, None).map_err(|e| FetchError::invalid_url(self_link, e))?;
        if let Ok(totals) = ctx.fetcher().fetch_json::<TotalSeries>(&resumed).await {
            log::debug!(target: LOG_TARGET, "Resumed open-ended download totals of {self_link} from {day}");
            series.union_in_place(&totals);
            break;
        }
    }

    // days between a failed single-day query and today are missing
    if fetched_any { Ok(series) } else { Err(error) }
}

fn load_history(ctx: &Context, key: &str) -> Option<TotalSeries> {
    let content = ctx.files().get(key)?;

    serde_json::from_str(&content)
        .inspect_err(|e| log::warn!(target: LOG_TARGET, "Discarding unreadable download history {key}: {e}"))
        .ok()
}

fn save_history(ctx: &Context, key: &str, series: &TotalSeries) {
    let settled = series.settled(ctx.now(), ctx.freshness_window());

    match serde_json::to_string(&settled) {
        Ok(json) => ctx.files().put(key, &json),
        Err(e) => log::error!(target: LOG_TARGET, "Could not encode download history {key}: {e}"),
    }
}
