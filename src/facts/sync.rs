//! Incremental synchronization of an archive's publication history.
//!
//! The previously saved snapshot is loaded first. If it holds any records, only records
//! created at or after the newest one are requested; otherwise the full history is fetched.
//! Pages are followed in server order and merged into the snapshot by `self_link`. The
//! merged list replaces the snapshot only when every page was fetched.

use super::Context;
use super::file_cache::key_for_url;
use super::launchpad::{self, PackageStatus, PublicationList, PublicationPage, PublicationRecord};
use super::resilient_http::FetchError;
use crate::Result;
use ohno::IntoAppError;

const LOG_TARGET: &str = "      sync";

const SNAPSHOT_SUFFIX: &str = "/bpph";

/// Filters applied to the remote publication query.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub status: Option<PackageStatus>,

    /// Requested page size; out-of-range values fall back to the default.
    pub page_size: Option<u32>,
}

#[derive(Debug)]
pub struct SyncOutcome {
    pub publications: PublicationList,

    /// `false` when a page could not be fetched and the result is partial.
    pub complete: bool,
}

/// Bring the publication history of `archive_url` up to date.
///
/// A failed page fetch does not fail the sync: whatever was accumulated is returned with
/// [`SyncOutcome::complete`] cleared and the saved snapshot is left untouched.
pub async fn sync_publications(ctx: &mut Context, archive_url: &str, options: &SyncOptions) -> Result<SyncOutcome> {
    let snapshot_key = key_for_url(archive_url).map(|key| format!("{key}{SNAPSHOT_SUFFIX}"));
    if snapshot_key.is_none() {
        log::error!(target: LOG_TARGET, "Cannot derive a cache key from {archive_url}, publication history will not be saved");
    }

    let mut publications = snapshot_key.as_deref().map(|key| load_snapshot(ctx, key)).unwrap_or_default();
    let cached = publications.len();
    let since = publications.last_created();

    log::info!(
        target: LOG_TARGET,
        "Loaded {cached} cached publications for {archive_url}{}",
        since.map(|t| format!(", fetching records created since {}", launchpad::format_time(&t))).unwrap_or_default()
    );

    let page_size = launchpad::effective_page_size(options.page_size);
    let first_page = launchpad::publications_url(archive_url, options.status, page_size, since)
        .into_app_err_with(|| format!("building publication query for '{archive_url}'"))?;

    let mut next = Some(first_page);
    let mut complete = true;
    let mut pages = 0_usize;

    while let Some(url) = next.take() {
        let page: PublicationPage = match ctx.fetcher().fetch_json(&url).await {
            Ok(page) => page,
            Err(e) => {
                log::error!(target: LOG_TARGET, "Publication sync of {archive_url} stopped after {pages} pages: {e}");
                complete = false;
                break;
            }
        };

        pages += 1;
        log::debug!(target: LOG_TARGET, "Page {pages} of {archive_url} has {} entries", page.entries.len());

        for record in page.entries {
            if publications.contains(&record.self_link) {
                continue;
            }

            if keep_record(ctx, &record).await {
                let _ = publications.insert(record);
            }
        }

        next = page.next_collection_link;
    }

    log::info!(
        target: LOG_TARGET,
        "Synchronized {} publications for {archive_url} ({} new, {pages} pages)",
        publications.len(),
        publications.len() - cached
    );

    if complete && let Some(key) = &snapshot_key {
        save_snapshot(ctx, key, &publications);
    }

    Ok(SyncOutcome { publications, complete })
}

/// Architecture-independent binaries are published once per architecture; only the copy on
/// the nominated architecture is kept.
async fn keep_record(ctx: &mut Context, record: &PublicationRecord) -> bool {
    if record.architecture_specific {
        return true;
    }

    match ctx.arch_series(&record.distro_arch_series_link).await {
        Ok(arch) => arch.is_nominated_arch_indep,
        Err(e) => {
            log_dropped(record, &e);
            false
        }
    }
}

fn log_dropped(record: &PublicationRecord, e: &FetchError) {
    log::error!(
        target: LOG_TARGET,
        "Dropping {} {}: architecture series unavailable: {e}",
        record.binary_package_name,
        record.binary_package_version
    );
}

fn load_snapshot(ctx: &Context, key: &str) -> PublicationList {
    let Some(content) = ctx.files().get(key) else {
        return PublicationList::new();
    };

    PublicationList::from_snapshot(&content).unwrap_or_else(|e| {
        log::warn!(target: LOG_TARGET, "Discarding unreadable publication snapshot {key}: {e}");
        PublicationList::new()
    })
}

fn save_snapshot(ctx: &Context, key: &str, publications: &PublicationList) {
    match publications.to_snapshot() {
        Ok(json) => ctx.files().put(key, &json),
        Err(e) => log::error!(target: LOG_TARGET, "Could not encode publication snapshot {key}: {e}"),
    }
}
