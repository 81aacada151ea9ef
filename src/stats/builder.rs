use super::{Contribution, RepositoryStats};
use crate::Result;
use crate::facts::launchpad::{PublicationList, PublicationRecord};
use crate::facts::{Context, daily_totals};
use ohno::bail;

const LOG_TARGET: &str = "     stats";

/// Roll every publication up into a statistics tree named `name`.
///
/// Publications whose series metadata or download history cannot be retrieved are skipped
/// and logged. An empty publication list is an error: no statistics can be produced from it.
pub async fn build_repository_stats(ctx: &mut Context, name: &str, publications: &PublicationList) -> Result<RepositoryStats> {
    if publications.is_empty() {
        bail!("no publication records found for '{name}'");
    }

    let mut stats = RepositoryStats::new(name);
    let mut skipped = 0_usize;

    for (index, record) in publications.iter().enumerate() {
        log::debug!(
            target: LOG_TARGET,
            "[{}/{}] {} {}",
            index + 1,
            publications.len(),
            record.binary_package_name,
            record.binary_package_version
        );

        if !add_record(ctx, &mut stats, record).await {
            skipped += 1;
        }
    }

    if skipped > 0 {
        log::warn!(target: LOG_TARGET, "Skipped {skipped} of {} publications", publications.len());
    }

    log::info!(
        target: LOG_TARGET,
        "{name}: {} downloads across {} packages",
        stats.download_count,
        stats.packages.len()
    );

    Ok(stats)
}

async fn add_record(ctx: &mut Context, stats: &mut RepositoryStats, record: &PublicationRecord) -> bool {
    let arch = match ctx.arch_series(&record.distro_arch_series_link).await {
        Ok(arch) => arch,
        Err(e) => {
            log::error!(target: LOG_TARGET, "Skipping {}: no architecture series: {e}", record.self_link);
            return false;
        }
    };

    let distro = match ctx.distro_series(&arch.distroseries_link).await {
        Ok(distro) => distro,
        Err(e) => {
            log::error!(target: LOG_TARGET, "Skipping {}: no distribution series: {e}", record.self_link);
            return false;
        }
    };

    let totals = match daily_totals(ctx, &record.self_link, record.date_created).await {
        Ok(totals) => totals,
        Err(e) => {
            log::error!(target: LOG_TARGET, "Skipping {}: no download history: {e}", record.self_link);
            return false;
        }
    };

    stats.add(&Contribution {
        record,
        distro: &distro.name,
        arch: &arch.architecture_tag,
        totals: &totals,
    });

    true
}
