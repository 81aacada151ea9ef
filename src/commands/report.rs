use super::Host;
use super::common::{ColorMode, LogLevel, init_logging};
use super::config::Config;
use crate::Result;
use crate::facts::launchpad::{PackageStatus, archive_url};
use crate::facts::{Context, Settings, SyncOptions, file_cache, sync_publications};
use crate::reports::{generate_console, generate_json};
use crate::stats::{RepositoryStats, build_repository_stats};
use camino::Utf8PathBuf;
use chrono::Utc;
use clap::Parser;
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Launchpad user or team owning the PPA
    #[arg(value_name = "OWNER")]
    pub owner: String,

    /// Name of the PPA
    #[arg(value_name = "PPA")]
    pub ppa: String,

    /// Only count publications with this status
    #[arg(long, value_name = "STATUS")]
    pub status: Option<PackageStatus>,

    /// Publications requested per page (1..=300, overrides the configuration file)
    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Ignore cached data and fetch everything fresh (the cache is still updated)
    #[arg(long)]
    pub ignore_cache: bool,

    /// Directory where downloaded data is cached (default is `~/.ppastats/cache`)
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Path to configuration file (default is `~/.ppastats/ppastats.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Write the statistics to a JSON file instead of to the terminal
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub json: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: LogLevel,
}

/// Collect the statistics of a PPA and report them.
///
/// Failures are written to the host's error stream and terminate it with status 1.
pub async fn process_report<H: Host>(host: &mut H, args: &ReportArgs) -> Result<()> {
    init_logging(args.log_level);

    match report(host, args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = writeln!(host.error(), "ppastats: {e}");
            host.exit(1);
            Err(e)
        }
    }
}

async fn report<H: Host>(host: &mut H, args: &ReportArgs) -> Result<()> {
    let config = Config::load(args.config.as_ref())?;

    let cache_root = match &args.cache_dir {
        Some(dir) => dir.as_std_path().to_path_buf(),
        None => file_cache::default_root()?,
    };

    let defaults = Settings::new(cache_root);
    let settings = Settings {
        ignore_cache: args.ignore_cache,
        retry: config.retry_policy(),
        freshness_window: config.freshness_window,
        memory_cache_capacity: config.memory_cache_capacity,
        user_agent: config.user_agent.clone().unwrap_or_else(|| defaults.user_agent.clone()),
        now: Utc::now(),
        ..defaults
    };

    let mut ctx = Context::open(settings)?;
    let stats = collect(&mut ctx, &config, args).await;
    ctx.close();
    let stats = stats?;

    if let Some(path) = &args.json {
        let mut text = String::new();
        generate_json(&stats, &mut text)?;
        fs::write(path, text).into_app_err_with(|| format!("writing JSON report to '{path}'"))?;
    } else {
        let mut text = String::new();
        generate_console(&stats, args.color.use_colors(), &mut text)?;
        host.output().write_all(text.as_bytes()).into_app_err("writing report")?;
    }

    Ok(())
}

async fn collect(ctx: &mut Context, config: &Config, args: &ReportArgs) -> Result<RepositoryStats> {
    let archive = archive_url(&config.base_url, &args.owner, &args.ppa);

    let options = SyncOptions {
        status: args.status,
        page_size: Some(args.page_size.unwrap_or(config.page_size)),
    };

    let outcome = sync_publications(ctx, &archive, &options).await?;
    if !outcome.complete {
        log::warn!("Publication history of {archive} is incomplete, statistics may be partial");
    }

    build_repository_stats(ctx, &args.ppa, &outcome.publications).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::host::TestHost;

    #[test]
    fn parses_positional_and_options() {
        let args = ReportArgs::try_parse_from([
            "ppastats",
            "jfi",
            "psensor",
            "--status",
            "Published",
            "--page-size",
            "75",
            "--ignore-cache",
            "--color",
            "never",
        ])
        .unwrap();

        assert_eq!(args.owner, "jfi");
        assert_eq!(args.ppa, "psensor");
        assert_eq!(args.status, Some(PackageStatus::Published));
        assert_eq!(args.page_size, Some(75));
        assert!(args.ignore_cache);
        assert_eq!(args.color, ColorMode::Never);
        assert_eq!(args.log_level, LogLevel::Warn);
        assert!(args.json.is_none());
    }

    #[test]
    fn requires_owner_and_ppa() {
        assert!(ReportArgs::try_parse_from(["ppastats", "jfi"]).is_err());
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(ReportArgs::try_parse_from(["ppastats", "jfi", "psensor", "--status", "Gone"]).is_err());
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn failure_is_reported_through_host() {
        let tmp = tempfile::tempdir().unwrap();
        let cache_dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let config_path = cache_dir.join("missing.toml");

        let args = ReportArgs::try_parse_from([
            "ppastats",
            "jfi",
            "psensor",
            "--cache-dir",
            cache_dir.as_str(),
            "--config",
            config_path.as_str(),
            "--log-level",
            "none",
        ])
        .unwrap();

        let mut host = TestHost::new();
        let result = process_report(&mut host, &args).await;

        assert!(result.is_err());
        assert_eq!(host.exit_code, Some(1));
        assert!(host.error_text().starts_with("ppastats: "));
        assert!(host.output_text().is_empty());
    }
}
