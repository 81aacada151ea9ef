use crate::Result;
use crate::stats::RepositoryStats;
use core::fmt::Write;
use owo_colors::OwoColorize;

/// Write the statistics tree with one node per line, children indented by one tab.
pub fn generate<W: Write>(stats: &RepositoryStats, use_colors: bool, writer: &mut W) -> Result<()> {
    line(writer, 0, &stats.name, stats.download_count, use_colors)?;

    for package in stats.packages.values() {
        line(writer, 1, &package.name, package.download_count, use_colors)?;

        for version in package.versions.values() {
            line(writer, 2, &version.name, version.download_count, use_colors)?;

            for distro in version.distros.values() {
                line(writer, 3, &distro.name, distro.download_count, use_colors)?;

                for arch in distro.archs.values() {
                    line(writer, 4, &arch.name, arch.download_count, use_colors)?;
                }
            }
        }
    }

    Ok(())
}

fn line<W: Write>(writer: &mut W, depth: usize, name: &str, count: u64, use_colors: bool) -> Result<()> {
    for _ in 0..depth {
        writer.write_char('\t')?;
    }

    if use_colors && depth == 0 {
        writeln!(writer, "{} ({})", name.bold(), count.green())?;
    } else if use_colors {
        writeln!(writer, "{name} ({})", count.green())?;
    } else {
        writeln!(writer, "{name} ({count})")?;
    }

    Ok(())
}
