use crate::Result;
use crate::stats::RepositoryStats;
use core::fmt::Write;

pub fn generate<W: Write>(stats: &RepositoryStats, writer: &mut W) -> Result<()> {
    write!(writer, "{}", serde_json::to_string_pretty(stats)?)?;
    Ok(())
}
