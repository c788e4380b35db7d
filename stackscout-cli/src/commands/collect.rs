//! `stackscout collect` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use stackscout_core::types::CatalogEntry;
use tracing::info;

use super::{build_service, load_config};
use crate::cli::CollectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `collect` command.
///
/// Collects one item directly through the processor (fetch, normalize,
/// score, upsert) without starting the worker pool.
pub async fn execute(
    args: CollectArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = collect(&args, config_path).await?;
    writer.render(&report)
}

/// Run the collection and build the report.
pub async fn collect(args: &CollectArgs, config_path: &Path) -> Result<EntryReport, CliError> {
    let config = load_config(config_path).await?;
    let service = build_service(&config)?;

    info!(source = %args.source, name = %args.name, "collecting");
    let entry = service.handle().collect_one(args.source, &args.name).await?;
    Ok(EntryReport { entry })
}

/// A single catalog entry.
#[derive(Serialize)]
pub struct EntryReport {
    #[serde(flatten)]
    pub entry: CatalogEntry,
}

impl Render for EntryReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let e = &self.entry;
        writeln!(w, "{} {}", e.name.bold(), e.version)?;
        writeln!(w, "  Source:       {}", e.source)?;
        writeln!(w, "  License:      {}", e.license.as_deref().unwrap_or("-"))?;
        writeln!(w, "  Health score: {}", colored_score(e.health_score))?;
        writeln!(
            w,
            "  Last release: {}",
            e.last_release.as_deref().unwrap_or("-")
        )?;
        writeln!(w, "  Repository:   {}", e.repository.as_deref().unwrap_or("-"))?;
        if let Some(description) = &e.description {
            writeln!(w, "  Description:  {}", description)?;
        }
        Ok(())
    }
}

/// Health score colored by band: 70+ green, 40+ yellow, red below.
pub(crate) fn colored_score(score: u8) -> colored::ColoredString {
    use colored::Colorize;

    let text = score.to_string();
    match score {
        70.. => text.green(),
        40..=69 => text.yellow(),
        _ => text.red(),
    }
}
