//! `stackscout scan` command handler

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use stackscout_collector::{CatalogStore, CollectorHandle, InMemoryCatalogStore};
use stackscout_core::pipeline::Pipeline;
use stackscout_core::types::{CatalogEntry, JobStatus, ScanJob};

use super::collect::colored_score;
use super::{build_service, load_config};
use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
///
/// Returns `CliError::Scan` (exit code 4) when the job ends as FAILED,
/// after the report has been rendered.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = scan(&args, config_path).await?;
    writer.render(&report)?;

    if report.job.status == JobStatus::Failed {
        return Err(CliError::Scan(
            report
                .job
                .error_message
                .clone()
                .unwrap_or_else(|| "scan job failed".to_owned()),
        ));
    }
    Ok(())
}

/// Run a scan job with an in-process worker pool and build the report.
pub async fn scan(args: &ScanArgs, config_path: &Path) -> Result<ScanReport, CliError> {
    let config = load_config(config_path).await?;
    let mut service = build_service(&config)?;

    service.start().await?;
    let result = run_job(&service.handle(), args).await;
    if let Err(e) = service.stop().await {
        warn!(error = %e, "failed to stop collector service");
    }
    let job = result?;

    let entries = service.handle().store().list().await;
    Ok(ScanReport { job, entries })
}

async fn run_job(
    handle: &CollectorHandle<InMemoryCatalogStore>,
    args: &ScanArgs,
) -> Result<ScanJob, CliError> {
    let job = handle.start_scan(args.source, args.names.clone()).await?;
    info!(job_id = %job.id, source = %args.source, items = args.names.len(), "scan started");

    let timeout = Duration::from_secs(args.timeout_secs);
    match tokio::time::timeout(timeout, handle.wait_for_job(job.id)).await {
        Ok(finished) => Ok(finished?),
        Err(_) => {
            if let Err(e) = handle.cancel_job(job.id).await {
                warn!(job_id = %job.id, error = %e, "failed to cancel timed out job");
            }
            Err(CliError::Scan(format!(
                "job {} did not finish within {}s",
                job.id, args.timeout_secs
            )))
        }
    }
}

/// Finished scan job plus the entries it produced.
#[derive(Serialize)]
pub struct ScanReport {
    pub job: ScanJob,
    pub entries: Vec<CatalogEntry>,
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let status = self.job.status.as_str();
        let status_colored = match self.job.status {
            JobStatus::Completed => status.green().bold(),
            JobStatus::Failed => status.red().bold(),
            _ => status.yellow(),
        };

        writeln!(w, "Scan job: {}", self.job.id.to_string().bold())?;
        writeln!(w, "Source: {}", self.job.source)?;
        writeln!(w, "Status: {}", status_colored)?;
        writeln!(
            w,
            "Processed: {}/{} (failed: {})",
            self.job.processed_count,
            self.job.packages_count.unwrap_or(self.job.processed_count),
            self.job.failed_count
        )?;
        if let Some(message) = &self.job.error_message {
            writeln!(w, "Error: {}", message.red())?;
        }
        if !self.job.failed_packages.is_empty() {
            writeln!(w, "Failed: {}", self.job.failed_packages.join(", "))?;
        }
        writeln!(w)?;

        if self.entries.is_empty() {
            writeln!(w, "{}", "No entries collected.".yellow())?;
            return Ok(());
        }

        writeln!(
            w,
            "{:<30} {:<14} {:<16} {:>5}  Last release",
            "Name", "Version", "License", "Score"
        )?;
        writeln!(w, "{}", "-".repeat(90))?;
        for e in &self.entries {
            writeln!(
                w,
                "{:<30} {:<14} {:<16} {:>5}  {}",
                e.name,
                e.version,
                e.license.as_deref().unwrap_or("-"),
                colored_score(e.health_score),
                e.last_release.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackscout_core::types::Source;

    fn failed_job() -> ScanJob {
        let mut job = ScanJob::new(Source::Npm, Some(2));
        job.status = JobStatus::Failed;
        job.processed_count = 2;
        job.failed_count = 1;
        job.failed_packages = vec!["left-pad-ghost".to_owned()];
        job.error_message = Some("1 of 2 items failed".to_owned());
        job
    }

    #[test]
    fn test_scan_report_render_failed_job() {
        colored::control::set_override(false);
        let report = ScanReport {
            job: failed_job(),
            entries: Vec::new(),
        };

        let mut buffer = Vec::new();
        report
            .render_text(&mut buffer)
            .expect("text rendering should succeed");

        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Status: FAILED"));
        assert!(output.contains("Processed: 2/2 (failed: 1)"));
        assert!(output.contains("Error: 1 of 2 items failed"));
        assert!(output.contains("Failed: left-pad-ghost"));
        assert!(output.contains("No entries collected."));
    }

    #[test]
    fn test_scan_report_json_contains_job_and_entries() {
        let report = ScanReport {
            job: failed_job(),
            entries: Vec::new(),
        };
        let json = serde_json::to_value(&report).expect("should serialize");
        assert_eq!(json["job"]["status"], "FAILED");
        assert!(json["entries"].as_array().is_some_and(|a| a.is_empty()));
    }
}
