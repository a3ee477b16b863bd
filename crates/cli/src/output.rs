use crate::error::CliError;
use chrono::Utc;
use engine_config::report::validation::ValidationReport;
use engine_runtime::execution::offload::QueuedJob;
use model::execution::{job::JobSpec, progress::ProgressStatus};
use serde::Serialize;
use std::path::Path;

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)
}

/// Writes `value` as pretty JSON to `path`, or to stdout when there is none.
pub async fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<(), CliError> {
    let json = to_json(value)?;
    match path {
        Some(path) => tokio::fs::write(path, json).await?,
        None => println!("{json}"),
    }
    Ok(())
}

pub fn print_validation(report: &ValidationReport) {
    println!("{:<24} {:?}", "Status", report.status);
    println!("{:<24} {}", "Rows", report.total_rows);
    println!("{:<24} {}", "Distinct partitions", report.distinct_partitions);
    println!(
        "{:<24} {:.2}",
        "Avg rows per partition", report.avg_rows_per_partition
    );
    println!("{:<24} {}", "Illegal keys", report.illegal_keys);
    println!("{:<24} {}", "Duplicate keys", report.duplicates);
    println!("{:<24} {} ms", "Elapsed", report.elapsed_ms);

    if !report.findings.is_empty() {
        println!();
        for finding in &report.findings {
            match finding.row {
                Some(row) => println!("  row {row:<8} {}", finding.message),
                None => println!("  {}", finding.message),
            }
        }
    }
}

fn describe(job: &JobSpec) -> String {
    format!(
        "{} --> {}:{}",
        job.input_blob_name(),
        job.account,
        job.table
    )
}

pub fn print_status(job: &JobSpec, status: Option<&ProgressStatus>) {
    println!("Status for table upload {}", describe(job));

    let Some(status) = status else {
        println!("No upload started yet. Run `tabload upload` to begin.");
        return;
    };

    if let Some(modified) = status.last_modified {
        let age = (Utc::now() - modified).num_seconds().max(0);
        println!("(last updated {age} seconds ago)");
    }

    if status.completed {
        println!("Upload is successful!");
    } else {
        println!(
            "In progress: {}/{} bytes {}%",
            status.progress_bytes,
            status.input_length,
            status.percent_complete()
        );
    }

    println!(
        "Took {}ms ({} minutes), ({}% spent in table calls)",
        status.time_in_read_ms,
        status.time_in_read_ms / 60_000,
        status.commit_time_percent()
    );
    println!(
        "{} rows uploaded ({} read)",
        status.total_committed, status.total_read
    );
    if status.total_skipped > 0 {
        println!(
            "{} rows were skipped because their keys contain illegal characters",
            status.total_skipped
        );
    }
    if status.is_resumed() {
        println!("Upload was resumed: {} sessions", status.session_counter);
    }
}

pub fn print_queued(queued: &QueuedJob) {
    match queued.uploaded_bytes {
        Some(bytes) => println!("Copied {bytes} bytes to {}", queued.job.input_blob_name()),
        None => println!("Input already in the blob store, not copied"),
    }
    println!(
        "Queued {} on '{}' as message {}",
        describe(&queued.job),
        queued.queue,
        queued.message_id
    );
    println!("Run `tabload status` with the same job to follow it.");
}
