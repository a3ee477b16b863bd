use crate::{
    commands::{Commands, JobArgs},
    config::{CliConfig, DEFAULT_CONTAINER},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::{
    blob::fs::FsBlobStore, error::StoreError, queue::fs::FsJobQueue,
    table::sled_store::SledTableStore,
};
use engine_runtime::IngestEngine;
use model::{
    core::identifiers::BlobRef,
    execution::job::{InputLocation, JobSpec},
};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "tabload",
    version,
    about = "Resumable bulk upload of delimited files into partitioned tables"
)]
struct Cli {
    #[arg(long, global = true, help = "Config file (default: ~/.tabload/config.json)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(CliError::ShutdownRequested) => ExitCode::ShutdownRequested,
        Err(e) => {
            error!("{e}");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { args, output, json } => {
            let job = build_job(&args, &config)?;
            let engine = open_engine(&config, &job.account)?;
            let report = engine.validate(&job).await?;

            if json || output.is_some() {
                output::write_json(&report, output.as_deref()).await?;
            } else {
                output::print_validation(&report);
            }
            if report.is_clean() {
                Ok(ExitCode::Success)
            } else {
                Ok(ExitCode::ValidationFailed)
            }
        }
        Commands::Upload { args } => {
            let job = build_job(&args, &config)?;
            let engine = open_engine(&config, &job.account)?;

            let shutdown = ShutdownCoordinator::new(CancellationToken::new());
            shutdown.register_handlers();

            match engine.upload(&job, shutdown.cancel_token()).await {
                Ok(status) => {
                    output::print_status(&job, Some(&status));
                    Ok(ExitCode::Success)
                }
                Err(e) if e.is_cancelled() || shutdown.is_shutdown_requested() => {
                    warn!("{e}");
                    info!("Progress saved, run the same upload again to resume");
                    Err(CliError::ShutdownRequested)
                }
                Err(e) => {
                    if let Ok(status) = engine.status(&job).await {
                        output::print_status(&job, status.as_ref());
                    }
                    Err(e.into())
                }
            }
        }
        Commands::Queue { args } => {
            let job = build_job(&args, &config)?;
            let engine = open_engine(&config, &job.account)?;
            let queue = FsJobQueue::new(config.queue_dir()?);
            let queued = engine.queue_job(&job, &queue).await?;
            output::print_queued(&queued);
            Ok(ExitCode::Success)
        }
        Commands::Status { args, json } => {
            let job = build_job(&args, &config)?;
            let engine = open_engine(&config, &job.account)?;
            let status = engine.status(&job).await?;
            if json {
                output::write_json(&status, None).await?;
            } else {
                output::print_status(&job, status.as_ref());
            }
            Ok(ExitCode::Success)
        }
        Commands::Reset { args } => {
            let job = build_job(&args, &config)?;
            let engine = open_engine(&config, &job.account)?;
            let status = engine.status(&job).await?;
            output::print_status(&job, status.as_ref());

            if engine.reset(&job).await? {
                println!("Status blob is deleted. State about the upload is cleared.");
            } else {
                println!("Nothing to clear.");
            }
            Ok(ExitCode::Success)
        }
    }
}

fn open_engine(config: &CliConfig, account: &str) -> Result<IngestEngine, CliError> {
    let account = config.account(account)?;
    let blobs = Arc::new(FsBlobStore::new(account.blob_root.clone()));
    let tables = Arc::new(SledTableStore::open(&account.table_path).map_err(StoreError::from)?);
    Ok(IngestEngine::new(blobs, tables, config.ingest.clone())?)
}

/// Merges the `--job` file with the individual flags; flags win.
fn build_job(args: &JobArgs, config: &CliConfig) -> Result<JobSpec, CliError> {
    let base = match &args.job {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Some(serde_json::from_str::<JobSpec>(&text)?)
        }
        None => None,
    };
    let from_base = |f: fn(&JobSpec) -> String| base.as_ref().map(f);

    let account = args
        .account
        .clone()
        .or_else(|| from_base(|j| j.account.clone()))
        .or_else(|| config.default_account().map(str::to_string))
        .ok_or(CliError::MissingArgument("--account"))?;
    // Validation does not need a table; upload rejects the empty name itself.
    let table = args
        .table
        .clone()
        .or_else(|| from_base(|j| j.table.clone()))
        .unwrap_or_default();
    let partition_key = args
        .partition_key
        .clone()
        .or_else(|| from_base(|j| j.partition_key.clone()))
        .ok_or(CliError::MissingArgument("--partition-key"))?;
    let row_key = args
        .row_key
        .clone()
        .or_else(|| from_base(|j| j.row_key.clone()))
        .ok_or(CliError::MissingArgument("--row-key"))?;

    let container = args
        .container
        .clone()
        .or_else(|| base.as_ref().and_then(|j| j.container.clone()));

    let input = match (&args.input, &args.blob) {
        (Some(path), _) => InputLocation::File { path: path.clone() },
        (None, Some(name)) => {
            let container = container
                .clone()
                .ok_or(CliError::MissingArgument("--container"))?;
            InputLocation::Blob(BlobRef::new(container, name.clone()))
        }
        (None, None) => base
            .as_ref()
            .map(|j| j.input.clone())
            .ok_or(CliError::MissingArgument("--input or --blob"))?,
    };

    let container = match (&input, container) {
        (InputLocation::File { .. }, None) => Some(DEFAULT_CONTAINER.to_string()),
        (_, container) => container,
    };

    Ok(JobSpec {
        account,
        table,
        partition_key,
        row_key,
        input,
        container,
    })
}
