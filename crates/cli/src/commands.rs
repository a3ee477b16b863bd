use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Read the whole input and report key problems without uploading anything
    Validate {
        #[command(flatten)]
        args: JobArgs,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<PathBuf>,

        #[arg(long, help = "Print the report as JSON instead of a summary")]
        json: bool,
    },
    /// Begin or resume an upload from this machine
    Upload {
        #[command(flatten)]
        args: JobArgs,
    },
    /// Copy the input to the blob store and queue the job for a worker
    Queue {
        #[command(flatten)]
        args: JobArgs,
    },
    /// Print the progress of an upload
    Status {
        #[command(flatten)]
        args: JobArgs,

        #[arg(long, help = "If set, prints the progress as JSON instead of a table")]
        json: bool,
    },
    /// Delete the upload's progress so the next upload starts over
    Reset {
        #[command(flatten)]
        args: JobArgs,
    },
}

/// Job description: a JSON spec file, individual flags, or both (flags win).
#[derive(Args, Debug, Clone, Default)]
pub struct JobArgs {
    #[arg(long, help = "JSON job spec file")]
    pub job: Option<PathBuf>,

    #[arg(long, help = "Account name from the config file")]
    pub account: Option<String>,

    #[arg(long, help = "Target table name")]
    pub table: Option<String>,

    #[arg(long, help = "Column holding the partition key")]
    pub partition_key: Option<String>,

    #[arg(long, help = "Column holding the row key")]
    pub row_key: Option<String>,

    #[arg(long, conflicts_with = "blob", help = "Local input file")]
    pub input: Option<PathBuf>,

    #[arg(long, help = "Input blob name inside --container")]
    pub blob: Option<String>,

    #[arg(long, help = "Container for the input blob and the progress blob")]
    pub container: Option<String>,
}
