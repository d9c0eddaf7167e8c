//! `docvault`: developer CLI for the encrypted document vault.
//!
//! Stores blobs under `--data-dir/blobs` (or at `--blob-url`) and metadata in
//! `--data-dir/metadata.sqlite`. Audit events go to the log on the
//! `docvault::audit` target.

mod commands;
mod context;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{delete, download, info, keygen, upload};

const DEFAULT_LOG_FILTER: &str = "docvault=info,docvault_core=info";

/// Encrypted, tenant-scoped document storage.
#[derive(Parser)]
#[command(name = "docvault")]
#[command(author, version, about)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Create a master key once and keep it somewhere safe
    export DOCVAULT_MASTER_KEY=$(docvault keygen)

    # Store a document
    docvault upload brief.pdf --tenant firm-1 --owner attorney-1 --mime application/pdf

    # Read it back
    docvault download <ID> --tenant firm-1 --user attorney-1 --output brief.pdf
")]
struct Cli {
    /// Directory holding blobs and the metadata database
    #[arg(long, env = "DOCVAULT_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// JSON file with vault policy overrides
    #[arg(long, env = "DOCVAULT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Hex-encoded 32-byte master key used to wrap document keys
    #[arg(long, env = "DOCVAULT_MASTER_KEY", hide_env_values = true, global = true)]
    master_key: Option<String>,

    /// Base URL of a remote blob service; blobs stay on disk when unset
    #[arg(long, env = "DOCVAULT_BLOB_URL", global = true)]
    blob_url: Option<String>,

    /// Bearer token sent to the remote blob service
    #[arg(long, env = "DOCVAULT_BLOB_TOKEN", hide_env_values = true, global = true)]
    blob_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt and store a file
    Upload(upload::Args),
    /// Decrypt and verify a stored document
    Download(download::Args),
    /// Soft-delete a document and remove its blob
    Delete(delete::Args),
    /// Show a document's metadata
    Info(info::Args),
    /// Print a new random master key
    Keygen,
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> eyre::Result<()> {
    let cli = Cli::parse();
    let options = context::VaultOptions {
        data_dir: cli.data_dir,
        config: cli.config,
        master_key: cli.master_key,
        blob_url: cli.blob_url,
        blob_token: cli.blob_token,
    };

    match cli.command {
        Commands::Upload(args) => upload::execute(&context::open_vault(&options)?, &args),
        Commands::Download(args) => download::execute(&context::open_vault(&options)?, &args),
        Commands::Delete(args) => delete::execute(&context::open_vault(&options)?, &args),
        Commands::Info(args) => info::execute(&context::open_vault(&options)?, &args),
        Commands::Keygen => {
            keygen::execute();
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
