//! Download command: decrypt and verify a document.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args as ClapArgs;
use docvault_core::{DocumentId, DocumentVault};
use eyre::WrapErr;
use tracing::{info, instrument};

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Document id
    pub id: DocumentId,

    /// Owning tenant
    #[arg(long)]
    pub tenant: String,

    /// User requesting the document
    #[arg(long)]
    pub user: String,

    /// Write to this path instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[instrument(level = "debug", name = "cmd::download", skip_all, fields(id = %args.id))]
pub fn execute(vault: &DocumentVault, args: &Args) -> eyre::Result<()> {
    let document = vault.download(&args.id, &args.tenant, &args.user)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &document.bytes)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(
                path = %path.display(),
                size = document.bytes.len(),
                name = %document.original_name,
                "document written"
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&document.bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
