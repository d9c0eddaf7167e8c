//! Info command: print a document's metadata as JSON. Never touches the blob.

use clap::Args as ClapArgs;
use docvault_core::{DocumentId, DocumentVault};
use tracing::instrument;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Document id
    pub id: DocumentId,

    /// Owning tenant
    #[arg(long)]
    pub tenant: String,
}

#[instrument(level = "debug", name = "cmd::info", skip_all, fields(id = %args.id))]
pub fn execute(vault: &DocumentVault, args: &Args) -> eyre::Result<()> {
    let record = vault.get_metadata(&args.id, &args.tenant)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
