//! Delete command.

use clap::Args as ClapArgs;
use docvault_core::{DocumentId, DocumentVault};
use serde::Serialize;
use tracing::instrument;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Document id
    pub id: DocumentId,

    /// Owning tenant
    #[arg(long)]
    pub tenant: String,

    /// User performing the deletion
    #[arg(long)]
    pub user: String,
}

#[derive(Serialize)]
struct Deleted<'a> {
    id: &'a DocumentId,
    tenant_id: &'a str,
    deleted: bool,
}

#[instrument(level = "debug", name = "cmd::delete", skip_all, fields(id = %args.id))]
pub fn execute(vault: &DocumentVault, args: &Args) -> eyre::Result<()> {
    vault.delete(&args.id, &args.tenant, &args.user)?;
    let summary = Deleted {
        id: &args.id,
        tenant_id: &args.tenant,
        deleted: true,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
