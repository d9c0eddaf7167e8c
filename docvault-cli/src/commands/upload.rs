//! Upload command: encrypt a local file into the vault.
//!
//! # Examples
//!
//! ```bash
//! docvault upload brief.pdf --tenant firm-1 --owner attorney-1 --mime application/pdf --case case-7
//! ```

use std::fs;
use std::path::PathBuf;

use clap::Args as ClapArgs;
use docvault_core::{DocumentVault, UploadMeta};
use eyre::{eyre, WrapErr};
use tracing::instrument;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// File to store
    pub file: PathBuf,

    /// Owning tenant
    #[arg(long)]
    pub tenant: String,

    /// Uploading user
    #[arg(long)]
    pub owner: String,

    /// Declared MIME type
    #[arg(long, default_value = "application/octet-stream")]
    pub mime: String,

    /// Stored file name (defaults to the file's own name)
    #[arg(long)]
    pub name: Option<String>,

    /// Case to associate the document with
    #[arg(long)]
    pub case: Option<String>,

    /// Client to associate the document with
    #[arg(long)]
    pub client: Option<String>,
}

fn original_name(args: &Args) -> eyre::Result<String> {
    if let Some(name) = &args.name {
        return Ok(name.clone());
    }
    args.file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| eyre!("cannot derive a name from {}; pass --name", args.file.display()))
}

#[instrument(level = "debug", name = "cmd::upload", skip_all, fields(tenant = %args.tenant))]
pub fn execute(vault: &DocumentVault, args: &Args) -> eyre::Result<()> {
    let plaintext =
        fs::read(&args.file).wrap_err_with(|| format!("failed to read {}", args.file.display()))?;

    let mut meta = UploadMeta::new(original_name(args)?, &args.mime, &args.tenant, &args.owner);
    meta.case_id.clone_from(&args.case);
    meta.client_id.clone_from(&args.client);

    let record = vault.upload(&plaintext, meta)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
