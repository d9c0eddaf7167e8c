//! Assembles a [`DocumentVault`] from command-line options.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docvault_core::blob::{BlobBackend, FsBlobBackend, HttpBlobBackend};
use docvault_core::events::TracingEventSink;
use docvault_core::keys::{KeyProtector, MasterKey, MasterKeyProtector, PlainKeyProtector};
use docvault_core::metadata::SqliteMetadataStore;
use docvault_core::{DocumentVault, VaultConfig};
use eyre::{eyre, WrapErr};
use tracing::{debug, warn};

const METADATA_FILE: &str = "metadata.sqlite";
const BLOB_DIR: &str = "blobs";

pub struct VaultOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub master_key: Option<String>,
    pub blob_url: Option<String>,
    pub blob_token: Option<String>,
}

fn resolve_data_dir(explicit: Option<&PathBuf>) -> eyre::Result<PathBuf> {
    explicit
        .cloned()
        .or_else(|| dirs::data_dir().map(|dir| dir.join("docvault")))
        .ok_or_else(|| eyre!("no data directory: pass --data-dir or set DOCVAULT_DATA_DIR"))
}

fn key_protector(master_key: Option<&str>) -> eyre::Result<Arc<dyn KeyProtector>> {
    match master_key {
        Some(encoded) => {
            let master = MasterKey::from_hex(encoded).wrap_err("invalid master key")?;
            Ok(Arc::new(MasterKeyProtector::new(master)))
        }
        None => {
            warn!("no master key configured; document keys are stored unwrapped");
            Ok(Arc::new(PlainKeyProtector))
        }
    }
}

fn blob_backend(options: &VaultOptions, data_dir: &Path) -> eyre::Result<Arc<dyn BlobBackend>> {
    if let Some(url) = &options.blob_url {
        let mut backend = HttpBlobBackend::new(url).wrap_err("invalid blob url")?;
        if let Some(token) = &options.blob_token {
            backend = backend.with_token(token.clone());
        }
        debug!(%url, "using remote blob backend");
        return Ok(Arc::new(backend));
    }
    let root = data_dir.join(BLOB_DIR);
    let backend = FsBlobBackend::new(&root)
        .wrap_err_with(|| format!("failed to open blob directory {}", root.display()))?;
    Ok(Arc::new(backend))
}

pub fn open_vault(options: &VaultOptions) -> eyre::Result<DocumentVault> {
    let data_dir = resolve_data_dir(options.data_dir.as_ref())?;
    fs::create_dir_all(&data_dir)
        .wrap_err_with(|| format!("failed to create data directory {}", data_dir.display()))?;

    let config = match &options.config {
        Some(path) => VaultConfig::from_json_file(path)?,
        None => VaultConfig::default(),
    };

    let db_path = data_dir.join(METADATA_FILE);
    let metadata = SqliteMetadataStore::open(&db_path)
        .wrap_err_with(|| format!("failed to open metadata store {}", db_path.display()))?;

    let vault = DocumentVault::new(
        blob_backend(options, &data_dir)?,
        Arc::new(metadata),
        Arc::new(TracingEventSink),
        key_protector(options.master_key.as_deref())?,
        config,
    )?;
    debug!(data_dir = %data_dir.display(), "vault opened");
    Ok(vault)
}
