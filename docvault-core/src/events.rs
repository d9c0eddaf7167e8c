//! Audit event delivery.
//!
//! The vault reports every completed operation to an [`EventSink`]. Delivery is
//! best-effort: a failing sink is logged and counted, never surfaced to the
//! caller of the vault.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::info;

use crate::DocumentId;

/// Tracing target used for audit records.
pub const AUDIT_TARGET: &str = "docvault::audit";

/// Kind of operation recorded by a [`VaultEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum VaultAction {
    /// A document was stored.
    Upload,
    /// A document was read back.
    Download,
    /// A document was soft-deleted.
    Delete,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEvent {
    /// Operation performed.
    pub action: VaultAction,
    /// Document acted on.
    pub document_id: DocumentId,
    /// Acting user.
    pub user_id: String,
    /// Owning tenant.
    pub tenant_id: String,
    /// Plaintext size of the document.
    pub size_bytes: u64,
    /// Event time, unix milliseconds.
    pub occurred_at: u64,
}

/// Error reported by an [`EventSink`].
#[derive(Debug, Error)]
#[error("event delivery failed: {0}")]
pub struct EventSinkError(pub String);

/// Receiver of audit events.
pub trait EventSink: Send + Sync {
    /// Delivers `event`.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError`] if the event could not be delivered.
    fn emit(&self, event: &VaultEvent) -> Result<(), EventSinkError>;
}

/// Writes each event as a structured `tracing` record on [`AUDIT_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &VaultEvent) -> Result<(), EventSinkError> {
        info!(
            target: AUDIT_TARGET,
            action = %event.action,
            document_id = %event.document_id,
            user_id = %event.user_id,
            tenant_id = %event.tenant_id,
            size_bytes = event.size_bytes,
            occurred_at = event.occurred_at,
            "document activity"
        );
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &VaultEvent) -> Result<(), EventSinkError> {
        Ok(())
    }
}

/// Collects events in memory; can be switched to fail every delivery.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<VaultEvent>>,
    failing: bool,
}

impl MemoryEventSink {
    /// Creates a sink that records every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that rejects every event.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Events received so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<VaultEvent> {
        self.lock().map(|events| events.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<VaultEvent>>, EventSinkError> {
        self.events
            .lock()
            .map_err(|_| EventSinkError("mutex poisoned".to_string()))
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &VaultEvent) -> Result<(), EventSinkError> {
        if self.failing {
            return Err(EventSinkError("sink configured to fail".to_string()));
        }
        self.lock()?.push(event.clone());
        Ok(())
    }
}
