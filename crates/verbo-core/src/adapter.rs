//! Persistence adapter: one fallback policy over local and remote stores.
//!
//! Loads are infallible from the caller's point of view: remote failure
//! falls back to the local partition, malformed data degrades to "no data
//! found", and an empty collection is a valid result. Saves are best-effort.

use crate::state::{ConversationRecord, FolderRecord, StateStore};
use crate::types::Identity;
use log::{debug, warn};
use std::sync::Arc;

/// Storage facade used by the sync coordinator.
///
/// Remote storage only applies to authenticated identities; the guest
/// partition is always local. Folders are local-only: remote folder sync is
/// intentionally not implemented.
pub struct PersistenceAdapter {
    local: Arc<dyn StateStore>,
    remote: Option<Arc<dyn StateStore>>,
}

impl PersistenceAdapter {
    /// Create an adapter over a local store and an optional remote store.
    pub fn new(local: Arc<dyn StateStore>, remote: Option<Arc<dyn StateStore>>) -> Self {
        Self { local, remote }
    }

    fn remote_for(&self, identity: &Identity) -> Option<&Arc<dyn StateStore>> {
        if identity.is_authenticated() {
            self.remote.as_ref()
        } else {
            None
        }
    }

    /// Load conversations for an identity, remote-first with local fallback.
    pub async fn load_conversations(&self, identity: &Identity) -> Vec<ConversationRecord> {
        let partition = identity.partition_key();
        if let Some(remote) = self.remote_for(identity) {
            match remote.load_conversations(&partition).await {
                Ok(records) => {
                    debug!(
                        "loaded conversations from remote (partition={partition}, count={})",
                        records.len()
                    );
                    return records;
                }
                Err(err) => {
                    warn!(
                        "remote conversation load failed, falling back to local \
                         (partition={partition}): {err}"
                    );
                }
            }
        }
        match self.local.load_conversations(&partition).await {
            Ok(records) => records,
            Err(err) => {
                warn!("local conversation load degraded to empty (partition={partition}): {err}");
                Vec::new()
            }
        }
    }

    /// Persist conversations: always local, additionally remote for
    /// authenticated identities. Failures are logged, never raised.
    pub async fn save_conversations(&self, identity: &Identity, records: &[ConversationRecord]) {
        let partition = identity.partition_key();
        if let Err(err) = self.local.save_conversations(&partition, records).await {
            warn!("local conversation save failed (partition={partition}): {err}");
        }
        if let Some(remote) = self.remote_for(identity)
            && let Err(err) = remote.save_conversations(&partition, records).await
        {
            warn!("remote conversation save failed (partition={partition}): {err}");
        }
    }

    /// Load folders for an identity. Local-only.
    pub async fn load_folders(&self, identity: &Identity) -> Vec<FolderRecord> {
        let partition = identity.partition_key();
        match self.local.load_folders(&partition).await {
            Ok(records) => records,
            Err(err) => {
                warn!("local folder load degraded to empty (partition={partition}): {err}");
                Vec::new()
            }
        }
    }

    /// Persist folders. Local-only, best-effort.
    pub async fn save_folders(&self, identity: &Identity, records: &[FolderRecord]) {
        let partition = identity.partition_key();
        if let Err(err) = self.local.save_folders(&partition, records).await {
            warn!("local folder save failed (partition={partition}): {err}");
        }
    }
}
