use crate::identity::StoreIdentity;
use crate::queue::WriteTicket;
use crate::response::SyncResponse;
use crate::traits::SyncResponseStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Non-persistent [`SyncResponseStore`] for ephemeral sessions and tests.
///
/// Writes apply immediately, so every returned ticket is already complete.
#[derive(Debug, Default)]
pub struct MemorySyncResponseStore {
    identity: RwLock<Option<StoreIdentity>>,
    snapshots: RwLock<HashMap<StoreIdentity, SyncResponse>>,
}

impl MemorySyncResponseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncResponseStore for MemorySyncResponseStore {
    fn open(&self, identity: StoreIdentity) {
        *self.identity.write() = Some(identity);
    }

    async fn read(&self) -> Option<SyncResponse> {
        let identity = self.identity.read().clone()?;
        self.snapshots.read().get(&identity).cloned()
    }

    fn update(&self, partial: Option<SyncResponse>) -> WriteTicket {
        let Some(identity) = self.identity.read().clone() else {
            return WriteTicket::completed();
        };
        let Some(partial) = partial.filter(|p| !p.is_empty()) else {
            return WriteTicket::completed();
        };

        let mut snapshots = self.snapshots.write();
        let merged = match snapshots.remove(&identity) {
            Some(current) => current.merged_with(partial),
            None => partial,
        };
        snapshots.insert(identity, merged);
        WriteTicket::completed()
    }

    fn delete_data(&self) -> WriteTicket {
        if let Some(identity) = self.identity.read().as_ref() {
            self.snapshots.write().remove(identity);
        }
        WriteTicket::completed()
    }
}
