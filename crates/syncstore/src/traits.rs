use crate::identity::StoreIdentity;
use crate::queue::WriteTicket;
use crate::response::SyncResponse;
use async_trait::async_trait;

/// Persistent cache of the latest merged sync response for one identity.
///
/// Implementations never fail towards the caller: missing, corrupt or
/// unwritable state degrades to "no data", which callers treat as a signal to
/// run a full initial sync.
#[async_trait]
pub trait SyncResponseStore: Send + Sync {
    /// Bind the store to `identity`. Rebinding switches to another snapshot.
    fn open(&self, identity: StoreIdentity);

    /// The current snapshot, or `None` when unbound, missing or corrupt.
    async fn read(&self) -> Option<SyncResponse>;

    /// Shallow-merge `partial` into the snapshot. `None` or an empty object is a no-op.
    fn update(&self, partial: Option<SyncResponse>) -> WriteTicket;

    /// Remove the snapshot.
    fn delete_data(&self) -> WriteTicket;
}
