use crate::config::StoreConfig;
use crate::identity::StoreIdentity;
use crate::queue::{FileQueue, WriteTicket};
use crate::response::SyncResponse;
use crate::traits::SyncResponseStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
struct Binding {
    identity: StoreIdentity,
    path: PathBuf,
}

/// File-backed [`SyncResponseStore`].
///
/// The snapshot lives at `<root>/SyncResponse/<identity>/syncResponse`. All
/// file access is funnelled through one background task per store, so writes
/// land in submission order and a read sees every write queued before it.
///
/// Rebinding with [`open`](SyncResponseStore::open) while writes are queued is
/// allowed: those writes still target the previous identity's file.
#[derive(Debug)]
pub struct SyncResponseFileStore {
    config: StoreConfig,
    binding: RwLock<Option<Binding>>,
    /// `None` when created outside a Tokio runtime; such a store never binds.
    queue: Option<FileQueue>,
}

impl SyncResponseFileStore {
    /// Create an unbound store.
    ///
    /// Invalid folder or file names fall back to the defaults. Outside a Tokio
    /// runtime the store stays inert: `open` is ignored and reads return `None`.
    pub fn new(mut config: StoreConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!("{}, falling back to default snapshot names", e);
            let defaults = StoreConfig::default();
            config.folder_name = defaults.folder_name;
            config.file_name = defaults.file_name;
        }

        let queue = FileQueue::spawn(config.pretty);
        Self {
            config,
            binding: RwLock::new(None),
            queue,
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self::new(StoreConfig::with_root(root))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn identity(&self) -> Option<StoreIdentity> {
        self.binding.read().as_ref().map(|b| b.identity.clone())
    }

    pub fn is_open(&self) -> bool {
        self.binding.read().is_some()
    }

    /// Where the current identity's snapshot is kept, if bound.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.binding.read().as_ref().map(|b| b.path.clone())
    }

    /// Wait for every queued file operation to finish.
    pub async fn flush(&self) {
        if let Some(queue) = &self.queue {
            queue.flush().await;
        }
    }
}

#[async_trait]
impl SyncResponseStore for SyncResponseFileStore {
    fn open(&self, identity: StoreIdentity) {
        let Some(queue) = &self.queue else {
            warn!("Sync response store has no file queue, not opening for {}", identity);
            return;
        };

        let path = self.config.snapshot_path(&identity);
        info!("Opening sync response store for {} at {:?}", identity, path);

        if let Some(dir) = path.parent() {
            queue.create_dir(dir.to_path_buf());
        }
        *self.binding.write() = Some(Binding { identity, path });
    }

    async fn read(&self) -> Option<SyncResponse> {
        let queue = self.queue.as_ref()?;
        let path = self.snapshot_path()?;
        queue.read(path).await
    }

    fn update(&self, partial: Option<SyncResponse>) -> WriteTicket {
        let (Some(queue), Some(path)) = (&self.queue, self.snapshot_path()) else {
            debug!("Sync response store is not open, ignoring update");
            return WriteTicket::completed();
        };

        match partial {
            Some(partial) if !partial.is_empty() => queue.merge(path, partial),
            _ => WriteTicket::completed(),
        }
    }

    fn delete_data(&self) -> WriteTicket {
        match (&self.queue, self.snapshot_path()) {
            (Some(queue), Some(path)) => queue.remove(path),
            _ => WriteTicket::completed(),
        }
    }
}
