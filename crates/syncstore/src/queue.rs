//! Serialized file access for one store instance.
//!
//! Every filesystem operation of a store goes through a single background
//! task, in submission order. Writes return a [`WriteTicket`] immediately;
//! reads queue up behind pending writes so they observe every write submitted
//! before them.

use crate::error::{Result, StoreError};
use crate::response::SyncResponse;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

enum FileJob {
    CreateDir {
        dir: PathBuf,
    },
    Read {
        path: PathBuf,
        reply: oneshot::Sender<Option<SyncResponse>>,
    },
    Merge {
        path: PathBuf,
        partial: SyncResponse,
        done: oneshot::Sender<()>,
    },
    Remove {
        path: PathBuf,
        done: oneshot::Sender<()>,
    },
    Barrier {
        done: oneshot::Sender<()>,
    },
}

/// Completion handle for a queued write.
///
/// Awaiting [`WriteTicket::wait`] returns once the write has been applied or
/// abandoned; dropping the ticket leaves the write running in the background.
#[derive(Debug)]
#[must_use = "drop the ticket explicitly for fire-and-forget writes"]
pub struct WriteTicket {
    rx: Option<oneshot::Receiver<()>>,
}

impl WriteTicket {
    /// A ticket for a write that was skipped or already applied.
    pub fn completed() -> Self {
        Self { rx: None }
    }

    fn pending(rx: oneshot::Receiver<()>) -> Self {
        Self { rx: Some(rx) }
    }

    pub async fn wait(self) {
        if let Some(rx) = self.rx {
            // A closed channel means the worker is gone; nothing left to wait for.
            let _ = rx.await;
        }
    }
}

/// Handle to the single worker task that owns a store's files.
#[derive(Clone, Debug)]
pub(crate) struct FileQueue {
    tx: mpsc::UnboundedSender<FileJob>,
}

impl std::fmt::Debug for FileJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileJob::CreateDir { dir } => write!(f, "CreateDir({:?})", dir),
            FileJob::Read { path, .. } => write!(f, "Read({:?})", path),
            FileJob::Merge { path, .. } => write!(f, "Merge({:?})", path),
            FileJob::Remove { path, .. } => write!(f, "Remove({:?})", path),
            FileJob::Barrier { .. } => write!(f, "Barrier"),
        }
    }
}

impl FileQueue {
    /// Spawn the worker on the current Tokio runtime; `None` outside of one.
    pub(crate) fn spawn(pretty: bool) -> Option<Self> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("[FileQueue] No Tokio runtime, file queue not started: {}", e);
                return None;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(async move {
            Self::process_loop(rx, pretty).await;
        });
        Some(Self { tx })
    }

    pub(crate) fn create_dir(&self, dir: PathBuf) {
        self.submit(FileJob::CreateDir { dir });
    }

    pub(crate) async fn read(&self, path: PathBuf) -> Option<SyncResponse> {
        let (reply, rx) = oneshot::channel();
        if !self.submit(FileJob::Read { path, reply }) {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub(crate) fn merge(&self, path: PathBuf, partial: SyncResponse) -> WriteTicket {
        let (done, rx) = oneshot::channel();
        if self.submit(FileJob::Merge { path, partial, done }) {
            WriteTicket::pending(rx)
        } else {
            WriteTicket::completed()
        }
    }

    pub(crate) fn remove(&self, path: PathBuf) -> WriteTicket {
        let (done, rx) = oneshot::channel();
        if self.submit(FileJob::Remove { path, done }) {
            WriteTicket::pending(rx)
        } else {
            WriteTicket::completed()
        }
    }

    /// Wait until every job submitted so far has run.
    pub(crate) async fn flush(&self) {
        let (done, rx) = oneshot::channel();
        if self.submit(FileJob::Barrier { done }) {
            let _ = rx.await;
        }
    }

    fn submit(&self, job: FileJob) -> bool {
        match self.tx.send(job) {
            Ok(()) => true,
            Err(mpsc::error::SendError(job)) => {
                error!("[FileQueue] {}: dropping {:?}", StoreError::QueueClosed, job);
                false
            }
        }
    }

    async fn process_loop(mut rx: mpsc::UnboundedReceiver<FileJob>, pretty: bool) {
        while let Some(job) = rx.recv().await {
            match job {
                FileJob::CreateDir { dir } => {
                    if let Err(e) = fs::create_dir_all(&dir).await {
                        warn!("[FileQueue] Failed to create {:?}: {}", dir, e);
                    }
                }
                FileJob::Read { path, reply } => {
                    let _ = reply.send(load_or_none(&path).await);
                }
                FileJob::Merge {
                    path,
                    partial,
                    done,
                } => {
                    if let Err(e) = merge_and_write(&path, partial, pretty).await {
                        warn!("[FileQueue] Abandoned write to {:?}: {}", path, e);
                    }
                    let _ = done.send(());
                }
                FileJob::Remove { path, done } => {
                    match fs::remove_file(&path).await.map_err(StoreError::Io) {
                        Ok(()) => debug!("[FileQueue] Removed {:?}", path),
                        Err(e) if e.is_not_found() => {}
                        Err(e) => warn!("[FileQueue] Failed to remove {:?}: {}", path, e),
                    }
                    let _ = done.send(());
                }
                FileJob::Barrier { done } => {
                    let _ = done.send(());
                }
            }
        }
        debug!("[FileQueue] All store handles dropped, worker exiting");
    }
}

/// Read and parse the snapshot at `path`; `Ok(None)` when it does not exist.
pub(crate) async fn read_snapshot(path: &Path) -> Result<Option<SyncResponse>> {
    let content = match fs::read_to_string(path).await.map_err(StoreError::Io) {
        Ok(content) => content,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };
    SyncResponse::from_json_str(&content).map(Some)
}

/// Like [`read_snapshot`], but unreadable or corrupt content counts as absent.
async fn load_or_none(path: &Path) -> Option<SyncResponse> {
    match read_snapshot(path).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("[FileQueue] Ignoring unreadable snapshot {:?}: {}", path, e);
            None
        }
    }
}

async fn merge_and_write(path: &Path, partial: SyncResponse, pretty: bool) -> Result<()> {
    // No snapshot yet: the partial is written as-is rather than merged into `{}`.
    let merged = match load_or_none(path).await {
        Some(current) => current.merged_with(partial),
        None => partial,
    };
    let json = merged.to_json_string(pretty)?;
    atomic_write(path, json.as_bytes()).await
}

/// Write `data` to a temporary sibling of `dest`, then rename it into place.
///
/// The parent directory must already exist.
pub async fn atomic_write(dest: &Path, data: &[u8]) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| StoreError::Config(format!("{:?} has no parent directory", dest)))?;

    let temp_path = parent.join(format!(".tmp_{}", uuid::Uuid::new_v4()));
    let result = match fs::write(&temp_path, data).await {
        Ok(()) => fs::rename(&temp_path, dest).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        // a short write can leave the temp file behind as well as a failed rename
        let _ = fs::remove_file(&temp_path).await;
        return Err(StoreError::Io(e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn response(value: serde_json::Value) -> SyncResponse {
        SyncResponse::try_from(value).unwrap()
    }

    #[tokio::test]
    async fn test_atomic_write_overwrites() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("snapshot");

        atomic_write(&dest, b"first").await.unwrap();
        atomic_write(&dest, b"second").await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"second");

        // no temp files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_atomic_write_needs_parent() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing").join("snapshot");
        assert!(atomic_write(&dest, b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file
        let dest = dir.path().join("snapshot");
        std::fs::create_dir_all(dest.join("occupied")).unwrap();

        assert!(atomic_write(&dest, b"data").await.is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp_"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {:?}", leftovers);
    }

    #[test]
    fn test_spawn_outside_runtime_is_none() {
        assert!(FileQueue::spawn(false).is_none());
    }

    #[tokio::test]
    async fn test_jobs_run_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("user").join("syncResponse");
        let queue = FileQueue::spawn(false).unwrap();

        queue.create_dir(path.parent().unwrap().to_path_buf());
        for i in 0..20 {
            drop(queue.merge(path.clone(), response(json!({ "n": i }))));
        }
        let _ = queue.remove(path.clone());
        drop(queue.merge(path.clone(), response(json!({"after": "remove"}))));

        assert_eq!(queue.read(path).await, Some(response(json!({"after": "remove"}))));
    }

    #[tokio::test]
    async fn test_flush_waits_for_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("syncResponse");
        let queue = FileQueue::spawn(true).unwrap();

        drop(queue.merge(path.clone(), response(json!({"a": 1}))));
        queue.flush().await;

        let on_disk = read_snapshot(&path).await.unwrap();
        assert_eq!(on_disk, Some(response(json!({"a": 1}))));
    }

    #[tokio::test]
    async fn test_read_snapshot_missing_is_none() {
        let dir = tempdir().unwrap();
        assert!(read_snapshot(&dir.path().join("nothing")).await.unwrap().is_none());
    }
}
