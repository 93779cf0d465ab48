//! syncstore: disk-backed cache of incremental sync responses.
//!
//! One JSON snapshot is kept per user identity. Each incremental response is
//! shallow-merged into the snapshot and written back, so a client can resume
//! from the last known state instead of running a full initial sync.
//!
//! - **response**: the opaque [`SyncResponse`] document.
//! - **merge**: top-level key merge, incoming keys win.
//! - **queue**: serialized background file access.
//! - **store**: the file-backed and in-memory [`SyncResponseStore`] implementations.

pub mod config;
pub mod error;
pub mod identity;
pub mod memory;
pub mod merge;
pub mod queue;
pub mod response;
pub mod store;
pub mod traits;

pub use crate::config::StoreConfig;
pub use crate::error::{Result, StoreError};
pub use crate::identity::{Credentials, StoreIdentity};
pub use crate::memory::MemorySyncResponseStore;
pub use crate::merge::shallow_merge;
pub use crate::queue::{atomic_write, WriteTicket};
pub use crate::response::SyncResponse;
pub use crate::store::SyncResponseFileStore;
pub use crate::traits::SyncResponseStore;
