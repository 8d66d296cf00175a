pub mod memory_store;
pub mod service;
pub mod sqlite_store;
pub mod store;

use hikebot_core::{Result, StorageConfig};
use std::sync::Arc;
use tracing::info;

pub use memory_store::MemoryStore;
pub use service::{
    CreatedGroup, DirectChat, FriendRequestOutcome, InviteOutcome, LeaveOutcome, PendingRequest,
    SocialService, MESSAGE_HISTORY_LIMIT,
};
pub use sqlite_store::SqliteStore;
pub use store::{NewGroup, NewMessage, NewUser, SocialStore};

/// Build the store selected by `storage.backend`.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn SocialStore>> {
    match config.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteStore::open(&config.sqlite_path)?)),
        _ => {
            info!("Using in-memory social store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
