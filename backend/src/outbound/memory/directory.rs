//! In-memory item and user directories.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{DirectoryError, ItemDirectory, ItemSummary, UserDirectory};
use crate::domain::{UserContact, UserId};

use super::MemoryStore;

#[async_trait]
impl ItemDirectory for MemoryStore {
    async fn find_item(&self, item_id: &Uuid) -> Result<Option<ItemSummary>, DirectoryError> {
        Ok(self.lock().items.get(item_id).cloned())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_contact(&self, user_id: &UserId) -> Result<Option<UserContact>, DirectoryError> {
        Ok(self.lock().users.get(user_id).cloned())
    }
}
