//! Read-only lookups into the item catalogue and user profiles.
//!
//! Listings and profiles are owned by the surrounding CRUD application; the
//! lending core only needs an item's owner and a user's contact details.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{UserContact, UserId};

use super::define_port_error;

define_port_error! {
    /// Directory lookup failures.
    pub enum DirectoryError {
        /// The backing store is unreachable.
        Connection { message: String } => "directory connection failed: {message}",
        /// A lookup failed during execution.
        Query { message: String } => "directory query failed: {message}",
    }
}

/// Listing details needed to open a borrow request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub id: Uuid,
    pub owner_id: UserId,
    pub title: String,
}

/// Port resolving items by id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemDirectory: Send + Sync {
    /// Look up an item.
    async fn find_item(&self, item_id: &Uuid) -> Result<Option<ItemSummary>, DirectoryError>;
}

/// Port resolving user contact details.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user's display name, email, and phone.
    async fn find_contact(&self, user_id: &UserId) -> Result<Option<UserContact>, DirectoryError>;
}
