//! Persistence port for collections, branch membership, and ownership.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Collection, CollectionMember, MembershipTarget, OwnershipTransfer, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by membership storage.
    pub enum MembershipRepositoryError {
        /// Storage could not be reached.
        Connection { message: String } => "membership storage unavailable: {message}",
        /// A query failed; any open transaction was rolled back.
        Query { message: String } => "membership query failed: {message}",
        /// The collection's owner changed before the transfer committed.
        OwnershipChanged { collection_id: Uuid } =>
            "ownership of collection {collection_id} changed concurrently",
    }
}

/// Port for membership storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Look up a collection.
    async fn find_collection(
        &self,
        collection_id: &Uuid,
    ) -> Result<Option<Collection>, MembershipRepositoryError>;

    /// Look up a member of a collection.
    async fn find_member(
        &self,
        collection_id: &Uuid,
        user_id: &UserId,
    ) -> Result<Option<CollectionMember>, MembershipRepositoryError>;

    /// Create or reactivate a membership. Never creates duplicates.
    async fn attach_member(
        &self,
        target: &MembershipTarget,
        user_id: &UserId,
    ) -> Result<(), MembershipRepositoryError>;

    /// Reassign the owner and keep the previous owner as an active admin.
    ///
    /// Both writes commit together or not at all. The owner reassignment is
    /// conditional on `previous_owner` still owning the collection.
    async fn transfer_ownership(
        &self,
        transfer: &OwnershipTransfer,
    ) -> Result<(), MembershipRepositoryError>;
}
