//! Collection ownership transfer.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{MembershipRepository, MembershipRepositoryError};
use crate::domain::{Error, OwnershipTransfer, UserId};

pub(crate) fn map_membership_error(error: MembershipRepositoryError) -> Error {
    match error {
        MembershipRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("membership storage unavailable: {message}"))
        }
        MembershipRepositoryError::Query { message } => {
            Error::internal(format!("membership storage error: {message}"))
        }
        MembershipRepositoryError::OwnershipChanged { collection_id } => {
            Error::conflict("collection ownership changed concurrently")
                .with_details(json!({ "collectionId": collection_id }))
        }
    }
}

/// Collection administration use-cases.
#[derive(Clone)]
pub struct CollectionService {
    memberships: Arc<dyn MembershipRepository>,
}

impl CollectionService {
    /// Wire the service.
    pub fn new(memberships: Arc<dyn MembershipRepository>) -> Self {
        Self { memberships }
    }

    /// Hand ownership of a collection to one of its active members.
    ///
    /// Only the current owner may transfer. The previous owner stays on as an
    /// active admin.
    pub async fn transfer_ownership(
        &self,
        collection_id: &Uuid,
        actor_id: &UserId,
        new_owner: &UserId,
    ) -> Result<OwnershipTransfer, Error> {
        let collection = self
            .memberships
            .find_collection(collection_id)
            .await
            .map_err(map_membership_error)?
            .ok_or_else(|| Error::not_found("collection not found"))?;
        if collection.owner_id != *actor_id {
            return Err(Error::forbidden("only the owner may transfer ownership"));
        }
        if new_owner == actor_id {
            return Err(Error::invalid_request("new owner already owns the collection"));
        }
        let member = self
            .memberships
            .find_member(collection_id, new_owner)
            .await
            .map_err(map_membership_error)?;
        if !member.is_some_and(|m| m.is_active) {
            return Err(Error::conflict("new owner must be an active member")
                .with_details(json!({ "code": "not_active_member" })));
        }

        let transfer = OwnershipTransfer {
            collection_id: *collection_id,
            previous_owner: *actor_id,
            new_owner: *new_owner,
        };
        self.memberships
            .transfer_ownership(&transfer)
            .await
            .map_err(map_membership_error)?;
        info!(%collection_id, previous = %actor_id, next = %new_owner, "collection ownership transferred");
        Ok(transfer)
    }
}
