//! In-memory `MembershipRepository`.
//!
//! Ownership transfer stages its writes on a copy of the tables and swaps the
//! copy in only once every step has succeeded.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{MembershipRepository, MembershipRepositoryError};
use crate::domain::{
    Collection, CollectionMember, InvitationKind, MemberRole, MembershipTarget, OwnershipTransfer,
    UserId,
};

use super::MemoryStore;

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn find_collection(
        &self,
        collection_id: &Uuid,
    ) -> Result<Option<Collection>, MembershipRepositoryError> {
        Ok(self.lock().collections.get(collection_id).cloned())
    }

    async fn find_member(
        &self,
        collection_id: &Uuid,
        user_id: &UserId,
    ) -> Result<Option<CollectionMember>, MembershipRepositoryError> {
        Ok(self.lock().members.get(&(*collection_id, *user_id)).cloned())
    }

    async fn attach_member(
        &self,
        target: &MembershipTarget,
        user_id: &UserId,
    ) -> Result<(), MembershipRepositoryError> {
        let mut tables = self.lock();
        match target.kind {
            InvitationKind::Library => {
                tables
                    .members
                    .entry((target.target_id, *user_id))
                    .and_modify(|member| member.is_active = true)
                    .or_insert_with(|| CollectionMember {
                        user_id: *user_id,
                        collection_id: target.target_id,
                        role: MemberRole::Member,
                        is_active: true,
                    });
            }
            InvitationKind::Branch => {
                tables
                    .branch_members
                    .insert((target.target_id, *user_id), true);
            }
        }
        Ok(())
    }

    async fn transfer_ownership(
        &self,
        transfer: &OwnershipTransfer,
    ) -> Result<(), MembershipRepositoryError> {
        let mut tables = self.lock();
        let mut staged = tables.clone();

        let Some(collection) = staged
            .collections
            .get_mut(&transfer.collection_id)
            .filter(|c| c.owner_id == transfer.previous_owner)
        else {
            return Err(MembershipRepositoryError::ownership_changed(
                transfer.collection_id,
            ));
        };
        collection.owner_id = transfer.new_owner;

        if self.transfer_fault() {
            return Err(MembershipRepositoryError::query("injected fault"));
        }

        staged.members.insert(
            (transfer.collection_id, transfer.previous_owner),
            CollectionMember {
                user_id: transfer.previous_owner,
                collection_id: transfer.collection_id,
                role: MemberRole::Admin,
                is_active: true,
            },
        );
        *tables = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (MemoryStore, OwnershipTransfer) {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let successor = UserId::random();
        let collection_id = Uuid::new_v4();
        store.add_collection(Collection {
            id: collection_id,
            owner_id: owner,
            name: "Tools".to_owned(),
        });
        store.add_member(CollectionMember {
            user_id: successor,
            collection_id,
            role: MemberRole::Member,
            is_active: true,
        });
        let transfer = OwnershipTransfer {
            collection_id,
            previous_owner: owner,
            new_owner: successor,
        };
        (store, transfer)
    }

    #[tokio::test]
    async fn transfer_demotes_previous_owner_to_admin() {
        let (store, transfer) = seeded();
        store.transfer_ownership(&transfer).await.expect("transfer");

        let collection = store.collection(&transfer.collection_id).expect("collection");
        assert_eq!(collection.owner_id, transfer.new_owner);
        let previous = store
            .find_member(&transfer.collection_id, &transfer.previous_owner)
            .await
            .expect("lookup")
            .expect("previous owner kept");
        assert!(previous.is_active_admin());
    }

    #[tokio::test]
    async fn failed_transfer_leaves_no_partial_state() {
        let (store, transfer) = seeded();
        store.fail_transfer_after_owner_swap(true);
        let before = store.members_of(&transfer.collection_id);

        let err = store.transfer_ownership(&transfer).await.expect_err("fault");
        assert!(matches!(err, MembershipRepositoryError::Query { .. }));
        let collection = store.collection(&transfer.collection_id).expect("collection");
        assert_eq!(collection.owner_id, transfer.previous_owner);
        assert_eq!(store.members_of(&transfer.collection_id), before);
    }

    #[tokio::test]
    async fn stale_owner_is_reported() {
        let (store, mut transfer) = seeded();
        transfer.previous_owner = UserId::random();
        let err = store.transfer_ownership(&transfer).await.expect_err("stale");
        assert_eq!(
            err,
            MembershipRepositoryError::ownership_changed(transfer.collection_id)
        );
    }

    #[tokio::test]
    async fn attaching_twice_keeps_one_row() {
        let store = MemoryStore::new();
        let user = UserId::random();
        let target = MembershipTarget {
            kind: InvitationKind::Branch,
            target_id: Uuid::new_v4(),
        };
        store.attach_member(&target, &user).await.expect("first");
        store.attach_member(&target, &user).await.expect("second");
        assert!(store.is_branch_member(&target.target_id, &user));
        assert_eq!(store.branch_membership_rows(&user), 1);
    }
}
