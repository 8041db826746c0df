//! PostgreSQL-backed `MembershipRepository`.
//!
//! Ownership transfer runs in one transaction: the conditional owner swap and
//! the previous owner's admin upsert commit together or roll back together.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{MembershipRepository, MembershipRepositoryError};
use crate::domain::{
    Collection, CollectionMember, InvitationKind, MemberRole, MembershipTarget, OwnershipTransfer,
    UserId,
};

use super::diesel_helpers::{DieselFailure, classify_diesel_error};
use super::models::{CollectionMemberRow, CollectionRow, NewCollectionMemberRow};
use super::pool::{DbPool, PoolError};
use super::schema::{branch_members, collection_members, collections};

#[derive(Clone)]
pub struct DieselMembershipRepository {
    pool: DbPool,
}

impl DieselMembershipRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside the transfer transaction.
#[derive(Debug)]
enum TransferTxError {
    Diesel(diesel::result::Error),
    OwnershipChanged,
}

impl From<diesel::result::Error> for TransferTxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn map_pool_error(error: PoolError) -> MembershipRepositoryError {
    MembershipRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> MembershipRepositoryError {
    match classify_diesel_error(error, "memberships") {
        DieselFailure::Connection => {
            MembershipRepositoryError::connection("database connection error")
        }
        DieselFailure::UniqueViolation { .. } => {
            MembershipRepositoryError::query("membership already exists")
        }
        DieselFailure::Query(message) => MembershipRepositoryError::query(message),
    }
}

fn row_to_member(row: CollectionMemberRow) -> Result<CollectionMember, MembershipRepositoryError> {
    let role = row
        .role
        .parse::<MemberRole>()
        .map_err(|err| MembershipRepositoryError::query(format!("corrupted row: {err}")))?;
    Ok(CollectionMember {
        user_id: UserId::from_uuid(row.user_id),
        collection_id: row.collection_id,
        role,
        is_active: row.is_active,
    })
}

#[async_trait]
impl MembershipRepository for DieselMembershipRepository {
    async fn find_collection(
        &self,
        collection_id: &Uuid,
    ) -> Result<Option<Collection>, MembershipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = collections::table
            .find(collection_id)
            .select(CollectionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(|row| Collection {
            id: row.id,
            owner_id: UserId::from_uuid(row.owner_id),
            name: row.name,
        }))
    }

    async fn find_member(
        &self,
        collection_id: &Uuid,
        user_id: &UserId,
    ) -> Result<Option<CollectionMember>, MembershipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        collection_members::table
            .find((user_id.as_uuid(), collection_id))
            .select(CollectionMemberRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_member)
            .transpose()
    }

    async fn attach_member(
        &self,
        target: &MembershipTarget,
        user_id: &UserId,
    ) -> Result<(), MembershipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let user = *user_id.as_uuid();
        let written = match target.kind {
            InvitationKind::Library => {
                diesel::insert_into(collection_members::table)
                    .values(&NewCollectionMemberRow {
                        user_id: user,
                        collection_id: target.target_id,
                        role: MemberRole::Member.as_str(),
                        is_active: true,
                    })
                    .on_conflict((collection_members::user_id, collection_members::collection_id))
                    .do_update()
                    .set(collection_members::is_active.eq(true))
                    .execute(&mut conn)
                    .await
            }
            InvitationKind::Branch => {
                diesel::insert_into(branch_members::table)
                    .values((
                        branch_members::user_id.eq(user),
                        branch_members::branch_id.eq(target.target_id),
                        branch_members::is_active.eq(true),
                    ))
                    .on_conflict((branch_members::user_id, branch_members::branch_id))
                    .do_update()
                    .set(branch_members::is_active.eq(true))
                    .execute(&mut conn)
                    .await
            }
        };
        written.map(|_| ()).map_err(map_diesel_error)
    }

    async fn transfer_ownership(
        &self,
        transfer: &OwnershipTransfer,
    ) -> Result<(), MembershipRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let collection_id = transfer.collection_id;
        let previous = *transfer.previous_owner.as_uuid();
        let next = *transfer.new_owner.as_uuid();

        let result: Result<(), TransferTxError> = conn
            .transaction(|conn| {
                async move {
                    let swapped = diesel::update(
                        collections::table
                            .filter(collections::id.eq(collection_id))
                            .filter(collections::owner_id.eq(previous)),
                    )
                    .set(collections::owner_id.eq(next))
                    .execute(conn)
                    .await?;
                    if swapped != 1 {
                        return Err(TransferTxError::OwnershipChanged);
                    }

                    diesel::insert_into(collection_members::table)
                        .values(&NewCollectionMemberRow {
                            user_id: previous,
                            collection_id,
                            role: MemberRole::Admin.as_str(),
                            is_active: true,
                        })
                        .on_conflict((collection_members::user_id, collection_members::collection_id))
                        .do_update()
                        .set((
                            collection_members::role.eq(excluded(collection_members::role)),
                            collection_members::is_active.eq(true),
                        ))
                        .execute(conn)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await;

        match result {
            Ok(()) => {
                debug!(%collection_id, "ownership transfer committed");
                Ok(())
            }
            Err(TransferTxError::OwnershipChanged) => {
                Err(MembershipRepositoryError::ownership_changed(collection_id))
            }
            Err(TransferTxError::Diesel(error)) => Err(map_diesel_error(error)),
        }
    }
}
