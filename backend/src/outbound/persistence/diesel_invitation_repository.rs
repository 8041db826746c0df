//! PostgreSQL-backed `InvitationRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{InvitationRepository, InvitationRepositoryError};
use crate::domain::{
    EmailAddress, Invitation, InvitationKind, InvitationStatus, InvitationToken,
    REDEEMABLE_STATUSES, UserId,
};

use super::diesel_helpers::{DieselFailure, classify_diesel_error};
use super::models::{InvitationRow, NewInvitationRow};
use super::pool::{DbPool, PoolError};
use super::schema::invitations;

#[derive(Clone)]
pub struct DieselInvitationRepository {
    pool: DbPool,
}

impl DieselInvitationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> InvitationRepositoryError {
    InvitationRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> InvitationRepositoryError {
    match classify_diesel_error(error, "invitations") {
        DieselFailure::Connection => InvitationRepositoryError::connection("database connection error"),
        DieselFailure::UniqueViolation { .. } => {
            InvitationRepositoryError::query("invitation token collision")
        }
        DieselFailure::Query(message) => InvitationRepositoryError::query(message),
    }
}

fn corrupted(field: &str) -> InvitationRepositoryError {
    InvitationRepositoryError::query(format!("corrupted invitation row: {field}"))
}

fn row_to_invitation(row: InvitationRow) -> Result<Invitation, InvitationRepositoryError> {
    Ok(Invitation {
        id: row.id,
        token: InvitationToken::parse(&row.token).map_err(|_| corrupted("token"))?,
        kind: row
            .kind
            .parse::<InvitationKind>()
            .map_err(|_| corrupted("kind"))?,
        email: EmailAddress::new(&row.email).map_err(|_| corrupted("email"))?,
        sender_id: UserId::from_uuid(row.sender_id),
        receiver_id: row.receiver_id.map(UserId::from_uuid),
        target_id: row.target_id,
        status: row
            .status
            .parse::<InvitationStatus>()
            .map_err(|_| corrupted("status"))?,
        created_at: row.created_at,
        sent_at: row.sent_at,
        accepted_at: row.accepted_at,
        expires_at: row.expires_at,
    })
}

fn redeemable_names() -> Vec<&'static str> {
    REDEEMABLE_STATUSES.iter().map(|s| s.as_str()).collect()
}

#[async_trait]
impl InvitationRepository for DieselInvitationRepository {
    async fn insert(&self, invitation: &Invitation) -> Result<(), InvitationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewInvitationRow {
            id: invitation.id,
            token: invitation.token.as_str(),
            kind: invitation.kind.as_str(),
            email: invitation.email.as_str(),
            sender_id: *invitation.sender_id.as_uuid(),
            receiver_id: invitation.receiver_id.map(|id| *id.as_uuid()),
            target_id: invitation.target_id,
            status: invitation.status.as_str(),
            created_at: invitation.created_at,
            sent_at: invitation.sent_at,
            accepted_at: invitation.accepted_at,
            expires_at: invitation.expires_at,
        };
        diesel::insert_into(invitations::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_by_token(
        &self,
        token: &InvitationToken,
        kind: InvitationKind,
    ) -> Result<Option<Invitation>, InvitationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        invitations::table
            .filter(invitations::token.eq(token.as_str()))
            .filter(invitations::kind.eq(kind.as_str()))
            .select(InvitationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_invitation)
            .transpose()
    }

    async fn mark_sent(
        &self,
        invitation_id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, InvitationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changed = diesel::update(
            invitations::table
                .filter(invitations::id.eq(invitation_id))
                .filter(invitations::status.eq(InvitationStatus::Pending.as_str())),
        )
        .set((
            invitations::status.eq(InvitationStatus::Sent.as_str()),
            invitations::sent_at.eq(Some(at)),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(changed == 1)
    }

    async fn mark_expired(&self, invitation_id: &Uuid) -> Result<bool, InvitationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changed = diesel::update(
            invitations::table
                .filter(invitations::id.eq(invitation_id))
                .filter(invitations::status.eq_any(redeemable_names())),
        )
        .set(invitations::status.eq(InvitationStatus::Expired.as_str()))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(changed == 1)
    }

    async fn claim(
        &self,
        invitation_id: &Uuid,
        receiver_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, InvitationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changed = diesel::update(
            invitations::table
                .filter(invitations::id.eq(invitation_id))
                .filter(invitations::status.eq_any(redeemable_names()))
                .filter(invitations::expires_at.ge(at)),
        )
        .set((
            invitations::status.eq(InvitationStatus::Accepted.as_str()),
            invitations::receiver_id.eq(Some(*receiver_id.as_uuid())),
            invitations::accepted_at.eq(Some(at)),
        ))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(changed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(kind: &str, status: &str) -> InvitationRow {
        let now = Utc::now();
        InvitationRow {
            id: Uuid::new_v4(),
            token: InvitationToken::generate().as_str().to_owned(),
            kind: kind.to_owned(),
            email: "invitee@example.org".to_owned(),
            sender_id: Uuid::new_v4(),
            receiver_id: None,
            target_id: Uuid::new_v4(),
            status: status.to_owned(),
            created_at: now,
            sent_at: None,
            accepted_at: None,
            expires_at: now,
        }
    }

    #[rstest]
    fn decodes_valid_rows() {
        let invitation = row_to_invitation(row("library", "sent")).expect("valid row");
        assert_eq!(invitation.kind, InvitationKind::Library);
        assert_eq!(invitation.status, InvitationStatus::Sent);
    }

    #[rstest]
    #[case("guild", "sent")]
    #[case("branch", "revoked")]
    fn rejects_corrupted_rows(#[case] kind: &str, #[case] status: &str) {
        assert!(matches!(
            row_to_invitation(row(kind, status)),
            Err(InvitationRepositoryError::Query { .. })
        ));
    }
}
