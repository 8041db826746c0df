//! Persistence port for invitations.
//!
//! Status changes are conditional on the current status so concurrent
//! redemptions and lazy expiry cannot overwrite each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Invitation, InvitationKind, InvitationToken, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by invitation storage.
    pub enum InvitationRepositoryError {
        /// Storage could not be reached.
        Connection { message: String } => "invitation storage unavailable: {message}",
        /// A query failed.
        Query { message: String } => "invitation query failed: {message}",
    }
}

/// Port for invitation storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Persist a freshly issued invitation.
    async fn insert(&self, invitation: &Invitation) -> Result<(), InvitationRepositoryError>;

    /// Look up by token, restricted to `kind`.
    async fn find_by_token(
        &self,
        token: &InvitationToken,
        kind: InvitationKind,
    ) -> Result<Option<Invitation>, InvitationRepositoryError>;

    /// `PENDING` to `SENT`. Returns whether a row changed.
    async fn mark_sent(
        &self,
        invitation_id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, InvitationRepositoryError>;

    /// `PENDING`/`SENT` to `EXPIRED`. Returns whether a row changed.
    async fn mark_expired(&self, invitation_id: &Uuid) -> Result<bool, InvitationRepositoryError>;

    /// `PENDING`/`SENT` to `ACCEPTED`, recording the receiver.
    ///
    /// Returns whether this call claimed the invitation.
    async fn claim(
        &self,
        invitation_id: &Uuid,
        receiver_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, InvitationRepositoryError>;
}
