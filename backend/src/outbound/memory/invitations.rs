//! In-memory `InvitationRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::{InvitationRepository, InvitationRepositoryError};
use crate::domain::{Invitation, InvitationKind, InvitationStatus, InvitationToken, UserId};

use super::MemoryStore;

#[async_trait]
impl InvitationRepository for MemoryStore {
    async fn insert(&self, invitation: &Invitation) -> Result<(), InvitationRepositoryError> {
        let mut tables = self.lock();
        if tables
            .invitations
            .values()
            .any(|existing| existing.token == invitation.token)
        {
            return Err(InvitationRepositoryError::query("invitation token collision"));
        }
        tables.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn find_by_token(
        &self,
        token: &InvitationToken,
        kind: InvitationKind,
    ) -> Result<Option<Invitation>, InvitationRepositoryError> {
        Ok(self
            .lock()
            .invitations
            .values()
            .find(|i| i.token == *token && i.kind == kind)
            .cloned())
    }

    async fn mark_sent(
        &self,
        invitation_id: &Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, InvitationRepositoryError> {
        let mut tables = self.lock();
        match tables
            .invitations
            .get_mut(invitation_id)
            .filter(|i| i.status == InvitationStatus::Pending)
        {
            Some(invitation) => {
                invitation.status = InvitationStatus::Sent;
                invitation.sent_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_expired(&self, invitation_id: &Uuid) -> Result<bool, InvitationRepositoryError> {
        let mut tables = self.lock();
        match tables
            .invitations
            .get_mut(invitation_id)
            .filter(|i| i.status.is_redeemable())
        {
            Some(invitation) => {
                invitation.status = InvitationStatus::Expired;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim(
        &self,
        invitation_id: &Uuid,
        receiver_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, InvitationRepositoryError> {
        let mut tables = self.lock();
        match tables
            .invitations
            .get_mut(invitation_id)
            .filter(|i| i.status.is_redeemable() && !i.is_past_deadline(at))
        {
            Some(invitation) => {
                invitation.status = InvitationStatus::Accepted;
                invitation.receiver_id = Some(*receiver_id);
                invitation.accepted_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
