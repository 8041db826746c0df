//! Invitation issue and redemption.
//!
//! Redemption is fail-closed on the grant: the invitation is claimed with a
//! conditional write before membership is attached, so two users racing on
//! one token cannot both join. A receiver redeeming again re-attaches
//! idempotently, which also heals a claim whose membership write failed.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::membership_service::map_membership_error;
use crate::domain::notification::{
    Notification, NotificationChannel, NotificationTemplate, NotificationWarning,
    dispatch_best_effort,
};
use crate::domain::ports::{
    InvitationRepository, InvitationRepositoryError, MembershipRepository, Notifier,
};
use crate::domain::{
    EmailAddress, Error, Invitation, InvitationKind, InvitationStatus, InvitationToken,
    MembershipTarget, PublicLinks, UserId,
};

/// Freshly issued invitation plus delivery warnings.
#[derive(Debug, Clone)]
pub struct InvitationOutcome {
    pub invitation: Invitation,
    pub warnings: Vec<NotificationWarning>,
}

/// Successful redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redemption {
    /// This call granted membership.
    Accepted(MembershipTarget),
    /// The same user had already redeemed the invitation.
    AlreadyAccepted(MembershipTarget),
}

impl Redemption {
    /// Branch or library joined.
    #[must_use]
    pub const fn target(&self) -> MembershipTarget {
        match self {
            Self::Accepted(target) | Self::AlreadyAccepted(target) => *target,
        }
    }

    /// Client path to land on after redemption.
    #[must_use]
    pub fn landing_path(&self) -> String {
        let target = self.target();
        target.kind.landing_path(&target.target_id)
    }
}

/// Collaborators for [`InvitationService`].
#[derive(Clone)]
pub struct InvitationServicePorts {
    pub invitations: Arc<dyn InvitationRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Invitation manager.
#[derive(Clone)]
pub struct InvitationService {
    invitations: Arc<dyn InvitationRepository>,
    memberships: Arc<dyn MembershipRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    links: PublicLinks,
    ttl: Duration,
}

fn map_invitation_error(error: InvitationRepositoryError) -> Error {
    match error {
        InvitationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("invitation storage unavailable: {message}"))
        }
        InvitationRepositoryError::Query { message } => {
            Error::internal(format!("invitation storage error: {message}"))
        }
    }
}

fn expired(invitation: &Invitation) -> Error {
    Error::expired("invitation has expired")
        .with_details(json!({ "expiresAt": invitation.expires_at.to_rfc3339() }))
}

fn invalid_invitation() -> Error {
    Error::invalid_token("invitation is not valid")
}

impl InvitationService {
    /// Wire the service with an invitation lifetime of `ttl`.
    pub fn new(ports: InvitationServicePorts, links: PublicLinks, ttl: Duration) -> Self {
        let InvitationServicePorts {
            invitations,
            memberships,
            notifier,
            clock,
        } = ports;
        Self {
            invitations,
            memberships,
            notifier,
            clock,
            links,
            ttl,
        }
    }

    /// Issue an invitation and email its link.
    ///
    /// Library invitations may only be sent by the owner or an active admin.
    /// The invitation is marked `SENT` once delivery succeeds; a failed
    /// delivery leaves it `PENDING` and still redeemable.
    pub async fn create_invitation(
        &self,
        kind: InvitationKind,
        email: &str,
        sender_id: UserId,
        target_id: Uuid,
    ) -> Result<InvitationOutcome, Error> {
        let email = EmailAddress::new(email).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "email" }))
        })?;
        if kind == InvitationKind::Library {
            self.require_library_admin(&target_id, &sender_id).await?;
        }

        let now = self.clock.utc();
        let mut invitation = Invitation::issue(kind, email, sender_id, target_id, now, self.ttl);
        self.invitations
            .insert(&invitation)
            .await
            .map_err(map_invitation_error)?;
        info!(invitation_id = %invitation.id, %kind, %target_id, "invitation issued");

        let notification = Notification::new(
            NotificationChannel::Email,
            invitation.email.as_str(),
            NotificationTemplate::InvitationIssued,
        )
        .param("invite_url", self.links.invitation(kind, &invitation.token))
        .param("kind", kind.as_str())
        .param("expires_at", invitation.expires_at.to_rfc3339());
        let warning = dispatch_best_effort(self.notifier.as_ref(), notification).await;

        if warning.is_none() {
            match self.invitations.mark_sent(&invitation.id, now).await {
                Ok(true) => {
                    invitation.status = InvitationStatus::Sent;
                    invitation.sent_at = Some(now);
                }
                Ok(false) => {}
                Err(error) => warn!(%error, invitation_id = %invitation.id, "failed to mark invitation sent"),
            }
        }

        Ok(InvitationOutcome {
            invitation,
            warnings: warning.into_iter().collect(),
        })
    }

    /// Resolve the target of a redeemable invitation without redeeming it.
    ///
    /// Applies lazy expiry, so a stale invitation reports `expired` here too.
    pub async fn preview(
        &self,
        raw_token: &str,
        kind: InvitationKind,
    ) -> Result<MembershipTarget, Error> {
        let invitation = self.load(raw_token, kind).await?;
        match invitation.status {
            InvitationStatus::Expired => Err(expired(&invitation)),
            InvitationStatus::Accepted => Ok(target_of(&invitation)),
            InvitationStatus::Pending | InvitationStatus::Sent => {
                if invitation.is_past_deadline(self.clock.utc()) {
                    self.expire(&invitation).await;
                    return Err(expired(&invitation));
                }
                Ok(target_of(&invitation))
            }
        }
    }

    /// Redeem an invitation for `invitee`.
    ///
    /// `target_hint`, when present, must match the invitation's target.
    ///
    /// The invitation is claimed as `ACCEPTED` before membership is attached.
    /// If the attach fails the invitation stays `ACCEPTED` without a
    /// membership row until the same invitee redeems it again, which
    /// re-attaches. Nobody else can redeem it in the meantime.
    pub async fn redeem(
        &self,
        raw_token: &str,
        kind: InvitationKind,
        invitee: &UserId,
        target_hint: Option<Uuid>,
    ) -> Result<Redemption, Error> {
        let invitation = self.load(raw_token, kind).await?;
        if target_hint.is_some_and(|hint| hint != invitation.target_id) {
            warn!(invitation_id = %invitation.id, "invitation target hint mismatch");
            return Err(invalid_invitation());
        }
        if !invitation.status.is_redeemable() {
            return self.settled(&invitation, invitee).await;
        }

        let now = self.clock.utc();
        if invitation.is_past_deadline(now) {
            self.expire(&invitation).await;
            return Err(expired(&invitation));
        }

        let claimed = self
            .invitations
            .claim(&invitation.id, invitee, now)
            .await
            .map_err(map_invitation_error)?;
        if !claimed {
            let latest = self.load(raw_token, kind).await?;
            return self.settled(&latest, invitee).await;
        }

        let target = target_of(&invitation);
        self.memberships
            .attach_member(&target, invitee)
            .await
            .map_err(map_membership_error)?;
        info!(invitation_id = %invitation.id, %invitee, "invitation accepted");
        Ok(Redemption::Accepted(target))
    }

    async fn load(&self, raw_token: &str, kind: InvitationKind) -> Result<Invitation, Error> {
        let token = InvitationToken::parse(raw_token).map_err(|_| invalid_invitation())?;
        self.invitations
            .find_by_token(&token, kind)
            .await
            .map_err(map_invitation_error)?
            .ok_or_else(invalid_invitation)
    }

    /// Outcome for an invitation that is no longer pending or sent.
    async fn settled(&self, invitation: &Invitation, invitee: &UserId) -> Result<Redemption, Error> {
        match invitation.status {
            InvitationStatus::Accepted if invitation.receiver_id.as_ref() == Some(invitee) => {
                let target = target_of(invitation);
                self.memberships
                    .attach_member(&target, invitee)
                    .await
                    .map_err(map_membership_error)?;
                Ok(Redemption::AlreadyAccepted(target))
            }
            InvitationStatus::Expired => Err(expired(invitation)),
            _ => {
                info!(invitation_id = %invitation.id, "invitation reuse rejected");
                Err(invalid_invitation())
            }
        }
    }

    async fn expire(&self, invitation: &Invitation) {
        match self.invitations.mark_expired(&invitation.id).await {
            Ok(_) => info!(invitation_id = %invitation.id, "invitation expired on read"),
            Err(error) => warn!(%error, invitation_id = %invitation.id, "failed to persist invitation expiry"),
        }
    }

    async fn require_library_admin(&self, collection_id: &Uuid, sender: &UserId) -> Result<(), Error> {
        let collection = self
            .memberships
            .find_collection(collection_id)
            .await
            .map_err(map_membership_error)?
            .ok_or_else(|| Error::not_found("library not found"))?;
        if collection.owner_id == *sender {
            return Ok(());
        }
        let member = self
            .memberships
            .find_member(collection_id, sender)
            .await
            .map_err(map_membership_error)?;
        if member.is_some_and(|m| m.is_active_admin()) {
            Ok(())
        } else {
            Err(Error::forbidden("only library admins may send invitations"))
        }
    }
}

fn target_of(invitation: &Invitation) -> MembershipTarget {
    MembershipTarget {
        kind: invitation.kind,
        target_id: invitation.target_id,
    }
}

#[cfg(test)]
#[path = "invitation_service_tests.rs"]
mod tests;
