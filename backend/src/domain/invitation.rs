//! Time-boxed membership invitations.
//!
//! Status only moves forward: `PENDING`/`SENT` to `ACCEPTED` or `EXPIRED`.
//! Expiry is lazy; a stale invitation is marked `EXPIRED` the next time it is
//! read for redemption.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EmailAddress, InvitationToken, UserId};

/// Default invitation lifetime in days.
pub const DEFAULT_INVITATION_TTL_DAYS: u32 = 7;

/// What an invitation grants membership of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationKind {
    /// A neighbourhood branch.
    Branch,
    /// A lending library (collection).
    Library,
}

impl InvitationKind {
    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Library => "library",
        }
    }

    /// First path segment of the redemption URL.
    #[must_use]
    pub const fn redemption_path_segment(self) -> &'static str {
        match self {
            Self::Branch => "invitations",
            Self::Library => "invite",
        }
    }

    /// Where the client lands after a successful redemption.
    #[must_use]
    pub fn landing_path(self, target_id: &Uuid) -> String {
        format!("/{}/{target_id}", self.as_str())
    }
}

impl fmt::Display for InvitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvitationKind {
    type Err = UnknownInvitationValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "branch" => Ok(Self::Branch),
            "library" | "collection" => Ok(Self::Library),
            other => Err(UnknownInvitationValue(other.to_owned())),
        }
    }
}

/// Invitation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Sent,
    Accepted,
    Expired,
}

/// States from which an invitation may still be redeemed.
pub const REDEEMABLE_STATUSES: [InvitationStatus; 2] =
    [InvitationStatus::Pending, InvitationStatus::Sent];

impl InvitationStatus {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
        }
    }

    /// Whether the invitation can still be redeemed or expired.
    #[must_use]
    pub const fn is_redeemable(self) -> bool {
        matches!(self, Self::Pending | Self::Sent)
    }
}

impl FromStr for InvitationStatus {
    type Err = UnknownInvitationValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "accepted" => Ok(Self::Accepted),
            "expired" => Ok(Self::Expired),
            other => Err(UnknownInvitationValue(other.to_owned())),
        }
    }
}

/// Raised when a stored kind or status is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown invitation value: {0}")]
pub struct UnknownInvitationValue(pub String);

/// An invitation to join a branch or library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub id: Uuid,
    pub token: InvitationToken,
    pub kind: InvitationKind,
    pub email: EmailAddress,
    pub sender_id: UserId,
    pub receiver_id: Option<UserId>,
    pub target_id: Uuid,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    /// Issue a pending invitation expiring `ttl` after `now`.
    #[must_use]
    pub fn issue(
        kind: InvitationKind,
        email: EmailAddress,
        sender_id: UserId,
        target_id: Uuid,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: InvitationToken::generate(),
            kind,
            email,
            sender_id,
            receiver_id: None,
            target_id,
            status: InvitationStatus::Pending,
            created_at: now,
            sent_at: None,
            accepted_at: None,
            expires_at: now + ttl,
        }
    }

    /// Whether `now` is past the deadline.
    #[must_use]
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample(now: DateTime<Utc>) -> Invitation {
        Invitation::issue(
            InvitationKind::Library,
            EmailAddress::new("invitee@example.org").expect("email"),
            UserId::random(),
            Uuid::new_v4(),
            now,
            Duration::days(i64::from(DEFAULT_INVITATION_TTL_DAYS)),
        )
    }

    #[test]
    fn issue_sets_seven_day_deadline() {
        let now = Utc::now();
        let invitation = sample(now);
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(invitation.expires_at - now, Duration::days(7));
        assert!(!invitation.is_past_deadline(now + Duration::days(7)));
        assert!(invitation.is_past_deadline(now + Duration::days(7) + Duration::seconds(1)));
    }

    #[rstest]
    #[case(InvitationStatus::Pending, true)]
    #[case(InvitationStatus::Sent, true)]
    #[case(InvitationStatus::Accepted, false)]
    #[case(InvitationStatus::Expired, false)]
    fn redeemable_statuses(#[case] status: InvitationStatus, #[case] expected: bool) {
        assert_eq!(status.is_redeemable(), expected);
        assert_eq!(status.as_str().parse::<InvitationStatus>(), Ok(status));
    }

    #[rstest]
    #[case("collection", InvitationKind::Library)]
    #[case("library", InvitationKind::Library)]
    #[case("branch", InvitationKind::Branch)]
    fn kind_accepts_collection_alias(#[case] raw: &str, #[case] expected: InvitationKind) {
        assert_eq!(raw.parse::<InvitationKind>(), Ok(expected));
    }

    #[test]
    fn landing_paths_follow_kind() {
        let id = Uuid::nil();
        assert_eq!(
            InvitationKind::Branch.landing_path(&id),
            format!("/branch/{id}")
        );
        assert_eq!(
            InvitationKind::Library.landing_path(&id),
            format!("/library/{id}")
        );
    }
}
