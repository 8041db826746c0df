//! Collection ownership and membership.
//!
//! Every collection has exactly one owner. Handing ownership over reassigns
//! `owner_id` and keeps the previous owner as an active admin in one
//! transaction; adapters must never apply one half without the other.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{InvitationKind, UserId};

/// Role held inside a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Member,
    Admin,
}

impl MemberRole {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored role is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown member role: {0}")]
pub struct UnknownMemberRole(pub String);

impl FromStr for MemberRole {
    type Err = UnknownMemberRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownMemberRole(other.to_owned())),
        }
    }
}

/// A lending library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: Uuid,
    pub owner_id: UserId,
    pub name: String,
}

/// Membership row, unique on `(user_id, collection_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMember {
    pub user_id: UserId,
    pub collection_id: Uuid,
    pub role: MemberRole,
    pub is_active: bool,
}

impl CollectionMember {
    /// Whether the member is an active admin.
    #[must_use]
    pub fn is_active_admin(&self) -> bool {
        self.is_active && self.role == MemberRole::Admin
    }
}

/// Branch or library an invitee joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MembershipTarget {
    pub kind: InvitationKind,
    pub target_id: Uuid,
}

/// A requested ownership hand-over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipTransfer {
    pub collection_id: Uuid,
    pub previous_owner: UserId,
    pub new_owner: UserId,
}
