//! Borrow request lifecycle.
//!
//! ```text
//! PENDING ──approve──▶ APPROVED ──handoff──▶ ACTIVE ──return──▶ RETURNED
//!    │                    └──────────────return──────────────────▲
//!    └──decline──▶ DECLINED
//! ```
//!
//! `DECLINED` and `RETURNED` are terminal. Transitions never move backward.
//! The response token authorises exactly one `PENDING` exit; storage adapters
//! enforce that with a conditional update keyed on `status = 'pending'`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ResponseToken, UserId};

/// Longest accepted request message, in characters.
pub const REQUEST_MESSAGE_MAX_CHARS: usize = 1000;

/// Lifecycle state of a borrow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Declined,
    Active,
    Returned,
}

/// States that keep an item unavailable to other borrowers.
pub const OPEN_STATUSES: [BorrowStatus; 3] = [
    BorrowStatus::Pending,
    BorrowStatus::Approved,
    BorrowStatus::Active,
];

impl BorrowStatus {
    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Active => "active",
            Self::Returned => "returned",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Declined | Self::Returned)
    }

    /// Whether `next` is a legal single step from `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Declined)
                | (Self::Approved, Self::Active | Self::Returned)
                | (Self::Active, Self::Returned)
        )
    }
}

impl fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored status string is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown borrow status: {0}")]
pub struct UnknownBorrowStatus(pub String);

impl FromStr for BorrowStatus {
    type Err = UnknownBorrowStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            "active" => Ok(Self::Active),
            "returned" => Ok(Self::Returned),
            other => Err(UnknownBorrowStatus(other.to_owned())),
        }
    }
}

/// Lender's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorrowDecision {
    Approve,
    Decline,
}

impl BorrowDecision {
    /// Status reached by applying this decision.
    #[must_use]
    pub const fn target_status(self) -> BorrowStatus {
        match self {
            Self::Approve => BorrowStatus::Approved,
            Self::Decline => BorrowStatus::Declined,
        }
    }
}

/// A loan from request to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowRequest {
    pub id: Uuid,
    pub item_id: Uuid,
    pub borrower_id: UserId,
    pub lender_id: UserId,
    pub status: BorrowStatus,
    pub request_message: String,
    pub requested_return_date: NaiveDate,
    pub response_token: ResponseToken,
    /// Playback URL of the handoff video; set only while approved.
    pub video_url: Option<String>,
    /// Video that arrived before approval, promoted on approve.
    pub pending_video_url: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BorrowRequest {
    /// Open a new pending request with a fresh response token.
    #[must_use]
    pub fn open(draft: BorrowRequestDraft, lender_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: draft.item_id,
            borrower_id: draft.borrower_id,
            lender_id,
            status: BorrowStatus::Pending,
            request_message: draft.message,
            requested_return_date: draft.return_by,
            response_token: ResponseToken::generate(),
            video_url: None,
            pending_video_url: None,
            approved_at: None,
            activated_at: None,
            returned_at: None,
            created_at: now,
        }
    }

    /// Whether `user` is the lender or borrower.
    #[must_use]
    pub fn is_participant(&self, user: &UserId) -> bool {
        self.lender_id == *user || self.borrower_id == *user
    }
}

/// Validation failures for a new request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BorrowRequestValidationError {
    #[error("request message must be at most {REQUEST_MESSAGE_MAX_CHARS} characters")]
    MessageTooLong,
    #[error("return date must not be in the past")]
    ReturnDateInPast,
}

/// Borrower input for a new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowRequestDraft {
    pub item_id: Uuid,
    pub borrower_id: UserId,
    pub message: String,
    pub return_by: NaiveDate,
}

impl BorrowRequestDraft {
    /// Trim and validate borrower input against `today`.
    pub fn new(
        item_id: Uuid,
        borrower_id: UserId,
        message: &str,
        return_by: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, BorrowRequestValidationError> {
        let message = message.trim();
        if message.chars().count() > REQUEST_MESSAGE_MAX_CHARS {
            return Err(BorrowRequestValidationError::MessageTooLong);
        }
        if return_by < today {
            return Err(BorrowRequestValidationError::ReturnDateInPast);
        }
        Ok(Self {
            item_id,
            borrower_id,
            message: message.to_owned(),
            return_by,
        })
    }
}
