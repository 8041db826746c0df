//! Lending core: entities, use-case services and ports.
//!
//! Services depend only on the traits in [`ports`]; adapters live under
//! `crate::outbound` and `crate::inbound`.

pub mod auth;
pub mod borrow;
pub mod borrow_service;
pub mod capability;
pub mod error;
pub mod feedback;
pub mod invitation;
pub mod invitation_service;
pub mod links;
pub mod membership;
pub mod membership_service;
pub mod notification;
pub mod ports;
pub mod result_bridge;
pub mod token;
pub mod trace_id;
pub mod user;
pub mod video_webhook;
pub mod video_webhook_service;

pub use self::auth::{LoginCredentials, LoginValidationError};
pub use self::borrow::{
    BorrowDecision, BorrowRequest, BorrowRequestDraft, BorrowRequestValidationError,
    BorrowStatus, OPEN_STATUSES, REQUEST_MESSAGE_MAX_CHARS, UnknownBorrowStatus,
};
pub use self::borrow_service::{
    BorrowApprovalView, BorrowOutcome, BorrowService, BorrowServicePorts, VideoAttachment,
};
pub use self::capability::{CapabilityCodec, CapabilityError, CapabilitySecret};
pub use self::error::{Error, ErrorCode};
pub use self::feedback::{FeedbackService, FeedbackVote, IssueNumber, VoteTally};
pub use self::invitation::{
    DEFAULT_INVITATION_TTL_DAYS, Invitation, InvitationKind, InvitationStatus,
    REDEEMABLE_STATUSES, UnknownInvitationValue,
};
pub use self::invitation_service::{
    InvitationOutcome, InvitationService, InvitationServicePorts, Redemption,
};
pub use self::links::PublicLinks;
pub use self::membership::{
    Collection, CollectionMember, MemberRole, MembershipTarget, OwnershipTransfer,
    UnknownMemberRole,
};
pub use self::membership_service::CollectionService;
pub use self::notification::{
    DeliveryReceipt, Notification, NotificationChannel, NotificationParams,
    NotificationTemplate, NotificationWarning,
};
pub use self::result_bridge::GenerationResultBridge;
pub use self::token::{InvitationToken, MalformedToken, ResponseToken};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{EmailAddress, UserContact, UserId, UserValidationError};
pub use self::video_webhook::{SignatureError, VideoEvent, WebhookVerifier};
pub use self::video_webhook_service::{VideoWebhookService, WebhookAck};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use neighbourly::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
