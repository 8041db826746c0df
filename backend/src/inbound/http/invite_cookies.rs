//! Signed cookies that carry an invitation across the login redirect.
//!
//! Visiting an invitation link stores the token and its target in two
//! HttpOnly cookies, each wrapped in a capability token so the browser cannot
//! forge or swap them. After login, `POST /invite/consume` reads them back,
//! redeems the invitation and clears both cookies.

use actix_web::HttpRequest;
use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{CapabilityCodec, Error, InvitationKind};

/// Cookie holding the signed invitation token.
pub const PENDING_INVITE_COOKIE: &str = "pending_invite";
/// Cookie holding the signed invitation target id.
pub const PENDING_TARGET_COOKIE: &str = "pending_invite_target";

const TARGET_PURPOSE: &str = "invite-target";
const COOKIE_TTL_MINUTES: i64 = 30;

fn token_purpose(kind: InvitationKind) -> &'static str {
    match kind {
        InvitationKind::Library => "invite-library",
        InvitationKind::Branch => "invite-branch",
    }
}

/// Invitation recovered from the handoff cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInvite {
    pub kind: InvitationKind,
    pub token: String,
    pub target_id: Option<Uuid>,
}

/// Mints and reads the invitation handoff cookies.
#[derive(Debug, Clone)]
pub struct InviteCookieSigner {
    codec: CapabilityCodec,
    secure: bool,
}

impl InviteCookieSigner {
    pub fn new(codec: CapabilityCodec, secure: bool) -> Self {
        Self { codec, secure }
    }

    /// Cookies remembering `token` for redemption after login.
    pub fn pending_cookies(
        &self,
        kind: InvitationKind,
        token: &str,
        target_id: &Uuid,
    ) -> Result<[Cookie<'static>; 2], Error> {
        let sealed_token = self
            .codec
            .issue(token, token_purpose(kind))
            .map_err(|err| Error::internal(format!("failed to seal invitation cookie: {err}")))?;
        let sealed_target = self
            .codec
            .issue(&target_id.to_string(), TARGET_PURPOSE)
            .map_err(|err| Error::internal(format!("failed to seal invitation cookie: {err}")))?;
        Ok([
            self.build(PENDING_INVITE_COOKIE, sealed_token),
            self.build(PENDING_TARGET_COOKIE, sealed_target),
        ])
    }

    /// Cookies that expire both handoff values.
    #[must_use]
    pub fn removal_cookies(&self) -> [Cookie<'static>; 2] {
        [PENDING_INVITE_COOKIE, PENDING_TARGET_COOKIE].map(|name| {
            let mut cookie = self.build(name, String::new());
            cookie.make_removal();
            cookie
        })
    }

    /// Read a pending invitation from the request, if one verifies.
    ///
    /// A target cookie that fails verification is dropped rather than
    /// invalidating the invitation itself.
    pub fn read(&self, req: &HttpRequest) -> Option<PendingInvite> {
        let sealed = req.cookie(PENDING_INVITE_COOKIE)?;
        let (kind, token) = [InvitationKind::Library, InvitationKind::Branch]
            .into_iter()
            .find_map(|kind| {
                self.codec
                    .verify(sealed.value(), token_purpose(kind))
                    .ok()
                    .map(|token| (kind, token))
            })
            .or_else(|| {
                debug!("pending invitation cookie failed verification");
                None
            })?;
        let target_id = req.cookie(PENDING_TARGET_COOKIE).and_then(|cookie| {
            self.codec
                .verify(cookie.value(), TARGET_PURPOSE)
                .ok()
                .and_then(|raw| Uuid::parse_str(&raw).ok())
        });
        Some(PendingInvite {
            kind,
            token,
            target_id,
        })
    }

    fn build(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build(name, value)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::minutes(COOKIE_TTL_MINUTES))
            .finish()
    }
}
