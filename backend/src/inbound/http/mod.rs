//! HTTP inbound adapter exposing REST endpoints.

pub mod borrow_approval;
pub mod borrow_requests;
pub mod collections;
pub mod error;
pub mod feedback;
pub mod generation_results;
pub mod health;
pub mod invitations;
pub mod invite_cookies;
pub mod schemas;
pub mod session;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod users;
pub(crate) mod validation;
pub mod webhooks;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::web;

pub use error::ApiResult;
#[cfg(any(test, feature = "test-support"))]
pub use test_utils::test_app;

/// Register every lending route.
///
/// `session` builds the cookie session middleware for the scopes that read
/// the signed-in user; it is called once per scope and each call must use the
/// same key.
pub fn configure_routes<F>(cfg: &mut web::ServiceConfig, session: F)
where
    F: Fn() -> SessionMiddleware<CookieSessionStore>,
{
    cfg.service(
        web::scope("/api/v1")
            .wrap(session())
            .service(users::login)
            .service(users::logout)
            .service(borrow_requests::create_borrow_request)
            .service(borrow_requests::get_borrow_request)
            .service(borrow_requests::confirm_handoff)
            .service(borrow_requests::mark_returned)
            .service(invitations::create_invitation)
            .service(collections::transfer_ownership)
            .service(feedback::upvote)
            .service(feedback::attribution_slug)
            .service(feedback::resolve_attribution)
            .service(generation_results::poll_result),
    )
    .service(
        web::scope("/invite")
            .wrap(session())
            .service(invitations::consume_invite)
            .service(invitations::open_library_invite),
    )
    .service(invitations::open_branch_invite)
    .service(borrow_approval::view_approval)
    .service(borrow_approval::respond)
    .service(webhooks::video_ready);
}
