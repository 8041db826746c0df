//! Session helpers and the authenticated principal extractor.
//!
//! Handlers that need a signed-in user take [`AuthenticatedUser`]; the user id
//! is resolved once per request from the cookie session.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::{Error, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated user's id in the session cookie.
    pub fn persist_user(&self, user_id: &UserId) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, user_id.to_string())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Drop every session value and expire the cookie.
    pub fn clear(&self) {
        self.0.purge();
    }

    /// Signed-in user id, or `None` when the cookie carries no usable id.
    ///
    /// A malformed id is logged and treated as signed out.
    pub fn user_id(&self) -> Result<Option<UserId>, Error> {
        let Some(raw) = self
            .0
            .get::<String>(USER_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?
        else {
            return Ok(None);
        };
        Ok(UserId::new(raw)
            .inspect_err(|error| warn!(%error, "discarding malformed session user id"))
            .ok())
    }

    /// Require an authenticated user id or return `401 Unauthorized`.
    pub fn require_user_id(&self) -> Result<UserId, Error> {
        self.user_id()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

/// The signed-in user making the request.
///
/// Extraction fails with `401 Unauthorized` when no valid session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

impl AuthenticatedUser {
    /// The user's id.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = SessionContext::from_request(req, payload);
        Box::pin(async move {
            let session = fut.await?;
            session
                .require_user_id()
                .map(AuthenticatedUser)
                .map_err(actix_web::Error::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FIXTURE_BORROWER;
    use actix_web::cookie::Cookie;
    use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test as actix_test, web};
    use rstest::rstest;

    /// Stores `raw` verbatim as the session user id.
    async fn store_raw_user(session: Session, raw: web::Path<String>) -> HttpResponse {
        match session.insert(USER_ID_KEY, raw.into_inner()) {
            Ok(()) => HttpResponse::Ok().finish(),
            Err(_) => HttpResponse::InternalServerError().finish(),
        }
    }

    async fn sign_out(session: SessionContext) -> HttpResponse {
        session.clear();
        HttpResponse::NoContent().finish()
    }

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(user.id().to_string())
    }

    fn borrower_app() -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .wrap(crate::inbound::http::test_utils::test_session_middleware())
            .route("/session/{raw}", web::put().to(store_raw_user))
            .route(
                "/session",
                web::post().to(|session: SessionContext| async move {
                    session.persist_user(&FIXTURE_BORROWER.user_id)?;
                    Ok::<_, Error>(HttpResponse::Ok().finish())
                }),
            )
            .route("/session", web::delete().to(sign_out))
            .route("/whoami", web::get().to(whoami))
    }

    fn session_cookie(response: &ServiceResponse) -> Cookie<'static> {
        response
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned()
    }

    #[actix_web::test]
    async fn signed_in_borrower_is_the_authenticated_user() {
        let app = actix_test::init_service(borrower_app()).await;
        let signed_in = actix_test::call_service(
            &app,
            actix_test::TestRequest::post().uri("/session").to_request(),
        )
        .await;
        assert_eq!(signed_in.status(), StatusCode::OK);

        let body = actix_test::call_and_read_body(
            &app,
            actix_test::TestRequest::get()
                .uri("/whoami")
                .cookie(session_cookie(&signed_in))
                .to_request(),
        )
        .await;
        assert_eq!(body, FIXTURE_BORROWER.user_id.to_string());
    }

    #[rstest]
    #[case::not_a_uuid("not-a-uuid")]
    #[case::truncated_uuid("3fa85f64-5717-4562")]
    #[actix_web::test]
    async fn unusable_session_user_is_unauthorised(#[case] raw: &str) {
        let app = actix_test::init_service(borrower_app()).await;
        let stored = actix_test::call_service(
            &app,
            actix_test::TestRequest::put()
                .uri(&format!("/session/{raw}"))
                .to_request(),
        )
        .await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/whoami")
                .cookie(session_cookie(&stored))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn request_without_a_session_is_unauthorised() {
        let app = actix_test::init_service(borrower_app()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/whoami").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn signing_out_expires_the_cookie() {
        let app = actix_test::init_service(borrower_app()).await;
        let signed_in = actix_test::call_service(
            &app,
            actix_test::TestRequest::post().uri("/session").to_request(),
        )
        .await;
        let signed_out = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri("/session")
                .cookie(session_cookie(&signed_in))
                .to_request(),
        )
        .await;
        assert_eq!(signed_out.status(), StatusCode::NO_CONTENT);
        assert_eq!(session_cookie(&signed_out).value(), "");
    }
}
