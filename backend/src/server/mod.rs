//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use neighbourly::Trace;
#[cfg(debug_assertions)]
use neighbourly::doc::ApiDoc;
use neighbourly::inbound::http::configure_routes;
use neighbourly::inbound::http::health::{HealthState, live, ready};
use neighbourly::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
}

fn session_middleware(
    key: Key,
    cookie_secure: bool,
    same_site: SameSite,
) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(same_site)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build()
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
        same_site,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .configure(|cfg| {
            configure_routes(cfg, || {
                session_middleware(key.clone(), cookie_secure, same_site)
            })
        })
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let http_state = build_http_state(&config);
    let cookie_secure = config.cookie_secure();
    let ServerConfig {
        key,
        same_site,
        bind_addr,
        ..
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
            same_site,
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::Duration;
    use neighbourly::domain::{CapabilityCodec, CapabilitySecret, PublicLinks, WebhookVerifier};
    use neighbourly::inbound::http::state::LendingSettings;

    fn deps() -> AppDependencies {
        let config = ServerConfig::new(
            Key::generate(),
            SameSite::Lax,
            "127.0.0.1:0".parse().expect("addr"),
            LendingSettings {
                links: PublicLinks::new("http://localhost:8080").expect("links"),
                capabilities: CapabilityCodec::new("NBLY", CapabilitySecret::development())
                    .expect("codec"),
                webhook_verifier: WebhookVerifier::new(b"whsec".to_vec(), Duration::seconds(300)),
                playback_base_url: "https://stream.mux.com".to_owned(),
                invitation_ttl: Duration::days(7),
                result_ttl: std::time::Duration::from_secs(300),
                cookie_secure: false,
            },
        );
        AppDependencies {
            health_state: web::Data::new(HealthState::new()),
            http_state: build_http_state(&config),
            key: Key::generate(),
            cookie_secure: false,
            same_site: SameSite::Lax,
        }
    }

    #[actix_web::test]
    async fn login_cookie_is_private_and_http_only() {
        let app = test::init_service(build_app(deps())).await;
        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/login")
                .set_json(serde_json::json!({
                    "email": "lender@example.org",
                    "password": "password"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .response()
            .cookies()
            .find(|c| c.name() == "session")
            .expect("session cookie");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert!(!cookie.value().contains("user_id"));
    }

    #[actix_web::test]
    async fn probes_and_webhook_share_the_app() {
        let app = test::init_service(build_app(deps())).await;
        let liveness = test::call_service(
            &app,
            test::TestRequest::get().uri("/health/live").to_request(),
        )
        .await;
        assert_eq!(liveness.status(), StatusCode::OK);
        let webhook = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/webhooks/video")
                .set_payload("{}")
                .to_request(),
        )
        .await;
        assert_eq!(webhook.status(), StatusCode::OK);
    }
}
