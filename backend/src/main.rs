//! Backend entry-point: loads configuration, prepares adapters, and serves the
//! lending API.

mod server;

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::SameSite;
use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use neighbourly::domain::{CapabilityCodec, WebhookVerifier};
use neighbourly::inbound::http::health::HealthState;
use neighbourly::inbound::http::state::LendingSettings;
use neighbourly::outbound::cache::RedisEphemeralStore;
use neighbourly::outbound::notify::{GatewayIdentity, HttpNotificationGateway};
use neighbourly::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use neighbourly::settings::{AppSettings, BuildMode, Secrets, secrets_from_env};
use ortho_config::OrthoConfig;
use server::{ServerConfig, create_server};

const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = fmt().with_env_filter(filter).json().try_init() {
        warn!(error = %e, "tracing init failed");
    }
}

fn config_error(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(err.to_string())
}

fn lending_settings(settings: &AppSettings, secrets: &Secrets) -> std::io::Result<LendingSettings> {
    Ok(LendingSettings {
        links: settings.public_links().map_err(config_error)?,
        capabilities: CapabilityCodec::new(
            settings.capability_prefix(),
            secrets.capability.clone(),
        )
        .map_err(config_error)?,
        webhook_verifier: WebhookVerifier::new(
            secrets.webhook.to_vec(),
            settings.webhook_tolerance(),
        ),
        playback_base_url: settings.playback_base_url().to_owned(),
        invitation_ttl: settings.invitation_ttl().map_err(config_error)?,
        result_ttl: settings.result_ttl().map_err(config_error)?,
        cookie_secure: settings.cookie_secure(),
    })
}

async fn attach_adapters(
    mut config: ServerConfig,
    settings: &AppSettings,
    secrets: &Secrets,
) -> std::io::Result<ServerConfig> {
    if let Some(url) = settings.database_url.as_deref() {
        run_migrations(url).await.map_err(config_error)?;
        let pool = DbPool::new(PoolConfig::new(url))
            .await
            .map_err(config_error)?;
        config = config.with_db_pool(pool);
        info!("using PostgreSQL persistence");
    } else {
        warn!("NEIGHBOURLY_DATABASE_URL not set; serving seeded in-memory data");
    }

    if let Some(url) = settings.redis_url.as_deref() {
        let store = RedisEphemeralStore::connect(url)
            .await
            .map_err(config_error)?;
        config = config.with_result_store(Arc::new(store));
    }

    if let Some(base) = settings.notification_gateway().map_err(config_error)? {
        let identity = GatewayIdentity {
            api_key: secrets.gateway_token.as_ref().map(|token| token.as_str().to_owned()),
            ..GatewayIdentity::default()
        };
        let gateway = HttpNotificationGateway::new(&base, GATEWAY_TIMEOUT, identity)
            .map_err(config_error)?;
        config = config.with_notifier(Arc::new(gateway));
    } else {
        warn!("no notification gateway configured; messages will only be logged");
    }
    Ok(config)
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let settings = AppSettings::load().map_err(config_error)?;
    let secrets = secrets_from_env(&mockable::DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(config_error)?;
    let fingerprints = secrets.fingerprints();
    info!(
        session_key = %fingerprints.session_key,
        webhook = %fingerprints.webhook,
        capability_dev_secret = secrets.capability.is_development(),
        "secrets loaded"
    );

    let bind_addr = settings.bind_addr().map_err(config_error)?;
    let config = ServerConfig::new(
        secrets.session_key.clone(),
        SameSite::Lax,
        bind_addr,
        lending_settings(&settings, &secrets)?,
    );
    let config = attach_adapters(config, &settings, &secrets).await?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, "neighbourly listening");
    let result = server.await;
    health_state.mark_unhealthy();
    result
}
