//! Process configuration.
//!
//! Plain settings load through OrthoConfig from CLI flags, environment
//! variables prefixed `NEIGHBOURLY_`, and an optional config file. Signing
//! material never goes through that path; see [`secrets`].

pub mod secrets;

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::PublicLinks;
use crate::domain::video_webhook_service::DEFAULT_PLAYBACK_BASE_URL;

pub use secrets::{BuildMode, Secrets, SecretsError, secrets_from_env};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_CAPABILITY_PREFIX: &str = "NBLY";
const MAX_INVITATION_TTL_DAYS: u32 = 365;
const MAX_RESULT_TTL_SECS: u64 = 24 * 60 * 60;

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid {name}='{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl SettingsError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            name,
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Runtime settings for the lending server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "NEIGHBOURLY")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. Without it the server runs on seeded in-memory data.
    pub database_url: Option<String>,
    /// Redis URL for the shared result store; in-process when unset.
    pub redis_url: Option<String>,
    /// Origin used to build links sent to users.
    pub public_base_url: Option<String>,
    /// Prefix stamped on capability tokens.
    pub capability_prefix: Option<String>,
    #[ortho_config(default = 7)]
    pub invitation_ttl_days: u32,
    #[ortho_config(default = 300)]
    pub webhook_tolerance_secs: u32,
    #[ortho_config(default = 300)]
    pub result_ttl_secs: u64,
    /// Host serving HLS playback for handoff videos.
    pub playback_base_url: Option<String>,
    /// SMS/email gateway. Messages are only logged when unset.
    pub notification_gateway_url: Option<String>,
    /// Mark session and invite cookies `Secure`; on unless set to `false`.
    pub cookie_secure: Option<bool>,
}

impl AppSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse()
            .map_err(|err| SettingsError::invalid("bind_addr", raw, err))
    }

    pub fn public_links(&self) -> Result<PublicLinks, SettingsError> {
        let raw = self
            .public_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PUBLIC_BASE_URL);
        PublicLinks::new(raw).map_err(|err| SettingsError::invalid("public_base_url", raw, err))
    }

    pub fn capability_prefix(&self) -> &str {
        self.capability_prefix
            .as_deref()
            .unwrap_or(DEFAULT_CAPABILITY_PREFIX)
    }

    pub fn invitation_ttl(&self) -> Result<chrono::Duration, SettingsError> {
        let days = self.invitation_ttl_days;
        if !(1..=MAX_INVITATION_TTL_DAYS).contains(&days) {
            return Err(SettingsError::invalid(
                "invitation_ttl_days",
                &days.to_string(),
                format!("must be between 1 and {MAX_INVITATION_TTL_DAYS} days"),
            ));
        }
        Ok(chrono::Duration::days(i64::from(days)))
    }

    pub fn webhook_tolerance(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.webhook_tolerance_secs))
    }

    pub fn result_ttl(&self) -> Result<Duration, SettingsError> {
        let secs = self.result_ttl_secs;
        if !(1..=MAX_RESULT_TTL_SECS).contains(&secs) {
            return Err(SettingsError::invalid(
                "result_ttl_secs",
                &secs.to_string(),
                format!("must be between 1 and {MAX_RESULT_TTL_SECS} seconds"),
            ));
        }
        Ok(Duration::from_secs(secs))
    }

    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure.unwrap_or(true)
    }

    pub fn playback_base_url(&self) -> &str {
        self.playback_base_url
            .as_deref()
            .unwrap_or(DEFAULT_PLAYBACK_BASE_URL)
    }

    pub fn notification_gateway(&self) -> Result<Option<Url>, SettingsError> {
        self.notification_gateway_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|err| SettingsError::invalid("notification_gateway_url", raw, err))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_INVITATION_TTL_DAYS;
    use crate::domain::result_bridge::DEFAULT_RESULT_TTL_SECS;
    use crate::domain::video_webhook::DEFAULT_TOLERANCE_SECS;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 11] = [
        "NEIGHBOURLY_BIND_ADDR",
        "NEIGHBOURLY_DATABASE_URL",
        "NEIGHBOURLY_REDIS_URL",
        "NEIGHBOURLY_PUBLIC_BASE_URL",
        "NEIGHBOURLY_CAPABILITY_PREFIX",
        "NEIGHBOURLY_INVITATION_TTL_DAYS",
        "NEIGHBOURLY_WEBHOOK_TOLERANCE_SECS",
        "NEIGHBOURLY_RESULT_TTL_SECS",
        "NEIGHBOURLY_PLAYBACK_BASE_URL",
        "NEIGHBOURLY_NOTIFICATION_GATEWAY_URL",
        "NEIGHBOURLY_COOKIE_SECURE",
    ];

    fn load_with(overrides: &[(&str, &str)]) -> AppSettings {
        let vars = VARS.map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned());
            (name, value)
        });
        let _guard = lock_env(vars);
        AppSettings::load_from_iter([OsString::from("neighbourly")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let settings = load_with(&[]);
        assert_eq!(
            settings.bind_addr().expect("bind addr"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("addr")
        );
        assert!(settings.database_url.is_none());
        assert_eq!(settings.capability_prefix(), "NBLY");
        assert_eq!(settings.invitation_ttl_days, DEFAULT_INVITATION_TTL_DAYS);
        assert_eq!(settings.webhook_tolerance_secs, DEFAULT_TOLERANCE_SECS);
        assert_eq!(settings.result_ttl_secs, DEFAULT_RESULT_TTL_SECS);
        assert_eq!(settings.playback_base_url(), DEFAULT_PLAYBACK_BASE_URL);
        assert!(settings.notification_gateway().expect("gateway").is_none());
        assert!(settings.cookie_secure());
        assert_eq!(
            settings.result_ttl().expect("result ttl"),
            Duration::from_secs(DEFAULT_RESULT_TTL_SECS)
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let settings = load_with(&[
            ("NEIGHBOURLY_BIND_ADDR", "127.0.0.1:9000"),
            ("NEIGHBOURLY_PUBLIC_BASE_URL", "https://lend.example.org"),
            ("NEIGHBOURLY_CAPABILITY_PREFIX", "SLFB"),
            ("NEIGHBOURLY_INVITATION_TTL_DAYS", "14"),
            ("NEIGHBOURLY_NOTIFICATION_GATEWAY_URL", "https://sms.example.org/v1"),
            ("NEIGHBOURLY_COOKIE_SECURE", "false"),
        ]);
        assert_eq!(settings.bind_addr().expect("addr").port(), 9000);
        assert_eq!(settings.capability_prefix(), "SLFB");
        assert_eq!(
            settings.invitation_ttl().expect("ttl"),
            chrono::Duration::days(14)
        );
        assert!(settings.notification_gateway().expect("gateway").is_some());
        assert!(!settings.cookie_secure());
    }

    #[rstest]
    #[case("NEIGHBOURLY_BIND_ADDR", "not-an-address")]
    #[case("NEIGHBOURLY_PUBLIC_BASE_URL", "lend.example.org")]
    #[case("NEIGHBOURLY_INVITATION_TTL_DAYS", "0")]
    #[case("NEIGHBOURLY_INVITATION_TTL_DAYS", "4294967295")]
    #[case("NEIGHBOURLY_RESULT_TTL_SECS", "0")]
    #[case("NEIGHBOURLY_RESULT_TTL_SECS", "18446744073709551615")]
    fn invalid_values_are_reported(#[case] name: &str, #[case] value: &str) {
        let settings = load_with(&[(name, value)]);
        let failures = [
            settings.bind_addr().err(),
            settings.public_links().err(),
            settings.invitation_ttl().err(),
            settings.result_ttl().err(),
        ];
        assert_eq!(failures.iter().flatten().count(), 1);
    }
}
