//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::cookie::{Key, SameSite};
use neighbourly::domain::ports::{EphemeralStore, Notifier};
use neighbourly::inbound::http::state::LendingSettings;
use neighbourly::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) lending: LendingSettings,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) result_store: Option<Arc<dyn EphemeralStore>>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
}

impl ServerConfig {
    /// Configuration running on seeded in-memory data, an in-process result
    /// store and a logging notifier until the `with_*` builders say otherwise.
    #[must_use]
    pub fn new(key: Key, same_site: SameSite, bind_addr: SocketAddr, lending: LendingSettings) -> Self {
        Self {
            key,
            same_site,
            bind_addr,
            lending,
            db_pool: None,
            result_store: None,
            notifier: None,
        }
    }

    /// Back repositories and directories with PostgreSQL.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Share generation results through `store` instead of process memory.
    #[must_use]
    pub fn with_result_store(mut self, store: Arc<dyn EphemeralStore>) -> Self {
        self.result_store = Some(store);
        self
    }

    /// Deliver notifications through `notifier` instead of logging them.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Whether session cookies carry the `Secure` attribute.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.lending.cookie_secure
    }
}
