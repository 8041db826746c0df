//! Driving port for login.
//!
//! Inbound adapters authenticate through this trait so HTTP tests can swap in
//! a double without wiring an identity store.

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::domain::{Error, LoginCredentials, UserId};

/// Domain use-case port for authentication.
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and return the authenticated user id.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<UserId, Error>;
}

/// A development account known to [`FixtureLoginService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureAccount {
    pub email: &'static str,
    pub user_id: UserId,
}

/// Lender in the development data set.
pub const FIXTURE_LENDER: FixtureAccount = FixtureAccount {
    email: "lender@example.org",
    user_id: UserId::from_uuid(Uuid::from_u128(0x5a1d_0c6e_2f3b_4c1a_9e7d_0000_0000_0001)),
};

/// Borrower in the development data set.
pub const FIXTURE_BORROWER: FixtureAccount = FixtureAccount {
    email: "borrower@example.org",
    user_id: UserId::from_uuid(Uuid::from_u128(0x5a1d_0c6e_2f3b_4c1a_9e7d_0000_0000_0002)),
};

const FIXTURE_PASSWORD: &str = "password";

/// In-memory authenticator for development builds and tests.
///
/// Each fixture account signs in with the password `password`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLoginService;

impl FixtureLoginService {
    /// Accounts accepted by the fixture.
    #[must_use]
    pub const fn accounts() -> [FixtureAccount; 2] {
        [FIXTURE_LENDER, FIXTURE_BORROWER]
    }
}

#[async_trait]
impl LoginService for FixtureLoginService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<UserId, Error> {
        let password_ok: bool = credentials
            .password()
            .as_bytes()
            .ct_eq(FIXTURE_PASSWORD.as_bytes())
            .into();
        Self::accounts()
            .into_iter()
            .find(|account| account.email == credentials.email().as_str())
            .filter(|_| password_ok)
            .map(|account| account.user_id)
            .ok_or_else(|| Error::unauthorized("invalid credentials"))
    }
}
