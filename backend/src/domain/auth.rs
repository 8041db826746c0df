//! Login credentials accepted by the session endpoint.

use zeroize::Zeroizing;

use super::{EmailAddress, UserValidationError};

/// Reasons a login payload is rejected before any lookup happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginValidationError {
    /// Email was missing or malformed.
    #[error("email must be a valid address")]
    InvalidEmail,
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
}

impl From<UserValidationError> for LoginValidationError {
    fn from(_: UserValidationError) -> Self {
        Self::InvalidEmail
    }
}

/// Validated email/password pair.
///
/// The password keeps caller whitespace and is wiped from memory on drop.
///
/// # Examples
/// ```
/// use neighbourly::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("Lender@Example.org", "pw").unwrap();
/// assert_eq!(creds.email().as_str(), "lender@example.org");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: EmailAddress,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Validate raw inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let email = EmailAddress::new(email)?;
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Raw password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "pw", LoginValidationError::InvalidEmail)]
    #[case("nobody", "pw", LoginValidationError::InvalidEmail)]
    #[case("ada@example.org", "", LoginValidationError::EmptyPassword)]
    fn rejects_invalid_parts(
        #[case] email: &str,
        #[case] password: &str,
        #[case] expected: LoginValidationError,
    ) {
        let err = LoginCredentials::try_from_parts(email, password).expect_err("invalid");
        assert_eq!(err, expected);
    }

    #[test]
    fn keeps_password_whitespace() {
        let creds = LoginCredentials::try_from_parts("ada@example.org", " pw ").expect("valid");
        assert_eq!(creds.password(), " pw ");
    }
}
