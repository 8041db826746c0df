//! Random, persisted, unguessable tokens.
//!
//! Unlike capability tokens these carry no structure: authority comes from a
//! stored record keyed by the token. Values are 32 bytes from the operating
//! system RNG rendered as 64 lowercase hex digits, and inputs from the wire are
//! shape-checked before any lookup.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

const TOKEN_BYTES: usize = 32;
const TOKEN_HEX_LEN: usize = TOKEN_BYTES * 2;

/// Raised when an inbound token does not have the minted shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("token must be {TOKEN_HEX_LEN} lowercase hex characters")]
pub struct MalformedToken;

fn random_hex() -> String {
    let mut bytes = [0_u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn has_token_shape(raw: &str) -> bool {
    raw.len() == TOKEN_HEX_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

macro_rules! opaque_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh token.
            #[must_use]
            pub fn generate() -> Self {
                Self(random_hex())
            }

            /// Accept a token received from an untrusted source.
            pub fn parse(raw: &str) -> Result<Self, MalformedToken> {
                if has_token_shape(raw) {
                    Ok(Self(raw.to_owned()))
                } else {
                    Err(MalformedToken)
                }
            }

            /// Borrow the token text.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        // Tokens are bearer credentials; keep them out of debug logs.
        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let visible: String = self.0.chars().take(6).collect();
                write!(f, "{}({visible}..)", stringify!($name))
            }
        }

        impl TryFrom<String> for $name {
            type Error = MalformedToken;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

opaque_token! {
    /// Single-use token authorising the lender's answer to one borrow request.
    ResponseToken
}

opaque_token! {
    /// Token embedded in an invitation link.
    InvitationToken
}
