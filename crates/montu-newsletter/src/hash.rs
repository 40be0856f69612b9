//! Keyed tokens that authorize unsubscribe links.
//!
//! A token is the first [`TOKEN_LEN`] hex characters of
//! `SHA-256(email || secret)`. The unsubscribe link carries `(email, token)`,
//! so the server needs no per-recipient state. Rotating the secret
//! invalidates every outstanding link.

use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use url::Url;

use crate::config::UnsubscribeSecret;
use crate::error::ConfigError;

/// Number of hex characters kept from the digest (64 bits).
pub const TOKEN_LEN: usize = 16;

/// Path of the unsubscribe endpoint, relative to the site root.
pub const UNSUBSCRIBE_PATH: &str = "/api/unsubscribe";

/// A derived unsubscribe token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailToken(String);

impl EmailToken {
    /// The token as lowercase hex.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Generates and verifies unsubscribe tokens.
#[derive(Debug, Clone)]
pub struct HashAuthority {
    secret: Option<UnsubscribeSecret>,
}

impl HashAuthority {
    /// Create an authority keyed by `secret`.
    ///
    /// A missing secret is accepted here so a server can still answer with a
    /// generic error page; every token operation then fails.
    pub fn new(secret: Option<UnsubscribeSecret>) -> Self {
        Self { secret }
    }

    /// Fails with [`ConfigError::MissingSecret`] unless a secret is present.
    pub fn ensure_configured(&self) -> Result<(), ConfigError> {
        self.secret().map(|_| ())
    }

    fn secret(&self) -> Result<&UnsubscribeSecret, ConfigError> {
        self.secret.as_ref().ok_or(ConfigError::MissingSecret)
    }

    /// Derive the token for `email`.
    pub fn generate_token(&self, email: &str) -> Result<EmailToken, ConfigError> {
        let secret = self.secret()?;

        let mut hasher = Sha256::new();
        hasher.update(email.as_bytes());
        hasher.update(secret.expose().as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        Ok(EmailToken(digest[..TOKEN_LEN].to_string()))
    }

    /// Check `candidate` against the token for `email`.
    ///
    /// Never errors: a missing secret is logged and reported as a mismatch so
    /// callers cannot tell the two apart.
    pub fn verify_token(&self, email: &str, candidate: &str) -> bool {
        match self.generate_token(email) {
            Ok(expected) => bool::from(expected.as_str().as_bytes().ct_eq(candidate.as_bytes())),
            Err(e) => {
                tracing::error!("Hash verification failed: {}", e);
                false
            }
        }
    }

    /// Build the unsubscribe link for `email` under `base_url`.
    pub fn unsubscribe_url(&self, base_url: &str, email: &str) -> Result<Url, ConfigError> {
        let token = self.generate_token(email)?;

        let mut url = Url::parse(base_url)
            .and_then(|base| base.join(UNSUBSCRIBE_PATH))
            .map_err(|e| ConfigError::InvalidUrl {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;

        url.query_pairs_mut()
            .append_pair("email", email)
            .append_pair("hash", token.as_str());

        Ok(url)
    }
}
