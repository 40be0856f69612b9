//! Secrets resolved once at process start.

use std::fmt;

/// Environment variable holding the unsubscribe secret.
pub const UNSUBSCRIBE_SECRET_VAR: &str = "UNSUBSCRIBE_SECRET";
/// Environment variable holding the Resend API key.
pub const API_KEY_VAR: &str = "RESEND_API_KEY";
/// Environment variable holding the Resend audience (segment) id.
pub const AUDIENCE_VAR: &str = "RESEND_SEGMENT_ID";

/// Secret keying the unsubscribe tokens. Formatting never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct UnsubscribeSecret(String);

impl UnsubscribeSecret {
    /// Wrap a secret. Empty strings count as no secret at all.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the raw secret. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UnsubscribeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UnsubscribeSecret").field(&"<redacted>").finish()
    }
}

impl fmt::Display for UnsubscribeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Bearer key for the email-delivery API. Formatting never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap an API key. Empty strings count as no key.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the raw key. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"<redacted>").finish()
    }
}

/// Sensitive settings read from the environment.
#[derive(Debug, Clone, Default)]
pub struct NewsletterSecrets {
    /// Key for unsubscribe tokens
    pub unsubscribe_secret: Option<UnsubscribeSecret>,

    /// Email-delivery API key
    pub api_key: Option<ApiKey>,

    /// Contact list (audience) id
    pub audience_id: Option<String>,
}

impl NewsletterSecrets {
    /// Read all secrets from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read all secrets through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            unsubscribe_secret: lookup(UNSUBSCRIBE_SECRET_VAR).and_then(UnsubscribeSecret::new),
            api_key: lookup(API_KEY_VAR).and_then(ApiKey::new),
            audience_id: lookup(AUDIENCE_VAR).filter(|value| !value.is_empty()),
        }
    }

    /// Log a line for every secret that is missing.
    pub fn report_missing(&self) {
        if self.unsubscribe_secret.is_none() {
            tracing::error!(
                "{} is not set; unsubscribe links cannot be verified",
                UNSUBSCRIBE_SECRET_VAR
            );
        }
        if self.api_key.is_none() {
            tracing::warn!("{} is not set; contact list calls will fail", API_KEY_VAR);
        }
        if self.audience_id.is_none() {
            tracing::warn!("{} is not set; contact list calls will fail", AUDIENCE_VAR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn secret_formatters_redact() {
        let secret = UnsubscribeSecret::new("super-secret").unwrap();

        assert_eq!(format!("{secret:?}"), "UnsubscribeSecret(\"<redacted>\")");
        assert_eq!(format!("{secret}"), "<redacted>");
        assert_eq!(secret.expose(), "super-secret");

        let key = ApiKey::new("re_123").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(\"<redacted>\")");
    }

    #[test]
    fn empty_values_are_treated_as_unset() {
        let env: HashMap<&str, &str> = HashMap::from([
            (UNSUBSCRIBE_SECRET_VAR, ""),
            (API_KEY_VAR, "re_key"),
            (AUDIENCE_VAR, ""),
        ]);

        let secrets = NewsletterSecrets::from_lookup(|name| env.get(name).map(|v| v.to_string()));

        assert!(secrets.unsubscribe_secret.is_none());
        assert_eq!(secrets.api_key.unwrap().expose(), "re_key");
        assert!(secrets.audience_id.is_none());
    }

    #[test]
    fn reads_all_values() {
        let secrets = NewsletterSecrets::from_lookup(|name| match name {
            UNSUBSCRIBE_SECRET_VAR => Some("s".to_string()),
            API_KEY_VAR => Some("k".to_string()),
            AUDIENCE_VAR => Some("aud".to_string()),
            _ => None,
        });

        assert_eq!(secrets.unsubscribe_secret.unwrap().expose(), "s");
        assert_eq!(secrets.audience_id.as_deref(), Some("aud"));
    }
}
