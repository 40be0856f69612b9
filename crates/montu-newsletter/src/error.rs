//! Error types shared by the newsletter components.

use std::path::PathBuf;

/// A required configuration value is missing or unreadable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("UNSUBSCRIBE_SECRET environment variable is not set")]
    MissingSecret,

    #[error("RESEND_API_KEY environment variable is not set")]
    MissingApiKey,

    #[error("RESEND_SEGMENT_ID environment variable is not set")]
    MissingAudience,

    #[error("Failed to read {path}: {message}")]
    ReadError { path: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid base URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Errors returned by a contact-list backend.
#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("Contact list is not configured: {0}")]
    NotConfigured(#[from] ConfigError),

    #[error("Contact list request failed: {0}")]
    Transport(String),

    #[error("Contact list returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode contact list response: {0}")]
    Decode(String),
}

impl ContactError {
    /// Whether the failure comes from local configuration rather than upstream.
    pub fn is_config(&self) -> bool {
        matches!(self, ContactError::NotConfigured(_))
    }
}

/// Errors returned by an email-delivery backend.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mailer is not configured: {0}")]
    NotConfigured(#[from] ConfigError),

    #[error("Email request failed: {0}")]
    Transport(String),

    #[error("Email API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode email API response: {0}")]
    Decode(String),

    #[error("Failed to render email: {0}")]
    Render(String),
}
