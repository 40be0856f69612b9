//! Request errors and how they are shown to users.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use montu_newsletter::{ConfigError, ContactError};
use serde_json::json;

use crate::pages::{MessagePage, PageRenderer};

/// Everything a newsletter endpoint can fail with.
///
/// Only [`ApiError::Config`] maps to a 500; every other variant is a normal,
/// well-formed response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    Validation(&'static str),

    #[error("Unsubscribe link failed verification")]
    InvalidLink,

    #[error("Rate limited for {retry_after_secs}s")]
    RateLimited {
        retry_after_secs: u64,
        retry_after_minutes: u64,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Contact list error: {0}")]
    Upstream(String),
}

impl From<ContactError> for ApiError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::NotConfigured(config) => ApiError::Config(config),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

/// Localized messages shown to end users.
pub mod messages {
    pub const EMAIL_REQUIRED: &str = "ইমেইল দিতে হবে";
    pub const EMAIL_INVALID: &str = "সঠিক ইমেইল দিন";
    pub const LINK_INCOMPLETE: &str = "ইমেইল অথবা হ্যাশ পাওয়া যায়নি";
    pub const LINK_INVALID: &str = "আনসাবস্ক্রাইব লিংক টি সঠিক নয়।";
    pub const SERVER_CONFIG: &str = "সার্ভার কনফিগারেশন এরর";
    pub const GENERIC_FAILURE: &str = "কিছু একটা সমস্যা হয়েছে। আবার চেষ্টা করুন।";
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidLink => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message safe to show to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(message) => message.to_string(),
            ApiError::InvalidLink => messages::LINK_INVALID.to_string(),
            ApiError::RateLimited {
                retry_after_minutes,
                ..
            } => format!(
                "অনেক বেশি চেষ্টা করা হয়েছে। {} মিনিট পরে আবার চেষ্টা করুন।",
                retry_after_minutes
            ),
            ApiError::Config(_) => messages::SERVER_CONFIG.to_string(),
            ApiError::Upstream(_) => messages::GENERIC_FAILURE.to_string(),
        }
    }

    fn log(&self) {
        match self {
            ApiError::Validation(_) | ApiError::RateLimited { .. } => {
                tracing::debug!("{}", self)
            }
            ApiError::InvalidLink => tracing::warn!("{}", self),
            ApiError::Config(_) | ApiError::Upstream(_) => tracing::error!("{}", self),
        }
    }

    fn retry_after(&self) -> Option<HeaderValue> {
        match self {
            ApiError::RateLimited {
                retry_after_secs, ..
            } => HeaderValue::from_str(&retry_after_secs.to_string()).ok(),
            _ => None,
        }
    }

    /// Render as an HTML page, for browser-facing routes.
    pub fn into_html(self, pages: &PageRenderer) -> Response {
        self.log();

        let page = match self {
            ApiError::Validation(_) | ApiError::InvalidLink => MessagePage::invalid_link(),
            _ => MessagePage::server_error(),
        };

        match pages.message(&page) {
            Ok(html) => (self.status(), Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, self.user_message()).into_response()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let mut response =
            (self.status(), Json(json!({ "error": self.user_message() }))).into_response();

        if let Some(value) = self.retry_after() {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }

        response
    }
}
