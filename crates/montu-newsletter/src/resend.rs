//! Shared transport for the Resend HTTP API.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ApiKey;
use crate::error::{ConfigError, ContactError, MailError};
use crate::RESEND_API_BASE;

/// Failure talking to Resend, before it is mapped to a caller's error type.
#[derive(Debug)]
pub(crate) enum ResendError {
    Transport(String),
    Api { status: u16, message: String },
    Decode(String),
}

impl From<ResendError> for ContactError {
    fn from(e: ResendError) -> Self {
        match e {
            ResendError::Transport(m) => ContactError::Transport(m),
            ResendError::Api { status, message } => ContactError::Api { status, message },
            ResendError::Decode(m) => ContactError::Decode(m),
        }
    }
}

impl From<ResendError> for MailError {
    fn from(e: ResendError) -> Self {
        match e {
            ResendError::Transport(m) => MailError::Transport(m),
            ResendError::Api { status, message } => MailError::Api { status, message },
            ResendError::Decode(m) => MailError::Decode(m),
        }
    }
}

/// Error body Resend returns on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Authenticated handle to the Resend API.
#[derive(Debug, Clone)]
pub struct ResendApi {
    client: Client,
    base_url: String,
    api_key: Option<ApiKey>,
}

impl ResendApi {
    /// Create a handle against the public API.
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self::with_base_url(RESEND_API_BASE, api_key)
    }

    /// Create a handle against another base URL, e.g. a mock server.
    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<ApiKey>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub(crate) fn api_key(&self) -> Result<&ApiKey, ConfigError> {
        self.api_key.as_ref().ok_or(ConfigError::MissingApiKey)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ConfigError> {
        let key = self.api_key()?;
        let url = format!("{}{}", self.base_url, path);

        Ok(self.client.request(method, url).bearer_auth(key.expose()))
    }

    /// Send `request` and decode a JSON body of type `T`.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ResendError> {
        let response = request
            .send()
            .await
            .map_err(|e| ResendError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResendError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ResendError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ResendError::Decode(e.to_string()))
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        })
}
