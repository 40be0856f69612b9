//! Outgoing email delivery.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::MailError;
use crate::resend::ResendApi;

/// Boxed future returned by [`Mailer::send`].
pub type MailFuture<'a> = Pin<Box<dyn Future<Output = Result<String, MailError>> + Send + 'a>>;

/// A single rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    /// Sender, e.g. `Name <addr@host>`
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Extra MIME headers
    pub headers: BTreeMap<String, String>,
}

/// Headers that let mail clients offer an unsubscribe button.
///
/// `List-Unsubscribe` carries both the HTTPS link and a mailto fallback
/// (RFC 2369); `List-Unsubscribe-Post` enables one-click removal (RFC 8058).
pub fn unsubscribe_headers(
    unsubscribe_url: &str,
    unsubscribe_mailto: &str,
    list_id: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "List-Unsubscribe".to_string(),
            format!(
                "<{}>, <mailto:{}?subject=Unsubscribe>",
                unsubscribe_url, unsubscribe_mailto
            ),
        ),
        (
            "List-Unsubscribe-Post".to_string(),
            "List-Unsubscribe=One-Click".to_string(),
        ),
        ("Precedence".to_string(), "bulk".to_string()),
        ("List-Id".to_string(), list_id.to_string()),
    ])
}

/// Delivers [`OutgoingEmail`]s. Resolves to the provider's message id.
pub trait Mailer: Send + Sync {
    /// Send one message.
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> MailFuture<'a>;
}

#[derive(Debug, Deserialize)]
struct SentEmail {
    id: String,
}

/// Mailer backed by the Resend `POST /emails` endpoint.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    api: ResendApi,
}

impl ResendMailer {
    /// Create a mailer using `api`.
    pub fn new(api: ResendApi) -> Self {
        Self { api }
    }

    async fn send_email(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        let request = self.api.request(Method::POST, "/emails")?.json(email);

        let sent: SentEmail = self.api.send(request).await?;
        Ok(sent.id)
    }
}

impl Mailer for ResendMailer {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> MailFuture<'a> {
        Box::pin(self.send_email(email))
    }
}

/// Mailer that records messages instead of sending them.
///
/// Addresses listed in `reject` fail with an API error.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    reject: Vec<String>,
}

impl MemoryMailer {
    /// Create a mailer that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mailer that fails for the given recipients.
    pub fn rejecting<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: recipients.into_iter().map(Into::into).collect(),
        }
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }
}

impl Mailer for MemoryMailer {
    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> MailFuture<'a> {
        Box::pin(async move {
            if self.reject.iter().any(|r| r == &email.to) {
                return Err(MailError::Api {
                    status: 422,
                    message: format!("rejected recipient {}", email.to),
                });
            }

            let mut sent = self.sent.lock();
            sent.push(email.clone());
            Ok(format!("mem-{}", sent.len()))
        })
    }
}
