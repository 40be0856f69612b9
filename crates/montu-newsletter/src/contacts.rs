//! Contact-list backends for newsletter subscribers.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::config::NewsletterSecrets;
use crate::error::{ConfigError, ContactError};
use crate::resend::ResendApi;

/// Boxed future returned by [`ContactList`] operations.
pub type ContactFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ContactError>> + Send + 'a>>;

/// A subscriber in the contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Backend-assigned id
    pub id: String,
    /// Subscriber address
    pub email: String,
}

/// Storage for newsletter subscribers.
pub trait ContactList: Send + Sync {
    /// Add `email` to the list.
    fn add<'a>(&'a self, email: &'a str) -> ContactFuture<'a, ()>;

    /// Remove `email` from the list. Resolves to `false` when it was not there.
    fn remove<'a>(&'a self, email: &'a str) -> ContactFuture<'a, bool>;

    /// All contacts currently on the list.
    fn list(&self) -> ContactFuture<'_, Vec<Contact>>;
}

#[derive(Debug, Serialize)]
struct CreateContact<'a> {
    email: &'a str,
    unsubscribed: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedContact {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ContactPage {
    data: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
struct DeletedContact {
    #[serde(default)]
    deleted: bool,
}

/// Contact list stored in a Resend audience.
#[derive(Debug, Clone)]
pub struct ResendContacts {
    api: ResendApi,
    audience_id: Option<String>,
}

impl ResendContacts {
    /// Create a client for `audience_id` using `api`.
    pub fn new(api: ResendApi, audience_id: Option<String>) -> Self {
        Self { api, audience_id }
    }

    /// Create a client from environment secrets against the public API.
    pub fn from_secrets(secrets: &NewsletterSecrets) -> Self {
        Self::new(
            ResendApi::new(secrets.api_key.clone()),
            secrets.audience_id.clone(),
        )
    }

    fn contacts_path(&self) -> Result<String, ConfigError> {
        let audience = self
            .audience_id
            .as_deref()
            .ok_or(ConfigError::MissingAudience)?;
        Ok(format!("/audiences/{}/contacts", audience))
    }

    async fn add_contact(&self, email: &str) -> Result<(), ContactError> {
        let path = self.contacts_path()?;
        let request = self.api.request(Method::POST, &path)?.json(&CreateContact {
            email,
            unsubscribed: false,
        });

        let created: CreatedContact = self.api.send(request).await?;
        tracing::info!("Added contact {}", created.id);
        Ok(())
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, ContactError> {
        let path = self.contacts_path()?;
        let request = self.api.request(Method::GET, &path)?;

        let page: ContactPage = self.api.send(request).await?;
        Ok(page.data)
    }

    async fn remove_contact(&self, email: &str) -> Result<bool, ContactError> {
        let contacts = self.list_contacts().await?;
        let Some(contact) = contacts.into_iter().find(|c| c.email == email) else {
            tracing::debug!("No contact to remove");
            return Ok(false);
        };

        let path = format!("{}/{}", self.contacts_path()?, contact.id);
        let request = self.api.request(Method::DELETE, &path)?;

        let deleted: DeletedContact = self.api.send(request).await?;
        tracing::info!("Removed contact {}", contact.id);
        Ok(deleted.deleted)
    }
}

impl ContactList for ResendContacts {
    fn add<'a>(&'a self, email: &'a str) -> ContactFuture<'a, ()> {
        Box::pin(self.add_contact(email))
    }

    fn remove<'a>(&'a self, email: &'a str) -> ContactFuture<'a, bool> {
        Box::pin(self.remove_contact(email))
    }

    fn list(&self) -> ContactFuture<'_, Vec<Contact>> {
        Box::pin(self.list_contacts())
    }
}

/// Contact list kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryContacts {
    contacts: Mutex<BTreeMap<String, Contact>>,
    next_id: AtomicU64,
}

impl MemoryContacts {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list holding `emails`.
    pub fn with_emails<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = Self::new();
        for email in emails {
            list.insert(email.into());
        }
        list
    }

    /// Whether `email` is on the list.
    pub fn contains(&self, email: &str) -> bool {
        self.contacts.lock().contains_key(email)
    }

    /// Number of contacts.
    pub fn len(&self) -> usize {
        self.contacts.lock().len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.contacts.lock().is_empty()
    }

    fn insert(&self, email: String) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.contacts.lock().entry(email.clone()).or_insert(Contact {
            id: format!("contact-{}", id),
            email,
        });
    }
}

impl ContactList for MemoryContacts {
    fn add<'a>(&'a self, email: &'a str) -> ContactFuture<'a, ()> {
        Box::pin(async move {
            self.insert(email.to_string());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, email: &'a str) -> ContactFuture<'a, bool> {
        Box::pin(async move { Ok(self.contacts.lock().remove(email).is_some()) })
    }

    fn list(&self) -> ContactFuture<'_, Vec<Contact>> {
        Box::pin(async move { Ok(self.contacts.lock().values().cloned().collect()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKey;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client(server: &MockServer) -> ResendContacts {
        ResendContacts::new(
            ResendApi::with_base_url(server.base_url(), ApiKey::new("re_test")),
            Some("aud_1".to_string()),
        )
    }

    #[tokio::test]
    async fn memory_contacts_add_and_remove() {
        let contacts = MemoryContacts::new();

        contacts.add("a@b.com").await.unwrap();
        contacts.add("a@b.com").await.unwrap();
        assert_eq!(contacts.len(), 1);

        assert!(contacts.remove("a@b.com").await.unwrap());
        assert!(!contacts.remove("a@b.com").await.unwrap());
        assert!(contacts.is_empty());
    }

    #[tokio::test]
    async fn add_posts_contact_to_audience() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/audiences/aud_1/contacts")
                    .header("authorization", "Bearer re_test")
                    .json_body(json!({ "email": "a@b.com", "unsubscribed": false }));
                then.status(200)
                    .json_body(json!({ "object": "contact", "id": "c_1" }));
            })
            .await;

        client(&server).add("a@b.com").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remove_deletes_matching_contact() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/audiences/aud_1/contacts");
                then.status(200).json_body(json!({
                    "object": "list",
                    "data": [
                        { "id": "c_1", "email": "other@b.com", "unsubscribed": false },
                        { "id": "c_2", "email": "a@b.com", "unsubscribed": false }
                    ]
                }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/audiences/aud_1/contacts/c_2");
                then.status(200)
                    .json_body(json!({ "object": "contact", "contact": "c_2", "deleted": true }));
            })
            .await;

        assert!(client(&server).remove("a@b.com").await.unwrap());

        list.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn remove_of_unknown_contact_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/audiences/aud_1/contacts");
                then.status(200)
                    .json_body(json!({ "object": "list", "data": [] }));
            })
            .await;

        assert!(!client(&server).remove("a@b.com").await.unwrap());
    }

    #[tokio::test]
    async fn upstream_errors_carry_status_and_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/audiences/aud_1/contacts");
                then.status(422).json_body(json!({
                    "statusCode": 422,
                    "message": "Invalid email",
                    "name": "validation_error"
                }));
            })
            .await;

        let err = client(&server).add("nope").await.unwrap_err();

        match err {
            ContactError::Api { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Invalid email");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_audience_is_a_configuration_error() {
        let contacts = ResendContacts::new(ResendApi::new(ApiKey::new("re_test")), None);

        let err = contacts.add("a@b.com").await.unwrap_err();

        assert!(err.is_config());
        assert!(matches!(
            err,
            ContactError::NotConfigured(ConfigError::MissingAudience)
        ));
    }

    #[tokio::test]
    async fn missing_api_key_is_a_configuration_error() {
        let contacts = ResendContacts::new(ResendApi::new(None), Some("aud".to_string()));

        let err = contacts.list().await.unwrap_err();

        assert!(matches!(
            err,
            ContactError::NotConfigured(ConfigError::MissingApiKey)
        ));
    }
}
