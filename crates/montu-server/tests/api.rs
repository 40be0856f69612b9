//! End-to-end tests for the newsletter endpoints over a real socket.

use std::path::Path;
use std::sync::Arc;

use montu_newsletter::{
    ContactList, HashAuthority, MemoryContacts, ResendApi, ResendContacts, UnsubscribeSecret,
};
use montu_server::error::messages;
use montu_server::{router, AppState, SiteServerConfig};
use pretty_assertions::assert_eq;
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

const SECRET: &str = "s";

async fn spawn_app(
    secret: Option<&str>,
    contacts: Arc<dyn ContactList>,
    dist: Option<&Path>,
) -> String {
    let hash = HashAuthority::new(secret.and_then(UnsubscribeSecret::new));
    let state = AppState::new(hash, contacts, &SiteServerConfig::default());
    let app = router(state, dist);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn token(email: &str) -> String {
    HashAuthority::new(UnsubscribeSecret::new(SECRET))
        .generate_token(email)
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn valid_link_shows_confirmation_page() {
    let base = spawn_app(Some(SECRET), Arc::new(MemoryContacts::new()), None).await;
    let hash = token("a@b.com");

    let response = reqwest::Client::new()
        .get(format!("{}/api/unsubscribe", base))
        .query(&[("email", "a@b.com"), ("hash", hash.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains(&format!(r#"name="hash" value="{}""#, hash)));
    assert!(body.contains("<strong>a@b.com</strong>"));
}

#[tokio::test]
async fn wrong_hash_is_forbidden() {
    let base = spawn_app(Some(SECRET), Arc::new(MemoryContacts::new()), None).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/unsubscribe", base))
        .query(&[("email", "a@b.com"), ("hash", "0000000000000000")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.text().await.unwrap().contains("ভুল লিংক"));
}

#[tokio::test]
async fn incomplete_link_is_bad_request() {
    let base = spawn_app(Some(SECRET), Arc::new(MemoryContacts::new()), None).await;
    let client = reqwest::Client::new();

    for query in [
        vec![],
        vec![("email", "a@b.com")],
        vec![("hash", "0000000000000000")],
        vec![("email", ""), ("hash", "0000000000000000")],
    ] {
        let response = client
            .get(format!("{}/api/unsubscribe", base))
            .query(&query)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {:?}", query);
    }
}

#[tokio::test]
async fn missing_secret_is_a_server_error() {
    let base = spawn_app(None, Arc::new(MemoryContacts::new()), None).await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/unsubscribe", base))
        .query(&[("email", "a@b.com"), ("hash", "0000000000000000")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await.unwrap();
    assert!(body.contains("সার্ভার এরর"));
    assert!(!body.contains("UNSUBSCRIBE_SECRET"));
}

#[tokio::test]
async fn one_click_unsubscribe_reads_link_parameters() {
    let contacts = Arc::new(MemoryContacts::with_emails(["a@b.com", "c@d.com"]));
    let base = spawn_app(Some(SECRET), contacts.clone(), None).await;
    let hash = token("a@b.com");

    let response = reqwest::Client::new()
        .post(format!("{}/api/unsubscribe", base))
        .query(&[("email", "a@b.com"), ("hash", hash.as_str())])
        .form(&[("List-Unsubscribe", "One-Click")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": true }));
    assert!(!contacts.contains("a@b.com"));
    assert!(contacts.contains("c@d.com"));
}

#[tokio::test]
async fn confirmation_form_returns_success_page_for_browsers() {
    let contacts = Arc::new(MemoryContacts::with_emails(["a@b.com"]));
    let base = spawn_app(Some(SECRET), contacts.clone(), None).await;
    let hash = token("a@b.com");

    let response = reqwest::Client::new()
        .post(format!("{}/api/unsubscribe", base))
        .header(header::ACCEPT, "text/html,application/xhtml+xml")
        .form(&[("email", "a@b.com"), ("hash", hash.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("আনসাবস্ক্রাইব সফল হয়েছে"));
    assert!(contacts.is_empty());
}

#[tokio::test]
async fn unsubscribing_unknown_contact_succeeds() {
    let base = spawn_app(Some(SECRET), Arc::new(MemoryContacts::new()), None).await;
    let hash = token("gone@b.com");

    let response = reqwest::Client::new()
        .post(format!("{}/api/unsubscribe", base))
        .form(&[("email", "gone@b.com"), ("hash", hash.as_str())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn forged_removal_is_rejected_with_json() {
    let contacts = Arc::new(MemoryContacts::with_emails(["a@b.com"]));
    let base = spawn_app(Some(SECRET), contacts.clone(), None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/unsubscribe", base))
        .form(&[("email", "a@b.com"), ("hash", "0000000000000000")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": messages::LINK_INVALID }));
    assert!(contacts.contains("a@b.com"));
}

#[tokio::test]
async fn subscribe_adds_contact_from_form_or_json() {
    let contacts = Arc::new(MemoryContacts::new());
    let base = spawn_app(Some(SECRET), contacts.clone(), None).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/subscribe", base))
        .form(&[("email", "form@b.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .post(format!("{}/api/subscribe", base))
        .header("x-forwarded-for", "10.0.0.2")
        .json(&json!({ "email": "json@b.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": true }));

    assert!(contacts.contains("form@b.com"));
    assert!(contacts.contains("json@b.com"));
}

#[tokio::test]
async fn subscribe_validates_email() {
    let base = spawn_app(Some(SECRET), Arc::new(MemoryContacts::new()), None).await;
    let client = reqwest::Client::new();

    for (email, message) in [
        ("", messages::EMAIL_REQUIRED),
        ("   ", messages::EMAIL_REQUIRED),
        ("not-an-email", messages::EMAIL_INVALID),
    ] {
        let response = client
            .post(format!("{}/api/subscribe", base))
            .form(&[("email", email)])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "error": message }));
    }
}

#[tokio::test]
async fn fourth_subscribe_from_same_client_is_rate_limited() {
    let base = spawn_app(Some(SECRET), Arc::new(MemoryContacts::new()), None).await;
    let client = reqwest::Client::new();

    let subscribe = |ip: &'static str, email: &'static str| {
        client
            .post(format!("{}/api/subscribe", base))
            .header("x-forwarded-for", ip)
            .form(&[("email", email)])
            .send()
    };

    for email in ["1@b.com", "2@b.com", "3@b.com"] {
        let response = subscribe("203.0.113.7", email).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = subscribe("203.0.113.7", "4@b.com").await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 15 * 60);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("15 মিনিট"));

    let response = subscribe("198.51.100.1", "5@b.com").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn subscribe_without_audience_is_a_server_error() {
    let contacts = ResendContacts::new(ResendApi::new(None), None);
    let base = spawn_app(Some(SECRET), Arc::new(contacts), None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/subscribe", base))
        .form(&[("email", "a@b.com")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": messages::SERVER_CONFIG }));
}

#[tokio::test]
async fn other_paths_fall_back_to_static_files() {
    let dist = tempfile::tempdir().unwrap();
    std::fs::write(dist.path().join("index.html"), "<h1>book</h1>").unwrap();

    let base = spawn_app(
        Some(SECRET),
        Arc::new(MemoryContacts::new()),
        Some(dist.path()),
    )
    .await;

    let response = reqwest::get(format!("{}/index.html", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<h1>book</h1>");

    let response = reqwest::get(format!("{}/missing.html", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
