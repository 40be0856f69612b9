//! Unsubscribe confirmation page and one-click removal.

use axum::{
    extract::{FromRequest, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{messages, ApiError};
use crate::pages::MessagePage;
use crate::server::AppState;

/// `email` and `hash` as they arrive in a link or form.
#[derive(Debug, Default, Deserialize)]
pub struct UnsubscribeParams {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

impl UnsubscribeParams {
    /// Fill missing fields from `other`.
    fn or(self, other: UnsubscribeParams) -> Self {
        Self {
            email: non_empty(self.email).or(non_empty(other.email)),
            hash: non_empty(self.hash).or(non_empty(other.hash)),
        }
    }

    /// Both fields, if present and non-empty.
    fn into_parts(self) -> Option<(String, String)> {
        Some((non_empty(self.email)?, non_empty(self.hash)?))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Check a link against the token authority.
fn verify(state: &AppState, params: UnsubscribeParams) -> Result<(String, String), ApiError> {
    let (email, hash) = params
        .into_parts()
        .ok_or(ApiError::Validation(messages::LINK_INCOMPLETE))?;

    state.hash.ensure_configured()?;

    if !state.hash.verify_token(&email, &hash) {
        return Err(ApiError::InvalidLink);
    }

    Ok((email, hash))
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"))
}

/// `GET /api/unsubscribe`: show the confirmation page for a verified link.
pub async fn show(
    State(state): State<AppState>,
    Query(params): Query<UnsubscribeParams>,
) -> Response {
    let (email, hash) = match verify(&state, params) {
        Ok(parts) => parts,
        Err(e) => return e.into_html(&state.pages),
    };

    match state.pages.confirm(&email, &hash) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render confirmation page: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `POST /api/unsubscribe`: remove the contact.
///
/// Parameters are read from the form body, falling back to the query
/// string so that mail clients performing a one-click unsubscribe
/// (`List-Unsubscribe=One-Click` body, link parameters in the URL) work.
pub async fn confirm(State(state): State<AppState>, request: Request) -> Response {
    let html = wants_html(request.headers());

    let query = Query::<UnsubscribeParams>::try_from_uri(request.uri())
        .map(|Query(params)| params)
        .unwrap_or_default();

    let form = match Form::<UnsubscribeParams>::from_request(request, &()).await {
        Ok(Form(params)) => params,
        Err(e) => {
            tracing::debug!("Unsubscribe body not readable as form: {}", e.body_text());
            UnsubscribeParams::default()
        }
    };

    match remove(&state, form.or(query)).await {
        Ok(()) if html => match state.pages.message(&MessagePage::unsubscribed()) {
            Ok(page) => Html(page).into_response(),
            Err(e) => {
                tracing::error!("Failed to render unsubscribed page: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) if html => e.into_html(&state.pages),
        Err(e) => e.into_response(),
    }
}

async fn remove(state: &AppState, params: UnsubscribeParams) -> Result<(), ApiError> {
    let (email, _) = verify(state, params)?;

    if state.contacts.remove(&email).await? {
        tracing::info!("Contact unsubscribed");
    } else {
        tracing::info!("Unsubscribe for unknown contact treated as success");
    }

    Ok(())
}
