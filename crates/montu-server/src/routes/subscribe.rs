//! Newsletter subscribe endpoint.

use axum::{
    extract::{FromRequest, Request, State},
    http::header,
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client_id::client_identifier;
use crate::error::{messages, ApiError};
use crate::server::AppState;

/// Subscribe form body.
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: Option<String>,
}

/// Read the form from a urlencoded or JSON body.
async fn read_form(request: Request) -> SubscribeForm {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let parsed = if is_json {
        Json::<SubscribeForm>::from_request(request, &())
            .await
            .map(|Json(form)| form)
            .map_err(|e| e.body_text())
    } else {
        Form::<SubscribeForm>::from_request(request, &())
            .await
            .map(|Form(form)| form)
            .map_err(|e| e.body_text())
    };

    parsed.unwrap_or_else(|e| {
        tracing::debug!("Unreadable subscribe body: {}", e);
        SubscribeForm::default()
    })
}

/// `POST /api/subscribe`: add an address to the contact list.
pub async fn subscribe(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let identifier = client_identifier(request.headers());
    let form = read_form(request).await;

    let email = form.email.as_deref().map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::Validation(messages::EMAIL_REQUIRED));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation(messages::EMAIL_INVALID));
    }

    let decision = state.limiter.check(&identifier, &state.subscribe_policy);
    if !decision.allowed {
        let now = state.limiter.now();
        return Err(ApiError::RateLimited {
            retry_after_secs: decision.retry_after(now).as_secs().max(1),
            retry_after_minutes: decision.retry_after_minutes(now),
        });
    }

    state.contacts.add(email).await?;
    tracing::info!("New newsletter subscription ({} left for client)", decision.remaining);

    Ok(Json(json!({ "success": true })))
}
