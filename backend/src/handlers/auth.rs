use axum::{
    extract::{Path, Query, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::auth::authenticate_request,
    services::identity::IdentityError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Starts the OAuth round trip: pins a fresh `state` to the browser and
/// redirects to the provider.
pub async fn begin_login(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Response, AppError> {
    let (oauth_state, state_cookie) = state.sessions.issue_oauth_state();
    let url = state
        .identity
        .authorize_url(&provider, &oauth_state)
        .map_err(identity_error)?;

    Ok((
        AppendHeaders([(SET_COOKIE, state_cookie)]),
        Redirect::temporary(url.as_str()),
    )
        .into_response())
}

/// Finishes the OAuth round trip, records the login and hands the browser
/// its session cookie.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(error) = params.error.as_deref() {
        tracing::warn!(%provider, error, "Identity provider reported an error");
        return Err(AppError::Unauthorized("Authentication failed".into()));
    }

    let oauth_state = params
        .state
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Missing OAuth state".into()))?;
    state.sessions.verify_oauth_state(&headers, oauth_state)?;

    let code = params
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::BadRequest("Authorization code is required".into()))?;

    let identity = state
        .identity
        .complete(&provider, code)
        .await
        .map_err(identity_error)?;

    let (session_id, session_cookie) = state.sessions.issue_session();
    state
        .store
        .upsert_user_and_issue_session(&identity, session_id)
        .await?;
    tracing::info!(%provider, user_id = %identity.id, "User signed in");

    let target = format!("{}/", state.config.frontend_url);
    Ok((
        StatusCode::FOUND,
        AppendHeaders([
            (SET_COOKIE, session_cookie),
            (SET_COOKIE, state.sessions.clear_oauth_state_cookie()),
        ]),
        [(LOCATION, target)],
    )
        .into_response())
}

/// Revokes the session server-side when the cookie still verifies, then
/// clears the cookie. Safe to call on an already signed-out client.
pub async fn logout(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Response {
    match state.sessions.read_session_id(&headers) {
        Ok(session_id) => {
            if let Err(err) = state.store.revoke_session(session_id).await {
                tracing::error!(error = %err, "Failed to revoke session on logout");
            }
        }
        Err(err) => tracing::debug!(error = %err, "Logout without a valid session cookie"),
    }
    tracing::info!(%provider, "User signed out");

    let target = format!("{}/login", state.config.frontend_url);
    (
        StatusCode::TEMPORARY_REDIRECT,
        AppendHeaders([(SET_COOKIE, state.sessions.revoke_cookie())]),
        [(LOCATION, target)],
    )
        .into_response()
}

/// Reports who the session cookie belongs to. Never answers 401: an absent
/// or invalid session yields `{}`.
pub async fn validate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    match authenticate_request(&state, &headers).await {
        Ok(user) => Ok(Json(json!({ "userId": user.id }))),
        Err(AppError::Unauthorized(_)) => Ok(Json(json!({}))),
        Err(err) => Err(err),
    }
}

fn identity_error(err: IdentityError) -> AppError {
    match err {
        IdentityError::UnknownProvider(provider) => {
            AppError::NotFound(format!("Unknown provider: {}", provider))
        }
        IdentityError::Rejected(reason) => {
            tracing::warn!(%reason, "Identity provider rejected login");
            AppError::Unauthorized("Authentication failed".into())
        }
        other => AppError::InternalServerError(other.into()),
    }
}
