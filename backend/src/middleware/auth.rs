use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    state::AppState,
    types::UserId,
};

/// The authenticated caller, inserted as a request extension by
/// [`require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
}

/// Guards every protected route: a request without a valid, unexpired
/// session is answered with 401 and never reaches the handler.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current_user = authenticate_request(&state, request.headers()).await?;
    request.extensions_mut().insert(current_user);
    Ok(next.run(request).await)
}

/// Resolves the session cookie to its owner: signature first, then the
/// session table.
pub async fn authenticate_request(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<CurrentUser, AppError> {
    let session_id = state.sessions.read_session_id(headers)?;
    let user_id = state.store.validate_session(session_id).await.map_err(|err| {
        tracing::debug!(error = %err, "Session lookup rejected request");
        AppError::from(err)
    })?;
    Ok(CurrentUser { id: user_id })
}
