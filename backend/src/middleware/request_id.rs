//! Per-request correlation id.
//!
//! A caller-supplied `x-request-id` (or `x-correlation-id`) is reused only
//! when it is a short token of URL-safe characters; anything else is replaced
//! by a fresh UUID so client input never lands verbatim in the logs.

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
static CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

const MAX_INCOMING_LEN: usize = 64;

fn is_acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_INCOMING_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

fn incoming_id(headers: &HeaderMap) -> Option<HeaderValue> {
    [&REQUEST_ID, &CORRELATION_ID]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .find(|value| value.to_str().map(is_acceptable).unwrap_or(false))
        .cloned()
}

fn minted_id() -> HeaderValue {
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

/// Runs the rest of the stack inside a `request` span carrying the id, the
/// method and the path, and echoes the id on the response.
pub async fn request_id(req: Request, next: Next) -> Response {
    let id = incoming_id(req.headers()).unwrap_or_else(minted_id);

    let span = tracing::info_span!(
        "request",
        request_id = id.to_str().unwrap_or_default(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    let mut response = next.run(req).instrument(span).await;

    response.headers_mut().insert(REQUEST_ID.clone(), id);
    response
}
