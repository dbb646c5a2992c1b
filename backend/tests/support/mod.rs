#![allow(dead_code)]
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, Response},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use todo_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations},
    models::user::VerifiedIdentity,
    routes::build_router,
    services::{
        identity::{IdentityError, IdentityVerifier},
        persistence::Store,
    },
    state::AppState,
    types::SessionId,
};
use tower::ServiceExt;
use url::Url;

pub const TEST_SESSION_SECRET: &str = "a_secure_token_that_is_long_enough_123";

/// A migrated SQLite database living in its own temporary directory. The
/// directory is removed when the value is dropped.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}", dir.path().join("todo-test.db").display());
    let pool = create_pool(&url).await.expect("create pool");
    run_migrations(&pool).await.expect("run migrations");
    TestDb { pool, _dir: dir }
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "SESSION_SECRET" => Some(TEST_SESSION_SECRET.to_string()),
        "COOKIE_SECURE" => Some("false".to_string()),
        "FRONTEND_URL" => Some("http://localhost:3000".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub fn identity(id: &str) -> VerifiedIdentity {
    VerifiedIdentity {
        id: id.to_string(),
        name: format!("User {}", id),
        email: format!("{}@example.com", id),
        avatar_url: format!("https://avatars.example.com/{}", id),
        access_token: format!("token-{}", id),
        expires_at: None,
    }
}

/// Identity provider stand-in that accepts any code and returns a fixed
/// identity for the `github` provider.
pub struct StaticVerifier {
    pub identity: VerifiedIdentity,
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    fn authorize_url(&self, provider: &str, state: &str) -> Result<Url, IdentityError> {
        if provider != "github" {
            return Err(IdentityError::UnknownProvider(provider.to_string()));
        }
        Ok(Url::parse_with_params(
            "https://github.com/login/oauth/authorize",
            &[("state", state)],
        )?)
    }

    async fn complete(&self, provider: &str, _code: &str) -> Result<VerifiedIdentity, IdentityError> {
        if provider != "github" {
            return Err(IdentityError::UnknownProvider(provider.to_string()));
        }
        Ok(self.identity.clone())
    }
}

pub fn test_state(pool: SqlitePool) -> AppState {
    let verifier = Arc::new(StaticVerifier {
        identity: identity("octocat"),
    });
    AppState::from_pool(pool, verifier, test_config()).expect("app state")
}

pub fn test_router(state: AppState) -> Router {
    build_router(state)
}

/// Records a login for `user_id` and returns the `name=value` pair of the
/// issued session cookie.
pub async fn login(state: &AppState, user_id: &str) -> (SessionId, String) {
    let (session_id, set_cookie) = state.sessions.issue_session();
    state
        .store
        .upsert_user_and_issue_session(&identity(user_id), session_id)
        .await
        .expect("issue session");
    (session_id, cookie_pair(&set_cookie))
}

pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

pub fn set_cookie_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).expect("build request"))
        .await
        .expect("send request")
}

pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    raw_body: &'static str,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::from(raw_body)).expect("build request"))
        .await
        .expect("send request")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn store(pool: &SqlitePool) -> Store {
    Store::new(pool.clone())
}
