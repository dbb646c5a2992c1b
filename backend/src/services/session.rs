//! Session cookie codec.
//!
//! The session token never lives in server memory: it is minted here, signed
//! with HMAC-SHA256 and handed to the client in an `HttpOnly` cookie. Lookups
//! against the session table belong to the persistence service.
//!
//! Cookie value layout: `base64url(value "|" issued_at) "." base64url(mac)`,
//! where the MAC covers `name "=" payload` so a value signed for one cookie
//! cannot be replayed under another name.

use std::time::Duration;

use axum::http::HeaderMap;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::Config,
    models::session::SESSION_TTL_DAYS,
    types::SessionId,
    utils::cookies::{
        build_clear_cookie, build_cookie, find_request_cookie, CookieOptions, SameSite,
        COOKIE_PATH, OAUTH_STATE_COOKIE_NAME, SESSION_COOKIE_NAME,
    },
};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_MAX_AGE: Duration = Duration::from_secs(SESSION_TTL_DAYS as u64 * 86_400);
pub const OAUTH_STATE_MAX_AGE: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("session cookie is missing")]
    Missing,
    #[error("session cookie signature is invalid")]
    BadSignature,
    #[error("session cookie value is malformed")]
    Malformed,
    #[error("session cookie has expired")]
    Expired,
}

#[derive(Clone)]
pub struct SessionManager {
    mac: HmacSha256,
    secure: bool,
}

impl SessionManager {
    pub fn new(secret: &[u8], secure: bool) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| anyhow::anyhow!("invalid session signing key"))?;
        Ok(Self { mac, secure })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.session_secret, config.cookie_secure)
    }

    fn session_options(&self) -> CookieOptions {
        // Frontend and API are served from different origins.
        CookieOptions {
            secure: self.secure,
            same_site: SameSite::None,
        }
    }

    fn state_options(&self) -> CookieOptions {
        CookieOptions {
            secure: self.secure,
            same_site: SameSite::Lax,
        }
    }

    /// Mints a new session token and the `Set-Cookie` value carrying it.
    pub fn issue_session(&self) -> (SessionId, String) {
        self.issue_session_at(Utc::now())
    }

    pub fn issue_session_at(&self, now: DateTime<Utc>) -> (SessionId, String) {
        let session_id = SessionId::new();
        let value = self.encode(SESSION_COOKIE_NAME, &session_id.to_string(), now);
        let cookie = build_cookie(
            SESSION_COOKIE_NAME,
            &value,
            SESSION_MAX_AGE,
            COOKIE_PATH,
            self.session_options(),
        );
        (session_id, cookie)
    }

    pub fn read_session_id(&self, headers: &HeaderMap) -> Result<SessionId, AuthError> {
        self.read_session_id_at(headers, Utc::now())
    }

    /// Recovers the token from the request cookie. Expiry against the
    /// session table is not checked here.
    pub fn read_session_id_at(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<SessionId, AuthError> {
        let raw = find_request_cookie(headers, SESSION_COOKIE_NAME).ok_or(AuthError::Missing)?;
        let value = self.decode(SESSION_COOKIE_NAME, &raw, SESSION_MAX_AGE, now)?;
        value.parse().map_err(|_| AuthError::Malformed)
    }

    /// `Set-Cookie` value that discards the client's session. Always succeeds,
    /// so repeated logouts are harmless.
    pub fn revoke_cookie(&self) -> String {
        build_clear_cookie(SESSION_COOKIE_NAME, COOKIE_PATH, self.session_options())
    }

    /// Mints the anti-forgery `state` for an OAuth round trip together with
    /// the cookie that pins it to this browser.
    pub fn issue_oauth_state(&self) -> (String, String) {
        let state = Uuid::new_v4().simple().to_string();
        let value = self.encode(OAUTH_STATE_COOKIE_NAME, &state, Utc::now());
        let cookie = build_cookie(
            OAUTH_STATE_COOKIE_NAME,
            &value,
            OAUTH_STATE_MAX_AGE,
            COOKIE_PATH,
            self.state_options(),
        );
        (state, cookie)
    }

    pub fn verify_oauth_state(&self, headers: &HeaderMap, state: &str) -> Result<(), AuthError> {
        let raw =
            find_request_cookie(headers, OAUTH_STATE_COOKIE_NAME).ok_or(AuthError::Missing)?;
        let expected = self.decode(OAUTH_STATE_COOKIE_NAME, &raw, OAUTH_STATE_MAX_AGE, Utc::now())?;
        if expected == state {
            Ok(())
        } else {
            Err(AuthError::BadSignature)
        }
    }

    pub fn clear_oauth_state_cookie(&self) -> String {
        build_clear_cookie(OAUTH_STATE_COOKIE_NAME, COOKIE_PATH, self.state_options())
    }

    fn signature(&self, name: &str, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(name.as_bytes());
        mac.update(b"=");
        mac.update(payload.as_bytes());
        mac
    }

    fn encode(&self, name: &str, value: &str, issued_at: DateTime<Utc>) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!("{}|{}", value, issued_at.timestamp()));
        let tag = self.signature(name, &payload).finalize().into_bytes();
        format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(tag))
    }

    fn decode(
        &self,
        name: &str,
        raw: &str,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let (payload, tag) = raw.split_once('.').ok_or(AuthError::Malformed)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| AuthError::BadSignature)?;
        self.signature(name, payload)
            .verify_slice(&tag)
            .map_err(|_| AuthError::BadSignature)?;

        let decoded = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
        let (value, issued_at) = decoded.rsplit_once('|').ok_or(AuthError::Malformed)?;
        let issued_at: i64 = issued_at.parse().map_err(|_| AuthError::Malformed)?;

        if now.timestamp() - issued_at > max_age.as_secs() as i64 {
            return Err(AuthError::Expired);
        }
        Ok(value.to_string())
    }
}
