//! Users who have signed in through the identity provider at least once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
/// Database representation of a user, a profile snapshot taken at first login.
pub struct User {
    /// Stable id issued by the identity provider.
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    /// Provider access token; never serialized to clients.
    #[serde(skip_serializing)]
    pub access_token: String,
    /// Provider token expiry as unix seconds, when the provider reports one.
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Identity returned by the OAuth provider once the handshake completes.
pub struct VerifiedIdentity {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}
