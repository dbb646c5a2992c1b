//! Server-side login sessions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{SessionId, UserId};

/// Fixed lifetime of a session; there is no sliding renewal.
pub const SESSION_TTL_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, FromRow)]
/// Database representation of a session. Rows are never deleted; revocation
/// moves `expires_at` into the past.
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    /// Absolute expiry as unix seconds.
    pub expires_at: i64,
}

impl Session {
    /// A session is active only while `now` is strictly before its expiry.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now.timestamp()
    }
}
