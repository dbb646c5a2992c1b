use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    models::session::Session,
    types::{SessionId, UserId},
};

/// Expiry written into a revoked session: one day before `now`.
fn revoked_expiry(now: DateTime<Utc>) -> i64 {
    (now - Duration::days(1)).timestamp()
}

pub async fn insert_session(
    conn: &mut SqliteConnection,
    session_id: SessionId,
    user_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO sessions (id, expires_at, user_id) VALUES (?, ?, ?)")
        .bind(session_id)
        .bind(expires_at.timestamp())
        .bind(user_id)
        .execute(conn)
        .await
        .map(|_| ())
}

/// Soft-expires every session of the user that has not yet expired at `now`.
pub async fn expire_active_sessions_for_user(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET expires_at = ?
        WHERE user_id = ? AND expires_at >= ?
        "#,
    )
    .bind(revoked_expiry(now))
    .bind(user_id)
    .bind(now.timestamp())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Soft-expires a single session. Returns `false` if the token is unknown or
/// already expired.
pub async fn expire_session(
    pool: &SqlitePool,
    session_id: SessionId,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET expires_at = ?
        WHERE id = ? AND expires_at > ?
        "#,
    )
    .bind(revoked_expiry(now))
    .bind(session_id)
    .bind(now.timestamp())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Owner of the session if it is still valid at `now`. A session whose
/// expiry equals `now` is already expired.
pub async fn find_session_owner(
    pool: &SqlitePool,
    session_id: SessionId,
    now: DateTime<Utc>,
) -> Result<Option<UserId>, sqlx::Error> {
    sqlx::query_scalar::<_, UserId>("SELECT user_id FROM sessions WHERE id = ? AND expires_at > ?")
        .bind(session_id)
        .bind(now.timestamp())
        .fetch_optional(pool)
        .await
}

pub async fn list_sessions_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        r#"
        SELECT id, user_id, expires_at
        FROM sessions
        WHERE user_id = ?
        ORDER BY expires_at DESC, id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
