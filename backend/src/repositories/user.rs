//! Repository functions for users.

use sqlx::{SqliteConnection, SqlitePool};

use crate::models::user::{User, VerifiedIdentity};

/// Inserts the user unless a row with the same id already exists. Profile
/// fields of an existing user are left untouched.
///
/// Returns `true` when a new row was created.
pub async fn insert_user_if_absent(
    conn: &mut SqliteConnection,
    identity: &VerifiedIdentity,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, avatar_url, access_token, expires_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(&identity.id)
    .bind(&identity.name)
    .bind(&identity.email)
    .bind(&identity.avatar_url)
    .bind(&identity.access_token)
    .bind(identity.expires_at.map(|at| at.timestamp()))
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_user_by_id(pool: &SqlitePool, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, name, email, avatar_url, access_token, expires_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
