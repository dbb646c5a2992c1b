//! Every query here filters on the owning user; there is no unscoped access
//! to the todos table.

use sqlx::SqlitePool;

use crate::{models::todo::Todo, types::ItemId};

pub async fn list_todos_for_owner(
    pool: &SqlitePool,
    owner_id: &str,
) -> Result<Vec<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>(
        r#"
        SELECT id, title, description, done
        FROM todos
        WHERE user_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

pub async fn insert_todo(
    pool: &SqlitePool,
    owner_id: &str,
    title: &str,
    description: &str,
) -> Result<ItemId, sqlx::Error> {
    let result =
        sqlx::query("INSERT INTO todos (title, description, done, user_id) VALUES (?, ?, 0, ?)")
            .bind(title)
            .bind(description)
            .bind(owner_id)
            .execute(pool)
            .await?;
    Ok(result.last_insert_rowid())
}

/// Returns the number of rows changed: zero when the id does not exist or
/// belongs to another user.
pub async fn update_todo_for_owner(
    pool: &SqlitePool,
    todo_id: ItemId,
    owner_id: &str,
    title: &str,
    description: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE todos
        SET title = ?, description = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(todo_id)
    .bind(owner_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Flips `done` in a single statement so concurrent toggles cannot lose an
/// update.
pub async fn toggle_todo_done_for_owner(
    pool: &SqlitePool,
    todo_id: ItemId,
    owner_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE todos
        SET done = CASE done WHEN 0 THEN 1 ELSE 0 END
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(todo_id)
    .bind(owner_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
