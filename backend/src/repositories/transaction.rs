//! Transaction management utilities for repositories.

use sqlx::{Sqlite, SqlitePool, Transaction};

pub type SqliteTransaction<'c> = Transaction<'c, Sqlite>;

/// Begin a new database transaction.
///
/// SQLite admits a single writer; the first write statement inside the
/// transaction takes the database lock and holds it until commit or rollback.
/// Dropping the handle without committing rolls back.
pub async fn begin_transaction(db: &SqlitePool) -> Result<SqliteTransaction<'static>, sqlx::Error> {
    db.begin().await
}

/// Commit a transaction.
pub async fn commit_transaction(tx: SqliteTransaction<'_>) -> Result<(), sqlx::Error> {
    tx.commit().await
}

