//! Persistence service: sole owner of the users, sessions and todos tables.
//!
//! Cross-row rules live here rather than in handlers: a login supersedes any
//! session still active for the user, and every item operation is scoped to
//! the caller's user id.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::{
    db::connection::DbPool,
    models::{session::SESSION_TTL_DAYS, todo::Todo, user::VerifiedIdentity},
    repositories::{session as session_repo, todo as todo_repo, transaction, user as user_repo},
    types::{ItemId, SessionId, UserId},
};

pub const HEALTH_PING_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unknown, expired and revoked sessions are deliberately indistinguishable.
    #[error("session not found")]
    NotFound,
    #[error("todo does not exist or belongs to another user")]
    NotFoundOrForbidden,
    #[error("store did not respond in time")]
    Unavailable,
    #[error(transparent)]
    Fault(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    pub open_connections: u32,
    pub in_use: u32,
    pub idle: u32,
    pub max_connections: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct Store {
    pool: DbPool,
    healthy: Arc<AtomicBool>,
}

impl Store {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    pub async fn upsert_user_and_issue_session(
        &self,
        identity: &VerifiedIdentity,
        session_id: SessionId,
    ) -> Result<(), StoreError> {
        self.upsert_user_and_issue_session_at(identity, session_id, Utc::now())
            .await
    }

    /// Records a login. The user row is created on first sight; otherwise
    /// every still-active session of the user is soft-expired before the new
    /// one is inserted. All of it commits or none of it does, and the user
    /// insert doubles as the write that takes SQLite's lock, so two logins of
    /// the same user cannot interleave.
    pub async fn upsert_user_and_issue_session_at(
        &self,
        identity: &VerifiedIdentity,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = transaction::begin_transaction(&self.pool).await?;

        let created = user_repo::insert_user_if_absent(&mut *tx, identity).await?;
        let superseded = if created {
            0
        } else {
            session_repo::expire_active_sessions_for_user(&mut *tx, &identity.id, now).await?
        };
        let expires_at = now + ChronoDuration::days(SESSION_TTL_DAYS);
        session_repo::insert_session(&mut *tx, session_id, &identity.id, expires_at).await?;

        transaction::commit_transaction(tx).await?;

        tracing::info!(
            user_id = %identity.id,
            new_user = created,
            superseded_sessions = superseded,
            "Issued session"
        );
        Ok(())
    }

    pub async fn validate_session(&self, session_id: SessionId) -> Result<UserId, StoreError> {
        self.validate_session_at(session_id, Utc::now()).await
    }

    pub async fn validate_session_at(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<UserId, StoreError> {
        session_repo::find_session_owner(&self.pool, session_id, now)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Soft-revokes the session. Unknown or already expired tokens are a no-op.
    pub async fn revoke_session(&self, session_id: SessionId) -> Result<(), StoreError> {
        let revoked = session_repo::expire_session(&self.pool, session_id, Utc::now()).await?;
        tracing::debug!(revoked, "Session revoke requested");
        Ok(())
    }

    pub async fn list_items(&self, owner_id: &str) -> Result<Vec<Todo>, StoreError> {
        Ok(todo_repo::list_todos_for_owner(&self.pool, owner_id).await?)
    }

    pub async fn create_item(
        &self,
        owner_id: &str,
        title: &str,
        description: &str,
    ) -> Result<ItemId, StoreError> {
        Ok(todo_repo::insert_todo(&self.pool, owner_id, title, description).await?)
    }

    pub async fn edit_item(
        &self,
        item_id: ItemId,
        owner_id: &str,
        title: &str,
        description: &str,
    ) -> Result<(), StoreError> {
        let updated =
            todo_repo::update_todo_for_owner(&self.pool, item_id, owner_id, title, description)
                .await?;
        if updated == 0 {
            return Err(StoreError::NotFoundOrForbidden);
        }
        Ok(())
    }

    pub async fn toggle_done(&self, item_id: ItemId, owner_id: &str) -> Result<(), StoreError> {
        let updated = todo_repo::toggle_todo_done_for_owner(&self.pool, item_id, owner_id).await?;
        if updated == 0 {
            return Err(StoreError::NotFoundOrForbidden);
        }
        Ok(())
    }

    /// Pings the store with a bounded timeout and reports pool occupancy.
    /// A failed ping flips the service to unhealthy until a later ping
    /// succeeds; both transitions are logged.
    pub async fn health(&self) -> HealthReport {
        let ping = tokio::time::timeout(
            HEALTH_PING_TIMEOUT,
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await;

        let open_connections = self.pool.size();
        let idle = u32::try_from(self.pool.num_idle()).unwrap_or(open_connections);
        let in_use = open_connections.saturating_sub(idle);
        let max_connections = self.pool.options().get_max_connections();

        let failure = match ping {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => Some(StoreError::Fault(err)),
            Err(_) => Some(StoreError::Unavailable),
        };

        if let Some(err) = failure {
            let was_healthy = self.healthy.swap(false, Ordering::SeqCst);
            tracing::error!(error = %err, was_healthy, "Database health check failed");
            if was_healthy {
                tracing::warn!("Store marked unhealthy");
            }
            return HealthReport {
                status: HealthStatus::Down,
                message: "The database is unreachable.".to_string(),
                open_connections,
                in_use,
                idle,
                max_connections,
                error: Some(format!("db down: {}", err)),
            };
        }

        if !self.healthy.swap(true, Ordering::SeqCst) {
            tracing::info!("Store recovered; marked healthy");
        }
        let message = if in_use * 5 > max_connections * 4 {
            "The database is experiencing heavy load."
        } else {
            "It's healthy"
        };

        HealthReport {
            status: HealthStatus::Up,
            message: message.to_string(),
            open_connections,
            in_use,
            idle,
            max_connections,
            error: None,
        }
    }

    /// Result of the most recent health check.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Disconnected from database");
    }
}
