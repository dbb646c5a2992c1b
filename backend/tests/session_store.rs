use chrono::{Duration, Utc};
use todo_backend::{
    repositories::session as session_repo,
    repositories::user as user_repo,
    services::persistence::StoreError,
    types::SessionId,
};

mod support;

async fn active_session_count(pool: &sqlx::SqlitePool, user_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_id = ? AND expires_at > ?")
        .bind(user_id)
        .bind(Utc::now().timestamp())
        .fetch_one(pool)
        .await
        .expect("count active sessions")
}

#[tokio::test]
async fn first_login_creates_user_and_session() {
    let db = support::test_db().await;
    let store = support::store(&db.pool);
    let session_id = SessionId::new();

    store
        .upsert_user_and_issue_session(&support::identity("alice"), session_id)
        .await
        .expect("issue session");

    let user = user_repo::find_user_by_id(&db.pool, "alice")
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(
        store.validate_session(session_id).await.expect("valid session"),
        "alice"
    );

    let sessions = session_repo::list_sessions_for_user(&db.pool, "alice")
        .await
        .expect("list sessions");
    assert_eq!(sessions.len(), 1);
    let ttl = sessions[0].expires_at - Utc::now().timestamp();
    assert!((Duration::days(14).num_seconds() - 5..=Duration::days(14).num_seconds()).contains(&ttl));
}

#[tokio::test]
async fn relogin_supersedes_previous_session() {
    let db = support::test_db().await;
    let store = support::store(&db.pool);
    let identity = support::identity("alice");

    let first = SessionId::new();
    store
        .upsert_user_and_issue_session(&identity, first)
        .await
        .expect("first login");
    let second = SessionId::new();
    store
        .upsert_user_and_issue_session(&identity, second)
        .await
        .expect("second login");

    assert!(matches!(
        store.validate_session(first).await,
        Err(StoreError::NotFound)
    ));
    assert_eq!(store.validate_session(second).await.expect("new session"), "alice");
    assert_eq!(active_session_count(&db.pool, "alice").await, 1);

    // Superseded rows are kept, not deleted.
    let sessions = session_repo::list_sessions_for_user(&db.pool, "alice")
        .await
        .expect("list sessions");
    assert_eq!(sessions.len(), 2);
}

#[tokio::test]
async fn relogin_does_not_touch_other_users_sessions() {
    let db = support::test_db().await;
    let store = support::store(&db.pool);

    let bob_session = SessionId::new();
    store
        .upsert_user_and_issue_session(&support::identity("bob"), bob_session)
        .await
        .expect("bob login");
    store
        .upsert_user_and_issue_session(&support::identity("alice"), SessionId::new())
        .await
        .expect("alice login");
    store
        .upsert_user_and_issue_session(&support::identity("alice"), SessionId::new())
        .await
        .expect("alice relogin");

    assert_eq!(store.validate_session(bob_session).await.expect("bob valid"), "bob");
}

#[tokio::test]
async fn concurrent_relogins_leave_one_active_session() {
    let db = support::test_db().await;
    let store = support::store(&db.pool);
    let identity = support::identity("alice");
    store
        .upsert_user_and_issue_session(&identity, SessionId::new())
        .await
        .expect("initial login");

    let (a, b, c) = tokio::join!(
        store.upsert_user_and_issue_session(&identity, SessionId::new()),
        store.upsert_user_and_issue_session(&identity, SessionId::new()),
        store.upsert_user_and_issue_session(&identity, SessionId::new()),
    );
    a.expect("login a");
    b.expect("login b");
    c.expect("login c");

    assert_eq!(active_session_count(&db.pool, "alice").await, 1);
}

#[tokio::test]
async fn profile_is_not_refreshed_on_relogin() {
    let db = support::test_db().await;
    let store = support::store(&db.pool);
    store
        .upsert_user_and_issue_session(&support::identity("alice"), SessionId::new())
        .await
        .expect("first login");

    let mut renamed = support::identity("alice");
    renamed.name = "Alice Renamed".to_string();
    renamed.email = "new@example.com".to_string();
    store
        .upsert_user_and_issue_session(&renamed, SessionId::new())
        .await
        .expect("second login");

    let user = user_repo::find_user_by_id(&db.pool, "alice")
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(user.name, "User alice");
    assert_eq!(user.email, "alice@example.com");
}

#[tokio::test]
async fn session_expiring_exactly_now_is_rejected() {
    let db = support::test_db().await;
    let store = support::store(&db.pool);
    store
        .upsert_user_and_issue_session(&support::identity("alice"), SessionId::new())
        .await
        .expect("login");

    let now = Utc::now();
    let session_id = SessionId::new();
    let mut conn = db.pool.acquire().await.expect("acquire");
    session_repo::insert_session(&mut *conn, session_id, "alice", now)
        .await
        .expect("insert session");
    drop(conn);

    assert!(matches!(
        store.validate_session_at(session_id, now).await,
        Err(StoreError::NotFound)
    ));
    assert_eq!(
        store
            .validate_session_at(session_id, now - Duration::seconds(1))
            .await
            .expect("valid one second earlier"),
        "alice"
    );
}

#[tokio::test]
async fn unknown_and_revoked_sessions_are_indistinguishable() {
    let db = support::test_db().await;
    let store = support::store(&db.pool);
    let session_id = SessionId::new();
    store
        .upsert_user_and_issue_session(&support::identity("alice"), session_id)
        .await
        .expect("login");

    store.revoke_session(session_id).await.expect("revoke");
    store.revoke_session(session_id).await.expect("revoke twice");
    store
        .revoke_session(SessionId::new())
        .await
        .expect("revoke unknown");

    assert!(matches!(
        store.validate_session(session_id).await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        store.validate_session(SessionId::new()).await,
        Err(StoreError::NotFound)
    ));

    let sessions = session_repo::list_sessions_for_user(&db.pool, "alice")
        .await
        .expect("list sessions");
    assert_eq!(sessions.len(), 1);
    assert!(!sessions[0].is_active_at(Utc::now()));
}

#[tokio::test]
async fn deleting_a_user_cascades_to_sessions_and_todos() {
    let db = support::test_db().await;
    let store = support::store(&db.pool);
    store
        .upsert_user_and_issue_session(&support::identity("alice"), SessionId::new())
        .await
        .expect("login");
    store
        .create_item("alice", "t", "d")
        .await
        .expect("create todo");

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind("alice")
        .execute(&db.pool)
        .await
        .expect("delete user");

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&db.pool)
        .await
        .expect("count sessions");
    let todos: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM todos")
        .fetch_one(&db.pool)
        .await
        .expect("count todos");
    assert_eq!(sessions, 0);
    assert_eq!(todos, 0);
}
