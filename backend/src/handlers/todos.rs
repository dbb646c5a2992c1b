//! To-do endpoints. Every mutation answers with the caller's full item list.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path, State,
    },
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    middleware::auth::CurrentUser,
    models::todo::{Todo, TodoPayload},
    state::AppState,
    types::ItemId,
};

type TodoListResult = Result<Json<Vec<Todo>>, AppError>;

pub async fn list_todos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> TodoListResult {
    snapshot(&state, &user).await
}

pub async fn create_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> TodoListResult {
    let Json(payload) = payload?;
    payload.validate()?;

    let todo_id = state
        .store
        .create_item(&user.id, &payload.title, &payload.description)
        .await?;
    tracing::debug!(todo_id, user_id = %user.id, "Created todo");

    snapshot(&state, &user).await
}

pub async fn mark_done(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<ItemId>, PathRejection>,
) -> TodoListResult {
    let Path(todo_id) = path?;
    state.store.toggle_done(todo_id, &user.id).await?;
    snapshot(&state, &user).await
}

pub async fn edit_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    path: Result<Path<ItemId>, PathRejection>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> TodoListResult {
    let Path(todo_id) = path?;
    let Json(payload) = payload?;
    payload.validate()?;

    state
        .store
        .edit_item(todo_id, &user.id, &payload.title, &payload.description)
        .await?;

    snapshot(&state, &user).await
}

async fn snapshot(state: &AppState, user: &CurrentUser) -> TodoListResult {
    let todos = state.store.list_items(&user.id).await?;
    Ok(Json(todos))
}
