//! To-do items and the payloads that create or edit them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::types::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
/// A task owned by exactly one user. The description travels as `body` on
/// the wire.
pub struct Todo {
    pub id: ItemId,
    pub title: String,
    #[serde(rename = "body")]
    pub description: String,
    pub done: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
/// Request body for creating or editing a to-do.
pub struct TodoPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(rename = "body")]
    #[validate(length(max = 2000))]
    pub description: String,
}
