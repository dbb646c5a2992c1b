pub mod id;

pub use id::SessionId;

/// Primary key of a user: the identity provider's stable id.
pub type UserId = String;

/// Primary key of a to-do item.
pub type ItemId = i64;
