pub mod session;
pub mod todo;
pub mod transaction;
pub mod user;
