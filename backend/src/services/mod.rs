pub mod identity;
pub mod persistence;
pub mod session;
