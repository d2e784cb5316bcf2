//! Database models split into domain-specific modules.

pub mod site;
pub mod user;

pub use site::*;
pub use user::*;
