//! User domain
//!
//! Users are keyed by an opaque user ID and listed in creation order.

mod entity;

pub use entity::User;
