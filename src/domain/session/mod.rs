//! Session domain

mod entity;

pub use entity::{DEFAULT_SESSION_TTL, Session};
