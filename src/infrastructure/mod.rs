//! Infrastructure layer - Store backends, caching, batch resolution and services

pub mod cache;
pub mod logging;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod user;
