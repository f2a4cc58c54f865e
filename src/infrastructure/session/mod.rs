//! Session infrastructure module

mod service;

pub use service::SessionService;
