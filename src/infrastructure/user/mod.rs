//! User infrastructure module

mod remote;
mod service;

pub use remote::{DEFAULT_API_URL, RemoteUserConfig, RemoteUserStore};
pub use service::UserService;
