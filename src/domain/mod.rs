//! Domain layer - Core entities, the storage contract and its error taxonomy

pub mod context;
pub mod cursor;
pub mod error;
pub mod session;
pub mod store;
pub mod user;

pub use context::CallContext;
pub use cursor::{CURSOR_TIME_FORMAT, Cursor, CursorCodec};
pub use error::{DomainError, ErrorKind};
pub use session::Session;
pub use store::{KeyedEntity, KeyedStore, Page, PagedStore};
pub use user::User;
