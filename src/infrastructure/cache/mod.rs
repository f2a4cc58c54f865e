//! Cache infrastructure - a blocking cache primitive and its cancellation-aware wrapper

mod cancellable;
mod primitive;

pub use cancellable::{CancellableCacheRepository, DEFAULT_TTL};
pub use primitive::{AddError, MokaSyncCache, MokaSyncCacheConfig, SyncCache};

#[cfg(test)]
pub use primitive::mock;
