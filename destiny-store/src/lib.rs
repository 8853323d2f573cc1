#![forbid(unsafe_code)]

pub mod memory;
pub mod postgres;
pub mod store;

pub use crate::memory::MemoryCacheStore;
pub use crate::postgres::{run_migrations, PostgresCacheStore};
pub use crate::store::{CacheStore, StoreError};
