pub mod cache;
pub mod config;
pub mod invoke;
pub mod migrate;
pub mod validate;
