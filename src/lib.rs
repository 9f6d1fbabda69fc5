//! Order Cache - paginated order lookups backed by a Redis result-set cache
//!
//! Pages of orders are cached as a sorted set of trade numbers plus a shared
//! hashmap of order records, read back atomically and reclaimed by a
//! background sweeper once they expire.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod source;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_sweeper;
