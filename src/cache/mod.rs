//! Cache Module
//!
//! Result-set cache over a remote key/sorted-set store: ordered record ids in
//! per-query sorted sets, record payloads in (possibly shared) hashmaps, and a
//! global expiration index reclaimed by the sweeper.

mod engine;
mod location;
mod memory;
mod redis_tier;
mod stats;
mod tier;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::{CacheEngine, RangePage};
pub use location::{current_timestamp_secs, CacheLocation};
pub use memory::MemoryTier;
pub use redis_tier::{create_pool, RedisTier};
pub use stats::{CacheStats, StatsSnapshot};
pub use tier::{
    LocalTier, RangeReply, RangeWrite, RemoteTier, SortedMember, Tiers, EXPIRE_INDEX_KEY,
    HIT_COUNT_KEY, HIT_WEIGHT,
};
