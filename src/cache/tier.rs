//! Cache Tiers
//!
//! Capability traits for the two cache tiers. The remote tier is mandatory and
//! carries the whole storage contract; the local tier is an optional
//! read-through layer in front of single-field lookups.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Global sorted set: serialized `CacheLocation` -> expiry (unix seconds).
pub const EXPIRE_INDEX_KEY: &str = "expire_key_sort_set";

/// Global hash: sorted set key -> total logical record count.
pub const HIT_COUNT_KEY: &str = "total_hit_map";

/// Score added to a location's expiration entry on every successful range read.
pub const HIT_WEIGHT: i64 = 3600;

// == Write Payloads ==
/// One `(position, record id)` pair of a cached result set.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedMember {
    pub score: f64,
    pub member: String,
}

impl SortedMember {
    pub fn new(score: f64, member: impl Into<String>) -> Self {
        Self {
            score,
            member: member.into(),
        }
    }
}

/// Everything one population writes, applied as a single unit.
#[derive(Debug, Clone, Copy)]
pub struct RangeWrite<'a> {
    pub sort_key: &'a str,
    pub data_key: &'a str,
    pub members: &'a [SortedMember],
    pub fields: &'a HashMap<String, String>,
    pub total: i64,
    /// Serialized `CacheLocation` registered in the expiration index
    pub location_member: &'a str,
    /// Absolute expiry in unix seconds
    pub expire_at: i64,
}

// == Range Reply ==
/// Raw outcome of the atomic range read, before the engine interprets it.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeReply {
    /// No members in the requested rank range; nothing else was touched
    Empty,
    /// Members were found
    Hit {
        /// Hit-count table value for the sorted set, if present
        total: Option<String>,
        /// Hashmap values in rank order; `None` where the field is gone
        records: Vec<Option<String>>,
    },
    /// The store answered with something other than the expected shape
    Unexpected,
}

// == Remote Tier ==
/// Storage contract the cache engine and the sweeper rely on.
///
/// `put_range` and `range` must each execute as one indivisible operation on
/// the store; every other method is a single command.
#[async_trait]
pub trait RemoteTier: Send + Sync {
    /// Sets one hashmap field.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Reads one hashmap field.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Writes members, expiry, fields and total in one transaction.
    async fn put_range(&self, write: RangeWrite<'_>) -> Result<()>;

    /// Reads ranks `start..=end` with hit accounting in one atomic step.
    async fn range(
        &self,
        sort_key: &str,
        data_key: &str,
        start: i64,
        end: i64,
        location_member: &str,
    ) -> Result<RangeReply>;

    /// Expiration index members whose score is in `0..=now`.
    async fn expired_members(&self, now: i64) -> Result<Vec<String>>;

    /// Members of a sorted set at ranks `offset..offset + count`.
    async fn sorted_page(&self, key: &str, offset: usize, count: usize) -> Result<Vec<String>>;

    /// Deletes the given fields of a hashmap.
    async fn hdel(&self, key: &str, fields: &[String]) -> Result<()>;

    /// Deletes a whole key.
    async fn del(&self, key: &str) -> Result<()>;

    /// Removes one member from the expiration index.
    async fn remove_expiration(&self, member: &str) -> Result<()>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<()>;
}

// == Local Tier ==
/// Optional in-process layer for single-field lookups.
pub trait LocalTier: Send + Sync {
    fn get(&self, key: &str, field: &str) -> Option<String>;
    fn put(&self, key: &str, field: &str, value: &str);
}

// == Tiers ==
/// The tier stack behind the engine. Without a local tier every call goes
/// straight to the remote tier.
#[derive(Clone)]
pub struct Tiers {
    local: Option<Arc<dyn LocalTier>>,
    remote: Arc<dyn RemoteTier>,
}

impl Tiers {
    pub fn remote_only(remote: Arc<dyn RemoteTier>) -> Self {
        Self {
            local: None,
            remote,
        }
    }

    pub fn with_local(mut self, local: Arc<dyn LocalTier>) -> Self {
        self.local = Some(local);
        self
    }

    pub fn local(&self) -> Option<&Arc<dyn LocalTier>> {
        self.local.as_ref()
    }

    pub fn remote(&self) -> &Arc<dyn RemoteTier> {
        &self.remote
    }
}

impl fmt::Debug for Tiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tiers")
            .field("local", &self.local.is_some())
            .finish_non_exhaustive()
    }
}
