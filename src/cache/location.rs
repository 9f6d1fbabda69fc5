//! Cache Location Module
//!
//! Identifies one cached, independently expiring result set and serializes it
//! as the member stored in the expiration index.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Result;

// == Cache Location ==
/// The `{sorted set, hashmap}` pair behind one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLocation {
    /// Sorted set holding the ordered record ids
    #[serde(rename = "SortSet")]
    pub sort_set: String,
    /// Hashmap holding the serialized records (may be shared)
    #[serde(rename = "Hashmap")]
    pub hashmap: String,
}

impl CacheLocation {
    pub fn new(sort_set: impl Into<String>, hashmap: impl Into<String>) -> Self {
        Self {
            sort_set: sort_set.into(),
            hashmap: hashmap.into(),
        }
    }

    /// Serializes the location into its expiration index member.
    ///
    /// The encoding is stable: the same pair always yields the same member,
    /// which is what lets a repopulation overwrite the previous expiry.
    pub fn to_member(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an expiration index member.
    pub fn from_member(member: &str) -> Result<Self> {
        Ok(serde_json::from_str(member)?)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub fn current_timestamp_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
