//! Cache Engine Module
//!
//! Front door of the cache: single-field `put`/`get`, range population and the
//! atomic range read. All cross-operation atomicity is delegated to the remote
//! tier; the engine itself holds no locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::location::{current_timestamp_secs, CacheLocation};
use crate::cache::stats::CacheStats;
use crate::cache::tier::{RangeReply, RangeWrite, RemoteTier, SortedMember, Tiers};
use crate::error::{Result, ServiceError};

// == Range Page ==
/// Result of a range read. A miss is `total == 0` with no records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangePage {
    pub total: i64,
    pub records: Vec<String>,
}

impl RangePage {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn is_miss(&self) -> bool {
        self.records.is_empty()
    }
}

// == Cache Engine ==
/// Layered cache over a mandatory remote tier and an optional local tier.
#[derive(Debug)]
pub struct CacheEngine {
    tiers: Tiers,
    stats: CacheStats,
}

impl CacheEngine {
    pub fn new(tiers: Tiers) -> Self {
        Self {
            tiers,
            stats: CacheStats::new(),
        }
    }

    /// Engine with no local tier; every call goes to `remote`.
    pub fn remote_only(remote: Arc<dyn RemoteTier>) -> Self {
        Self::new(Tiers::remote_only(remote))
    }

    pub fn tiers(&self) -> &Tiers {
        &self.tiers
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    // == Put ==
    /// Sets one hashmap field. Registers no expiry.
    pub async fn put(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.tiers.remote().hset(key, field, value).await?;
        if let Some(local) = self.tiers.local() {
            local.put(key, field, value);
        }
        Ok(())
    }

    // == Put Range ==
    /// Populates one cached result set.
    ///
    /// The sorted set members, the expiration index entry (`now + ttl`), the
    /// hashmap fields and the hit-count total are written as one transaction.
    /// An empty member list has nothing to serve later and writes nothing.
    pub async fn put_range(
        &self,
        sort_key: &str,
        data_key: &str,
        members: &[SortedMember],
        fields: &HashMap<String, String>,
        total: i64,
        ttl: Duration,
    ) -> Result<()> {
        if members.is_empty() {
            debug!(sort_key = %sort_key, "Skipping population of empty result set");
            return Ok(());
        }

        let location_member = CacheLocation::new(sort_key, data_key).to_member()?;
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expire_at = current_timestamp_secs().saturating_add(ttl_secs);

        self.tiers
            .remote()
            .put_range(RangeWrite {
                sort_key,
                data_key,
                members,
                fields,
                total,
                location_member: &location_member,
                expire_at,
            })
            .await?;

        self.stats.record_population();
        debug!(
            sort_key = %sort_key,
            data_key = %data_key,
            members = members.len(),
            total,
            expire_at,
            "Cached result set"
        );
        Ok(())
    }

    // == Get ==
    /// Reads one hashmap field. `Ok(None)` means the field is absent.
    pub async fn get(&self, key: &str, field: &str) -> Result<Option<String>> {
        if let Some(local) = self.tiers.local() {
            if let Some(value) = local.get(key, field) {
                return Ok(Some(value));
            }
        }

        let value = self.tiers.remote().hget(key, field).await?;
        if let (Some(local), Some(value)) = (self.tiers.local(), value.as_deref()) {
            local.put(key, field, value);
        }
        Ok(value)
    }

    // == Range ==
    /// Reads ranks `start..=end` of a cached result set together with its
    /// total, in one atomic remote operation.
    ///
    /// Returns [`RangePage::miss`] when the sorted set has no members in the
    /// range, when the reply has an unexpected shape, or when the hit-count
    /// entry or any referenced record is already gone. Callers fall back to the
    /// source of truth in every one of those cases.
    pub async fn range(
        &self,
        sort_key: &str,
        data_key: &str,
        start: i64,
        end: i64,
    ) -> Result<RangePage> {
        let location_member = CacheLocation::new(sort_key, data_key).to_member()?;
        let reply = self
            .tiers
            .remote()
            .range(sort_key, data_key, start, end, &location_member)
            .await?;

        let page = match reply {
            RangeReply::Empty => RangePage::miss(),
            RangeReply::Unexpected => {
                warn!(sort_key = %sort_key, "Unexpected range reply shape, treating as miss");
                RangePage::miss()
            }
            RangeReply::Hit { total: None, .. } => {
                debug!(sort_key = %sort_key, "Hit-count entry missing, treating as miss");
                RangePage::miss()
            }
            RangeReply::Hit {
                total: Some(total),
                records,
            } => {
                let total: i64 = total.trim().parse().map_err(|_| {
                    ServiceError::Malformed(format!(
                        "total for '{}' is not an integer: {:?}",
                        sort_key, total
                    ))
                })?;
                match records.into_iter().collect::<Option<Vec<String>>>() {
                    Some(records) => RangePage { total, records },
                    None => {
                        debug!(sort_key = %sort_key, "Referenced record reclaimed, treating as miss");
                        RangePage::miss()
                    }
                }
            }
        };

        if page.is_miss() {
            self.stats.record_miss();
        } else {
            self.stats.record_hit();
        }
        Ok(page)
    }
}
