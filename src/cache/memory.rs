//! Memory Tier Module
//!
//! In-process implementation of the remote tier contract. Hashes and sorted
//! sets live behind one mutex, so every compound operation (population, range
//! read) is applied as a unit exactly like a Redis transaction or script.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cache::tier::{
    RangeReply, RangeWrite, RemoteTier, EXPIRE_INDEX_KEY, HIT_COUNT_KEY, HIT_WEIGHT,
};
use crate::error::Result;

// == Sorted Set ==
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, f64>,
}

impl SortedSet {
    fn add(&mut self, member: &str, score: f64) {
        self.scores.insert(member.to_string(), score);
    }

    fn incr(&mut self, member: &str, by: f64) -> f64 {
        let score = self.scores.entry(member.to_string()).or_insert(0.0);
        *score += by;
        *score
    }

    /// Members in score order, ties broken lexicographically.
    fn ordered(&self) -> Vec<(&String, f64)> {
        let mut items: Vec<(&String, f64)> = self.scores.iter().map(|(m, s)| (m, *s)).collect();
        items.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        items
    }

    fn rank_range(&self, start: i64, end: i64) -> Vec<String> {
        let ordered = self.ordered();
        match rank_bounds(ordered.len(), start, end) {
            Some((from, to)) => ordered[from..=to].iter().map(|(m, _)| (*m).clone()).collect(),
            None => Vec::new(),
        }
    }

    fn score_range(&self, min: f64, max: f64) -> Vec<String> {
        self.ordered()
            .into_iter()
            .filter(|(_, s)| *s >= min && *s <= max)
            .map(|(m, _)| m.clone())
            .collect()
    }
}

/// Resolves a Redis-style inclusive rank range (negative indexes count from
/// the end) into concrete bounds, or `None` when it selects nothing.
pub(crate) fn rank_bounds(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };
    if start > end || start >= len || end < 0 {
        return None;
    }
    Some((start as usize, end as usize))
}

// == Memory State ==
#[derive(Debug, Default)]
struct MemoryState {
    hashes: HashMap<String, HashMap<String, String>>,
    sorted: HashMap<String, SortedSet>,
}

impl MemoryState {
    fn hset(&mut self, key: &str, field: &str, value: &str) {
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    fn hget(&self, key: &str, field: &str) -> Option<String> {
        self.hashes.get(key).and_then(|h| h.get(field)).cloned()
    }

    fn hdel(&mut self, key: &str, fields: &[String]) {
        if let Some(hash) = self.hashes.get_mut(key) {
            for field in fields {
                hash.remove(field);
            }
            if hash.is_empty() {
                self.hashes.remove(key);
            }
        }
    }

    fn zrem(&mut self, key: &str, member: &str) {
        if let Some(set) = self.sorted.get_mut(key) {
            set.scores.remove(member);
            if set.scores.is_empty() {
                self.sorted.remove(key);
            }
        }
    }
}

// == Memory Tier ==
/// Remote tier kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryTier {
    state: Mutex<MemoryState>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a hash or sorted set exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        let state = self.state.lock();
        state.hashes.contains_key(key) || state.sorted.contains_key(key)
    }

    /// Reads a hash field without going through the tier contract.
    pub fn hash_field(&self, key: &str, field: &str) -> Option<String> {
        self.state.lock().hget(key, field)
    }

    /// Current expiry score of an expiration index member.
    pub fn expiration_score(&self, member: &str) -> Option<f64> {
        self.state
            .lock()
            .sorted
            .get(EXPIRE_INDEX_KEY)
            .and_then(|set| set.scores.get(member).copied())
    }

    /// Registers an arbitrary expiration index member.
    pub fn insert_expiration(&self, member: &str, expire_at: i64) {
        self.state
            .lock()
            .sorted
            .entry(EXPIRE_INDEX_KEY.to_string())
            .or_default()
            .add(member, expire_at as f64);
    }
}

#[async_trait]
impl RemoteTier for MemoryTier {
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.state.lock().hset(key, field, value);
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self.state.lock().hget(key, field))
    }

    async fn put_range(&self, write: RangeWrite<'_>) -> Result<()> {
        let mut state = self.state.lock();

        let set = state.sorted.entry(write.sort_key.to_string()).or_default();
        for member in write.members {
            set.add(&member.member, member.score);
        }

        state
            .sorted
            .entry(EXPIRE_INDEX_KEY.to_string())
            .or_default()
            .add(write.location_member, write.expire_at as f64);

        for (field, value) in write.fields {
            state.hset(write.data_key, field, value);
        }

        state.hset(HIT_COUNT_KEY, write.sort_key, &write.total.to_string());
        Ok(())
    }

    async fn range(
        &self,
        sort_key: &str,
        data_key: &str,
        start: i64,
        end: i64,
        location_member: &str,
    ) -> Result<RangeReply> {
        let mut state = self.state.lock();

        let members = state
            .sorted
            .get(sort_key)
            .map(|set| set.rank_range(start, end))
            .unwrap_or_default();
        if members.is_empty() {
            return Ok(RangeReply::Empty);
        }

        state
            .sorted
            .entry(EXPIRE_INDEX_KEY.to_string())
            .or_default()
            .incr(location_member, HIT_WEIGHT as f64);

        let total = state.hget(HIT_COUNT_KEY, sort_key);
        let records = members
            .iter()
            .map(|member| state.hget(data_key, member))
            .collect();

        Ok(RangeReply::Hit { total, records })
    }

    async fn expired_members(&self, now: i64) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .sorted
            .get(EXPIRE_INDEX_KEY)
            .map(|set| set.score_range(0.0, now as f64))
            .unwrap_or_default())
    }

    async fn sorted_page(&self, key: &str, offset: usize, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let start = offset as i64;
        let end = start + count as i64 - 1;
        Ok(self
            .state
            .lock()
            .sorted
            .get(key)
            .map(|set| set.rank_range(start, end))
            .unwrap_or_default())
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<()> {
        self.state.lock().hdel(key, fields);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.hashes.remove(key);
        state.sorted.remove(key);
        Ok(())
    }

    async fn remove_expiration(&self, member: &str) -> Result<()> {
        self.state.lock().zrem(EXPIRE_INDEX_KEY, member);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tier::SortedMember;

    #[test]
    fn test_rank_bounds() {
        assert_eq!(rank_bounds(5, 0, 4), Some((0, 4)));
        assert_eq!(rank_bounds(5, 0, 10), Some((0, 4)));
        assert_eq!(rank_bounds(5, -2, -1), Some((3, 4)));
        assert_eq!(rank_bounds(5, -10, 1), Some((0, 1)));
        assert_eq!(rank_bounds(5, 5, 9), None);
        assert_eq!(rank_bounds(5, 3, 2), None);
        assert_eq!(rank_bounds(0, 0, 10), None);
        assert_eq!(rank_bounds(5, 0, -6), None);
    }

    #[test]
    fn test_sorted_set_orders_by_score_then_member() {
        let mut set = SortedSet::default();
        set.add("b", 1.0);
        set.add("a", 1.0);
        set.add("c", 0.0);
        assert_eq!(set.rank_range(0, -1), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_score_range_is_inclusive() {
        let mut set = SortedSet::default();
        set.add("old", 10.0);
        set.add("now", 20.0);
        set.add("future", 30.0);
        assert_eq!(set.score_range(0.0, 20.0), vec!["old", "now"]);
    }

    #[tokio::test]
    async fn test_hdel_removes_empty_hash() {
        let tier = MemoryTier::new();
        tier.hset("h", "f", "v").await.unwrap();
        tier.hdel("h", &["f".to_string()]).await.unwrap();
        assert!(!tier.contains_key("h"));
    }

    #[tokio::test]
    async fn test_range_on_empty_set_touches_nothing() {
        let tier = MemoryTier::new();
        let reply = tier.range("s", "d", 0, 10, "loc").await.unwrap();
        assert_eq!(reply, RangeReply::Empty);
        assert!(tier.expiration_score("loc").is_none());
    }

    #[tokio::test]
    async fn test_range_reports_missing_fields() {
        let tier = MemoryTier::new();
        let fields = HashMap::from([("a".to_string(), "1".to_string())]);
        let members = vec![SortedMember::new(0.0, "a"), SortedMember::new(1.0, "b")];
        tier.put_range(RangeWrite {
            sort_key: "s",
            data_key: "d",
            members: &members,
            fields: &fields,
            total: 2,
            location_member: "loc",
            expire_at: 100,
        })
        .await
        .unwrap();

        let reply = tier.range("s", "d", 0, 1, "loc").await.unwrap();
        assert_eq!(
            reply,
            RangeReply::Hit {
                total: Some("2".to_string()),
                records: vec![Some("1".to_string()), None],
            }
        );
        assert_eq!(tier.expiration_score("loc"), Some(100.0 + HIT_WEIGHT as f64));
    }
}
