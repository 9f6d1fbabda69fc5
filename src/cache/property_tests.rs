//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine contract against the memory tier.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_test::block_on;

use crate::cache::memory::rank_bounds;
use crate::cache::{CacheEngine, MemoryTier, SortedMember};

// == Test Configuration ==
const TEST_TTL: Duration = Duration::from_secs(3600);

// == Strategies ==
/// Generates distinct record ids in a random order
fn record_ids_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z0-9]{1,12}", 1..40)
        .prop_map(|ids| ids.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// Generates cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z:]{1,24}"
}

fn payload(id: &str) -> String {
    format!(r#"{{"TradeNo":"{}"}}"#, id)
}

/// Populates `ids` in rank order and returns the engine.
async fn populated(sort_key: &str, data_key: &str, ids: &[String], total: i64) -> CacheEngine {
    let engine = CacheEngine::remote_only(Arc::new(MemoryTier::new()));
    let members: Vec<SortedMember> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| SortedMember::new(i as f64, id.clone()))
        .collect();
    let fields: HashMap<String, String> = ids.iter().map(|id| (id.clone(), payload(id))).collect();
    engine
        .put_range(sort_key, data_key, &members, &fields, total, TEST_TTL)
        .await
        .unwrap();
    engine
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Round trip: a full-width range returns the stored total and every
    // payload in rank order.
    #[test]
    fn prop_range_round_trip(
        sort_key in key_strategy(),
        data_key in key_strategy(),
        ids in record_ids_strategy(),
        extra in 0i64..1000,
    ) {
        prop_assume!(sort_key != data_key);
        let total = ids.len() as i64 + extra;
        let page = block_on(async {
            let engine = populated(&sort_key, &data_key, &ids, total).await;
            engine.range(&sort_key, &data_key, 0, ids.len() as i64 - 1).await.unwrap()
        });

        let expected: Vec<String> = ids.iter().map(|id| payload(id)).collect();
        prop_assert_eq!(page.total, total);
        prop_assert_eq!(page.records, expected);
    }

    // Any window of a populated range returns exactly the matching slice,
    // or a miss when the window selects nothing.
    #[test]
    fn prop_range_window(
        ids in record_ids_strategy(),
        start in -50i64..50,
        end in -50i64..50,
    ) {
        let page = block_on(async {
            let engine = populated("s", "d", &ids, ids.len() as i64).await;
            engine.range("s", "d", start, end).await.unwrap()
        });

        match rank_bounds(ids.len(), start, end) {
            Some((from, to)) => {
                let expected: Vec<String> = ids[from..=to].iter().map(|id| payload(id)).collect();
                prop_assert_eq!(page.records, expected);
                prop_assert_eq!(page.total, ids.len() as i64);
            }
            None => prop_assert!(page.is_miss()),
        }
    }

    // Empty-range miss: an unpopulated key is a miss, never an error.
    #[test]
    fn prop_unpopulated_key_is_miss(
        sort_key in key_strategy(),
        data_key in key_strategy(),
        start in 0i64..100,
        len in 0i64..100,
    ) {
        let page = block_on(async {
            let engine = CacheEngine::remote_only(Arc::new(MemoryTier::new()));
            engine.range(&sort_key, &data_key, start, start + len).await
        });
        let page = page.unwrap();
        prop_assert_eq!(page.total, 0);
        prop_assert!(page.records.is_empty());
    }

    // Rank bounds never select outside the set and agree with a naive model.
    #[test]
    fn prop_rank_bounds_match_model(len in 0usize..60, start in -80i64..80, end in -80i64..80) {
        let model: Vec<usize> = (0..len)
            .filter(|&i| {
                let n = len as i64;
                let s = if start < 0 { (n + start).max(0) } else { start };
                let e = if end < 0 { n + end } else { end };
                (i as i64) >= s && (i as i64) <= e
            })
            .collect();

        match rank_bounds(len, start, end) {
            Some((from, to)) => {
                prop_assert!(to < len);
                prop_assert_eq!(model, (from..=to).collect::<Vec<_>>());
            }
            None => prop_assert!(model.is_empty()),
        }
    }
}
