//! In-process order source over a fixed list of orders.
//!
//! Used for local runs without a search cluster and by the integration tests.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;

use crate::error::{Result, ServiceError};
use crate::models::TradeOrder;
use crate::source::{OrderQuery, OrderSource};

/// Orders held in memory, newest trade number first.
#[derive(Debug, Default)]
pub struct StaticOrderSource {
    orders: Vec<TradeOrder>,
    queries: AtomicU64,
}

/// Numeric trade numbers compare by value; anything else falls back to text.
fn trade_no_desc(a: &TradeOrder, b: &TradeOrder) -> Ordering {
    match (a.trade_no.parse::<u64>(), b.trade_no.parse::<u64>()) {
        (Ok(x), Ok(y)) => y.cmp(&x),
        _ => b.trade_no.cmp(&a.trade_no),
    }
}

fn matches_id(field: &str, wanted: u64) -> bool {
    wanted == 0 || field.trim().parse::<u64>().map_or(false, |v| v == wanted)
}

impl StaticOrderSource {
    pub fn new(mut orders: Vec<TradeOrder>) -> Self {
        orders.sort_by(trade_no_desc);
        Self {
            orders,
            queries: AtomicU64::new(0),
        }
    }

    /// Loads a JSON array of orders from `path`.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ServiceError::Internal(format!("cannot read {}: {}", path.display(), e))
        })?;
        let orders: Vec<TradeOrder> = serde_json::from_str(&raw)?;
        Ok(Self::new(orders))
    }

    /// Number of lookups served so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(AtomicOrdering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderSource for StaticOrderSource {
    async fn get_order(&self, query: &OrderQuery) -> Result<(i64, Vec<TradeOrder>)> {
        self.queries.fetch_add(1, AtomicOrdering::Relaxed);

        let matching: Vec<&TradeOrder> = self
            .orders
            .iter()
            .filter(|o| o.deleted == 0)
            .filter(|o| matches_id(&o.trade_no, query.trade_no))
            .filter(|o| matches_id(&o.user_id, query.user_id))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset())
            .take(query.size as usize)
            .cloned()
            .collect();
        Ok((total, page))
    }
}
