//! Order Sources
//!
//! Source-of-truth collaborators queried on a cache miss.

mod elastic;
mod fixture;

pub use elastic::ElasticOrderSource;
pub use fixture::StaticOrderSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::TradeOrder;

/// One page of orders, optionally filtered. Zero filters match everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderQuery {
    pub page: u32,
    pub size: u32,
    pub trade_no: u64,
    pub user_id: u64,
}

impl OrderQuery {
    pub fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }
}

/// Paginated order lookup against the backing store.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Returns the total number of matching orders and the requested page.
    async fn get_order(&self, query: &OrderQuery) -> Result<(i64, Vec<TradeOrder>)>;
}
