//! API Handlers
//!
//! HTTP request handlers for the order service endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use tracing::{debug, warn};

use crate::cache::{CacheEngine, SortedMember};
use crate::error::{Result, ServiceError};
use crate::models::{
    Envelope, GetOrderParams, GetOrderResult, HealthResponse, StatsResponse, TradeOrder,
};
use crate::source::OrderSource;

/// Hashmap holding every cached order, keyed by trade number. Shared by all
/// cached result sets.
pub const DATA_KEY: &str = "hashmap:order";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Result-set cache
    pub cache: Arc<CacheEngine>,
    /// Source of truth consulted on a miss
    pub orders: Arc<dyn OrderSource>,
    /// Lifetime of a populated result set
    pub order_ttl: Duration,
}

impl AppState {
    pub fn new(cache: Arc<CacheEngine>, orders: Arc<dyn OrderSource>, order_ttl: Duration) -> Self {
        Self {
            cache,
            orders,
            order_ttl,
        }
    }
}

fn decode_orders(records: &[String]) -> Vec<TradeOrder> {
    records
        .iter()
        .filter_map(|raw| match serde_json::from_str::<TradeOrder>(raw) {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable cached order");
                None
            }
        })
        .collect()
}

/// Writes one fetched page into its own result set. Scores are positions
/// within the page, matching the ranks the page is read back with.
async fn populate(
    state: &AppState,
    params: &GetOrderParams,
    total: i64,
    orders: &[TradeOrder],
) -> Result<()> {
    let mut members = Vec::with_capacity(orders.len());
    let mut fields = HashMap::with_capacity(orders.len());
    for (i, order) in orders.iter().enumerate() {
        members.push(SortedMember::new(i as f64, order.trade_no.clone()));
        fields.insert(order.trade_no.clone(), serde_json::to_string(order)?);
    }

    state
        .cache
        .put_range(
            &params.sort_key(),
            DATA_KEY,
            &members,
            &fields,
            total,
            state.order_ttl,
        )
        .await
}

/// Handler for GET /order
///
/// Serves the page from the result-set cache when every record is present,
/// otherwise queries the order source and caches what it returned.
pub async fn get_order_handler(
    State(state): State<AppState>,
    params: std::result::Result<Query<GetOrderParams>, QueryRejection>,
) -> Result<Json<Envelope<GetOrderResult>>> {
    let Query(params) = params.map_err(|e| ServiceError::InvalidRequest(e.body_text()))?;
    if let Some(error_msg) = params.validate() {
        return Err(ServiceError::InvalidRequest(error_msg));
    }

    let sort_key = params.sort_key();
    match state
        .cache
        .range(&sort_key, DATA_KEY, 0, params.last_rank())
        .await
    {
        Ok(page) if !page.is_miss() => {
            debug!(sort_key = %sort_key, records = page.records.len(), "Order page served from cache");
            let orders = decode_orders(&page.records);
            return Ok(Json(Envelope::ok(GetOrderResult {
                total: page.total,
                orders,
            })));
        }
        Ok(_) => {}
        Err(e) => warn!(sort_key = %sort_key, error = %e, "Cache read failed, querying source"),
    }

    let (total, orders) = state
        .orders
        .get_order(&params.to_query())
        .await
        .map_err(|e| match e {
            ServiceError::Upstream(_) => e,
            other => ServiceError::Upstream(other.to_string()),
        })?;

    if let Err(e) = populate(&state, &params, total, &orders).await {
        warn!(sort_key = %sort_key, error = %e, "Failed to cache order page");
    }

    Ok(Json(Envelope::ok(GetOrderResult { total, orders })))
}

/// Handler for GET /stats
///
/// Returns cache hit/miss and sweeper counters.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().snapshot()))
}

/// Handler for GET /health
///
/// Reports `degraded` while the remote cache does not answer a ping.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = match state.cache.tiers().remote().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Remote cache ping failed");
            false
        }
    };
    Json(HealthResponse::new(reachable))
}
