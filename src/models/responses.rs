//! Response DTOs for the order API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::StatsSnapshot;
use crate::models::TradeOrder;

/// Envelope wrapping every `/order` response, success or failure.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    /// HTTP status code mirrored in the body
    pub code: u16,
    /// Empty on success, error description otherwise
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Payload of a successful `GET /order`
#[derive(Debug, Clone, Serialize)]
pub struct GetOrderResult {
    /// Total records matching the filter, across all pages
    pub total: i64,
    pub orders: Vec<TradeOrder>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" when the remote cache is unreachable
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn new(cache_reachable: bool) -> Self {
        let status = if cache_reachable { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub range_hits: u64,
    pub range_misses: u64,
    pub populations: u64,
    pub reclaimed: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(stats: StatsSnapshot) -> Self {
        Self {
            range_hits: stats.range_hits,
            range_misses: stats.range_misses,
            populations: stats.populations,
            reclaimed: stats.reclaimed,
            hit_rate: stats.hit_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_ok_serialize() {
        let resp = Envelope::ok(GetOrderResult {
            total: 0,
            orders: vec![],
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 200);
        assert_eq!(json["message"], "");
        assert_eq!(json["data"]["total"], 0);
    }

    #[test]
    fn test_envelope_error_serialize() {
        let resp = Envelope::<()>::error(400, "bad pageSize");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], 400);
        assert_eq!(json["message"], "bad pageSize");
        assert!(json["data"].is_null());
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let resp = StatsResponse::from(StatsSnapshot {
            range_hits: 80,
            range_misses: 20,
            populations: 5,
            reclaimed: 1,
        });
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::new(true);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert_eq!(HealthResponse::new(false).status, "degraded");
    }
}
