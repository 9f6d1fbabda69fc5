//! Elasticsearch order source.
//!
//! Orders are mirrored from the relational table into the `trade_order`
//! index; paging uses `from`/`size` with exact total hits.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Result, ServiceError};
use crate::models::TradeOrder;
use crate::source::{OrderQuery, OrderSource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    total: TotalHits,
    #[serde(default)]
    hits: Vec<IndexHit>,
}

#[derive(Debug, Deserialize)]
struct TotalHits {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct IndexHit {
    #[serde(rename = "_source")]
    source: TradeOrder,
}

/// Order source backed by an Elasticsearch cluster.
#[derive(Debug, Clone)]
pub struct ElasticOrderSource {
    client: reqwest::Client,
    addresses: Vec<String>,
    index: String,
    credentials: Option<(String, Option<String>)>,
}

impl ElasticOrderSource {
    /// Creates a source over `addresses`, tried in order on every query.
    pub fn new(addresses: Vec<String>, index: impl Into<String>) -> Result<Self> {
        if addresses.is_empty() {
            return Err(ServiceError::Internal(
                "at least one Elasticsearch address is required".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            addresses,
            index: index.into(),
            credentials: None,
        })
    }

    /// Sends basic auth with every request.
    pub fn with_basic_auth(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.credentials = Some((user.into(), password));
        self
    }

    fn search_body(query: &OrderQuery) -> Value {
        let mut must = Vec::new();
        if query.trade_no != 0 {
            must.push(json!({ "match": { "TradeNo": query.trade_no.to_string() } }));
        }
        if query.user_id != 0 {
            must.push(json!({ "match": { "UserId": query.user_id.to_string() } }));
        }

        let mut body = json!({
            "from": query.offset(),
            "size": query.size,
        });
        if !must.is_empty() {
            body["query"] = json!({ "bool": { "must": must } });
        }
        body
    }

    async fn search(&self, address: &str, body: &Value) -> Result<SearchResponse> {
        let url = format!("{}/{}/_search?track_total_hits=true", address, self.index);
        let mut request = self.client.post(&url).json(body);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream(format!(
                "{} answered {}: {}",
                url, status, detail
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl OrderSource for ElasticOrderSource {
    async fn get_order(&self, query: &OrderQuery) -> Result<(i64, Vec<TradeOrder>)> {
        let body = Self::search_body(query);
        let mut last_error = None;

        for address in &self.addresses {
            match self.search(address, &body).await {
                Ok(found) => {
                    let orders: Vec<TradeOrder> =
                        found.hits.hits.into_iter().map(|hit| hit.source).collect();
                    debug!(
                        address = %address,
                        total = found.hits.total.value,
                        returned = orders.len(),
                        "Order search finished"
                    );
                    return Ok((found.hits.total.value, orders));
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "Order search failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ServiceError::Upstream("no Elasticsearch address".to_string())))
    }
}
