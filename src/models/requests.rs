//! Request DTOs for the order API
//!
//! Defines the query parameters accepted by `GET /order`.

use serde::Deserialize;

use crate::source::OrderQuery;

/// Largest page a single request may ask for
pub const MAX_PAGE_SIZE: u32 = 1000;

fn default_page_size() -> u32 {
    10
}

/// Query string of `GET /order`
///
/// # Fields
/// - `pageNumber`: Zero-based page index
/// - `pageSize`: Records per page (default 10)
/// - `tradeNo`: Restrict to one order, 0 for any
/// - `userId`: Restrict to one user, 0 for any
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrderParams {
    #[serde(default)]
    pub page_number: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub trade_no: u64,
    #[serde(default)]
    pub user_id: u64,
}

impl GetOrderParams {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.page_size == 0 {
            return Some("pageSize must be at least 1".to_string());
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Some(format!("pageSize exceeds maximum of {}", MAX_PAGE_SIZE));
        }
        None
    }

    /// Sorted set key for one page of this filter combination. Page number
    /// and size are part of the key, so every cached page starts at rank 0.
    pub fn sort_key(&self) -> String {
        format!(
            "sortset:order:{}:{}:{}:{}",
            self.user_id, self.trade_no, self.page_number, self.page_size
        )
    }

    /// Rank of the last record of a full page in its sorted set (inclusive)
    pub fn last_rank(&self) -> i64 {
        i64::from(self.page_size) - 1
    }

    pub fn to_query(&self) -> OrderQuery {
        OrderQuery {
            page: self.page_number,
            size: self.page_size,
            trade_no: self.trade_no,
            user_id: self.user_id,
        }
    }
}
