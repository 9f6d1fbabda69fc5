//! Request and Response models for the order API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies, and the order
//! record itself.

pub mod order;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use order::TradeOrder;
pub use requests::{GetOrderParams, MAX_PAGE_SIZE};
pub use responses::{Envelope, GetOrderResult, HealthResponse, StatsResponse};
