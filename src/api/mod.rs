//! API Module
//!
//! HTTP handlers and routing for the order service.
//!
//! # Endpoints
//! - `GET /order` - Paginated order lookup, cached per filter
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
