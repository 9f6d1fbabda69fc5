//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiration sweeper: reclaims expired cache locations every interval

mod sweeper;

pub use sweeper::{spawn_sweeper, SweepReport, Sweeper, SweeperHandle, SWEEP_BATCH};
