//! Event-driven credit proposal evaluation.
//!
//! The account side stores proposals and announces them on a queue; the risk-analysis side
//! consumes those announcements, runs the risk rules and answers with stage events that move
//! each proposal through its lifecycle.

pub mod config;
pub mod error;
pub mod events;
pub mod queue;
pub mod shutdown;
pub mod telemetry;
pub mod workflows;

pub use error::AppError;
