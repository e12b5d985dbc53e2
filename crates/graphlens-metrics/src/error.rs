//! Error types for the metrics computer.
//!
//! Numerical results never fail; only configuration can.

use thiserror::Error;

/// Errors that can occur when configuring metrics computation.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A configuration value is out of range.
    #[error("invalid metrics config: {message}")]
    InvalidConfig { message: String },

    /// Configuration could not be parsed.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}
