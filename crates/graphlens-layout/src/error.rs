//! Error types for layout operations.
//!
//! Numerical trouble never surfaces here; the engine heals itself. These
//! variants cover caller mistakes only.

use graphlens_core::NodeId;
use thiserror::Error;

/// Errors that can occur during layout operations.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// A node referenced by id is not part of the simulation.
    #[error("node not found in simulation: {0}")]
    NodeNotFound(NodeId),

    /// A configuration value is out of range.
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}
