//! Graph analytics for Graphlens documents.
//!
//! [`compute`] turns a node/edge set into three maps keyed by
//! [`NodeId`](graphlens_core::NodeId): degree, PageRank and a community label.
//! [`select_backbone`] derives from those the subset of nodes to keep when a
//! graph is too dense to draw whole.
//!
//! Everything here is a pure function of its input. Community detection is
//! randomized but seeded, so the same graph and seed always give the same
//! labels.
//!
//! ```
//! use graphlens_core::{GraphDocumentBuilder, NodeId};
//! use graphlens_metrics::{compute, select_backbone};
//!
//! let doc = GraphDocumentBuilder::new()
//!     .edge("a", "b")
//!     .edge("b", "c")
//!     .edge("c", "a")
//!     .build();
//! let metrics = compute(&doc.node_ids(), &doc.edges);
//! assert_eq!(metrics.degree[&NodeId::from("a")], 2.0);
//! assert_eq!(select_backbone(&doc, &metrics).len(), 3);
//! ```

mod backbone;
mod community;
mod config;
mod error;
mod metrics;
mod pagerank;
mod rng;

pub use backbone::{backbone_size, select_backbone, BACKBONE_MIN_NODES};
pub use config::{MetricsConfig, DEFAULT_COMMUNITY_SEED, DEFAULT_DAMPING};
pub use error::MetricsError;
pub use metrics::{compute, compute_with, GraphMetrics};
pub use rng::XorShift128Plus;

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
