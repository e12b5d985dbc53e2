//! Incremental force-directed graph layout.
//!
//! This crate computes 2D positions for an arbitrary node/edge graph. It is
//! driven one tick at a time by a host frame loop and exposes positions keyed
//! by [`NodeId`](graphlens_core::NodeId).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ForceSimulation::tick                   │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────────┐     │
//! │  │ Node arena  │──▶│  Quadtree   │──▶│ Repulsion (BH)  │     │
//! │  │ (flat Vecs) │   │ (rebuilt)   │   │ + class forces  │     │
//! │  └─────────────┘   └─────────────┘   └─────────────────┘     │
//! │          │                                    │              │
//! │          ▼                                    ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────────┐     │
//! │  │  Springs +  │──▶│ Hash-grid   │──▶│   Integrate     │     │
//! │  │  gravity    │   │ collisions  │   │ (damped, alpha) │     │
//! │  └─────────────┘   └─────────────┘   └─────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!             LayoutRunner: batches of ticks per frame
//! ```
//!
//! ## Performance
//!
//! - Naive pairwise repulsion: O(n²) per tick
//! - Barnes-Hut approximation: O(n log n) per tick
//! - Collision grid: O(n) average per tick
//!
//! Scratch buffers (flat coordinates, quadtree arena, grid buckets) are reused
//! between ticks, so a steady-state tick does not allocate.

mod collision;
mod config;
mod error;
mod quadtree;
mod runner;
mod simulation;

pub use collision::{CellKey, CollisionGrid};
pub use config::{SimulationConfig, DEFAULT_MAX_TREE_DEPTH, DEFAULT_THETA};
pub use error::LayoutError;
pub use quadtree::{QuadNode, QuadTree};
pub use runner::{batch_size, FrameStatus, LayoutRunner, LoopHandle, FRAME_INTERVAL};
pub use simulation::{
    hub_length_scale, recommended_warmup_iterations, AxisOrientation, ForceSimulation,
    NodePosition, TimelineAxis,
};

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
