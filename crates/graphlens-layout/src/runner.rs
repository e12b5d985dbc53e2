//! Frame-driven scheduling for a [`ForceSimulation`].
//!
//! The host calls [`LayoutRunner::frame`] once per display frame. Each call runs
//! a batch of ticks sized by the current temperature, then returns control.
//! Cancellation is cooperative: a [`LoopHandle`] can be cancelled from anywhere
//! (another thread, a signal handler) and the next frame observes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use graphlens_core::{GraphEdge, NodeId, Viewport};

use crate::ForceSimulation;

/// Pause between frames when the runner drives itself.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Ticks to run in one frame at temperature `alpha`.
pub fn batch_size(alpha: f32) -> u32 {
    if alpha > 0.5 {
        8
    } else if alpha > 0.1 {
        4
    } else if alpha > 0.03 {
        2
    } else {
        1
    }
}

/// Cancellation token for one run of the frame loop.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle {
    cancelled: Arc<AtomicBool>,
}

impl LoopHandle {
    fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Outcome of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Ticks ran and the layout is still moving.
    Running { ticks: u32 },
    /// The simulation reached its iteration cap or temperature floor.
    Converged,
    /// The active loop was cancelled.
    Cancelled,
    /// No loop has been started.
    Idle,
}

/// Owns a simulation and at most one active frame loop.
///
/// `frame` takes `&mut self`, so only one driver can advance the engine at a time.
#[derive(Debug)]
pub struct LayoutRunner {
    simulation: ForceSimulation,
    active: Option<LoopHandle>,
    frame_interval: Duration,
}

impl LayoutRunner {
    pub fn new(simulation: ForceSimulation) -> Self {
        Self {
            simulation,
            active: None,
            frame_interval: FRAME_INTERVAL,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn simulation(&self) -> &ForceSimulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut ForceSimulation {
        &mut self.simulation
    }

    pub fn into_simulation(self) -> ForceSimulation {
        self.simulation
    }

    /// Start a new loop, cancelling the previous one first.
    pub fn start(&mut self) -> LoopHandle {
        self.stop();
        let handle = LoopHandle::new();
        self.active = Some(handle.clone());
        tracing::debug!(
            "Layout loop started ({} nodes, alpha {:.3})",
            self.simulation.node_count(),
            self.simulation.alpha()
        );
        handle
    }

    /// Cancel the active loop, if any.
    pub fn stop(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
    }

    /// Whether a loop is active and not cancelled.
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|h| !h.is_cancelled())
    }

    /// Run one batch of ticks.
    pub fn frame(
        &mut self,
        nodes: &[NodeId],
        edges: &[GraphEdge],
        viewport: Viewport,
    ) -> FrameStatus {
        let Some(handle) = self.active.as_ref() else {
            return FrameStatus::Idle;
        };
        if handle.is_cancelled() {
            self.active = None;
            return FrameStatus::Cancelled;
        }

        let batch = batch_size(self.simulation.alpha());
        let mut ticks = 0;
        let mut running = self.simulation.is_running();
        while running && ticks < batch {
            running = self.simulation.tick(nodes, edges, viewport);
            ticks += 1;
        }

        if running {
            tracing::debug!("Frame ran {} ticks", ticks);
            FrameStatus::Running { ticks }
        } else {
            self.active = None;
            FrameStatus::Converged
        }
    }

    /// Start a loop and drive it to completion, sleeping one frame interval
    /// between batches. Returns early if the handle is cancelled.
    pub fn run_blocking(
        &mut self,
        nodes: &[NodeId],
        edges: &[GraphEdge],
        viewport: Viewport,
    ) -> FrameStatus {
        let handle = self.start();
        self.run_with(&handle, nodes, edges, viewport)
    }

    /// Drive an already started loop until it converges or `handle` is cancelled.
    pub fn run_with(
        &mut self,
        handle: &LoopHandle,
        nodes: &[NodeId],
        edges: &[GraphEdge],
        viewport: Viewport,
    ) -> FrameStatus {
        let mut frames = 0u32;
        loop {
            if handle.is_cancelled() {
                self.stop();
                return FrameStatus::Cancelled;
            }
            match self.frame(nodes, edges, viewport) {
                FrameStatus::Running { .. } => {
                    frames += 1;
                    if !self.frame_interval.is_zero() {
                        thread::sleep(self.frame_interval);
                    }
                }
                status => {
                    tracing::debug!("Layout loop ended after {} frames: {:?}", frames, status);
                    return status;
                }
            }
        }
    }
}
