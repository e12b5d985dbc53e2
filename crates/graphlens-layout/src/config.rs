//! Simulation parameters.
//!
//! All knobs are engine-wide. The struct deserializes from partial JSON, with
//! every missing field taking its default.

use serde::{Deserialize, Serialize};

use crate::{LayoutError, Result};

/// Default Barnes-Hut accuracy parameter.
pub const DEFAULT_THETA: f32 = 0.8;

/// Default hard cap on quadtree depth.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 20;

/// Configuration for the force simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ideal edge length before hub scaling.
    pub ideal_length: f32,
    /// Spring stiffness along edges.
    pub spring_strength: f32,
    /// Barnes-Hut repulsion constant (force falls off as 1/d).
    pub repulsion: f32,
    /// Pull toward the viewport center.
    pub gravity: f32,
    /// Fraction of velocity retained per tick (0-1).
    pub damping: f32,
    /// Starting temperature after `initialize`.
    pub alpha: f32,
    /// Geometric decay applied to alpha on every tick.
    pub alpha_decay: f32,
    /// The simulation stops once alpha drops below this floor.
    pub alpha_min: f32,
    /// Hard cap on ticks since the last initialize or reheat.
    pub max_iterations: u32,
    /// Barnes-Hut theta; 0 forces exact pairwise evaluation.
    pub theta: f32,
    /// Maximum quadtree depth. Deeper bodies merge into the leaf aggregate.
    pub max_tree_depth: usize,
    /// Minimum separation enforced by the collision grid; 0 disables it.
    pub collision_distance: f32,
    /// Linear impulse per unit of penetration.
    pub collision_strength: f32,
    /// Extra pairwise repulsion among class nodes.
    pub class_repulsion: f32,
    /// Per-tick speed limit.
    pub max_velocity: f32,
    /// Positions are clamped to the viewport center plus this multiple of the viewport extent.
    pub world_scale: f32,
    /// Upper bound on the hub multiplier applied to the ideal edge length.
    pub max_hub_scale: f32,
    /// Seed for the random source. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ideal_length: 80.0,
            spring_strength: 0.08,
            repulsion: 600.0,
            gravity: 0.02,
            damping: 0.6,
            alpha: 1.0,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
            max_iterations: 300,
            theta: DEFAULT_THETA,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            collision_distance: 24.0,
            collision_strength: 0.7,
            class_repulsion: 1200.0,
            max_velocity: 40.0,
            world_scale: 4.0,
            max_hub_scale: 2.5,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Parse a config from JSON, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder-style seed setter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that every parameter is finite and in range.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("ideal_length", self.ideal_length),
            ("spring_strength", self.spring_strength),
            ("repulsion", self.repulsion),
            ("gravity", self.gravity),
            ("alpha_min", self.alpha_min),
            ("theta", self.theta),
            ("collision_distance", self.collision_distance),
            ("collision_strength", self.collision_strength),
            ("class_repulsion", self.class_repulsion),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be finite and >= 0, got {value}")));
            }
        }

        if !(0.0..=1.0).contains(&self.damping) {
            return Err(invalid(format!("damping must be in [0, 1], got {}", self.damping)));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(invalid(format!("alpha must be in (0, 1], got {}", self.alpha)));
        }
        if !(self.alpha_decay > 0.0 && self.alpha_decay < 1.0) {
            return Err(invalid(format!(
                "alpha_decay must be in (0, 1), got {}",
                self.alpha_decay
            )));
        }
        if self.alpha_min >= self.alpha {
            return Err(invalid(format!(
                "alpha_min ({}) must be below alpha ({})",
                self.alpha_min, self.alpha
            )));
        }
        if !(self.max_velocity.is_finite() && self.max_velocity > 0.0) {
            return Err(invalid(format!("max_velocity must be > 0, got {}", self.max_velocity)));
        }
        if !(self.world_scale.is_finite() && self.world_scale >= 1.0) {
            return Err(invalid(format!("world_scale must be >= 1, got {}", self.world_scale)));
        }
        if !(self.max_hub_scale.is_finite() && self.max_hub_scale >= 1.0) {
            return Err(invalid(format!(
                "max_hub_scale must be >= 1, got {}",
                self.max_hub_scale
            )));
        }
        if self.max_tree_depth == 0 {
            return Err(invalid("max_tree_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> LayoutError {
    LayoutError::InvalidConfig(message)
}
