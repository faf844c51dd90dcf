//! Simulation configuration

use serde::{Deserialize, Serialize};

/// Hard ceiling on subcircuit nesting
///
/// Each nesting level is a native stack frame of the evaluator, so larger
/// `max_depth` values are clamped to this.
pub const MAX_DEPTH_LIMIT: usize = 64;

/// Limits and cache behaviour for a [`crate::Simulator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Maximum sweeps when settling a template's internal feedback
    pub max_iterations: usize,
    /// Maximum subcircuit nesting depth, at most [`MAX_DEPTH_LIMIT`]
    pub max_depth: usize,
    /// Number of (template, inputs) results kept by the cache
    pub cache_capacity: usize,
    /// Skip the cache and evaluate every subcircuit in real time
    pub force_realtime: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            max_iterations: 10,
            max_depth: 10,
            cache_capacity: 1000,
            force_realtime: false,
        }
    }
}

impl SimulationConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.min(MAX_DEPTH_LIMIT);
        self
    }

    /// Nesting cap actually enforced, covering values set directly or
    /// deserialized past the limit
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.min(MAX_DEPTH_LIMIT)
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_realtime(mut self, force_realtime: bool) -> Self {
        self.force_realtime = force_realtime;
        self
    }
}
