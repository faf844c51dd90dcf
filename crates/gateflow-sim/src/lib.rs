//! Gate-level simulation engine for gateflow circuits
//!
//! Turns a snapshot of gates and wires, possibly cyclic and possibly built
//! from nested subcircuit templates, into a deterministic signal map plus a
//! list of recoverable warnings.

pub mod cache;
pub mod clock_manager;
pub mod config;
pub mod error;
pub mod gate_eval;
pub mod graph;
pub mod resolver;
pub mod signal;
pub mod simulator;
pub mod state;
pub mod subcircuit;
pub mod warning;

pub use cache::{CacheEntry, CacheKey, CacheStats, CachedResult, SimulationCache};
pub use clock_manager::{ClockEdge, ClockInfo, ClockManager};
pub use config::{SimulationConfig, MAX_DEPTH_LIMIT};
pub use error::{SimError, SimulationResult};
pub use gate_eval::{bits_to_value, evaluate_primitive, value_to_bits};
pub use graph::IndexedCircuit;
pub use resolver::{loop_members, resolve, resolve_order, EvaluationOrder};
pub use signal::SignalMap;
pub use simulator::{PassStats, SimulationOutcome, Simulator};
pub use subcircuit::SubcircuitEvaluator;
pub use warning::{SimWarning, WarningKind, Warnings};
