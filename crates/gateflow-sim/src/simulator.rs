//! Simulation orchestrator
//!
//! A pass runs in fixed phases with no state carried between calls except
//! the [`SimulationCache`]:
//!
//! 1. index the snapshot, rejecting malformed input
//! 2. validate arity and detect top-level feedback (warnings only)
//! 3. reset every wire to 0 and seed INPUT/CLOCK outputs
//! 4. evaluate each gate once in dependency order, driving outgoing wires
//! 5. collect the signal map and warnings

use crate::cache::{CacheStats, SimulationCache};
use crate::config::SimulationConfig;
use crate::error::SimulationResult;
use crate::graph::IndexedCircuit;
use crate::resolver::{loop_members, resolve};
use crate::signal::SignalMap;
use crate::state::CircuitState;
use crate::subcircuit::SubcircuitEvaluator;
use crate::warning::{SimWarning, WarningKind, Warnings};
use gateflow_netlist::{Gate, GateId, TemplateId, TemplateResolver, Wire, WireId};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Work counters for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    /// Gate evaluations at every nesting level
    pub gates_evaluated: usize,
    /// Template interiors actually simulated (cache misses or bypasses)
    pub subcircuit_evaluations: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Deepest subcircuit nesting reached, 0 for a flat circuit
    pub deepest_nesting: usize,
}

/// Everything a pass produces
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutcome {
    pub signals: SignalMap,
    /// Evaluation order used for the top-level gates
    pub order: Vec<GateId>,
    /// Top-level wires that closed a feedback loop
    pub feedback: Vec<WireId>,
    pub warnings: Vec<SimWarning>,
    pub stats: PassStats,
}

impl SimulationOutcome {
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &SimWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// Circuit simulator
///
/// Owns the configuration and the subcircuit result cache. The cache is the
/// only state that survives between [`Simulator::simulate`] calls; callers
/// sharing one simulator across threads must serialize access (e.g. behind a
/// `Mutex`).
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimulationConfig,
    cache: SimulationCache,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Self {
        let cache = SimulationCache::new(config.cache_capacity);
        Self { config, cache }
    }

    /// Use an existing cache instead of creating one from the config
    pub fn with_cache(mut self, cache: SimulationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn cache(&self) -> &SimulationCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SimulationCache {
        &mut self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop cached results for a template whose definition changed
    pub fn invalidate_template(&mut self, template: &TemplateId) -> usize {
        self.cache.invalidate_template(template)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Toggle forced real-time evaluation (cache bypass)
    pub fn set_realtime(&mut self, force_realtime: bool) {
        self.config.force_realtime = force_realtime;
    }

    /// Run one pass over a gate/wire snapshot
    ///
    /// Recoverable topology issues end up in the outcome's warnings; only
    /// malformed input (duplicate ids, dangling wires, fan-in above one)
    /// is returned as an error.
    pub fn simulate(
        &mut self,
        gates: &[Gate],
        wires: &[Wire],
        templates: &dyn TemplateResolver,
    ) -> SimulationResult<SimulationOutcome> {
        let circuit = IndexedCircuit::build(gates, wires)?;
        debug!(gates = gates.len(), wires = wires.len(), "indexed circuit");

        let mut warnings = Warnings::new();
        validate_arity(&circuit, &mut warnings);

        let resolved = resolve(&circuit);
        for &wire in &resolved.feedback {
            let members: Vec<&str> = loop_members(&circuit, wire)
                .into_iter()
                .map(|g| circuit.gate(g).id.as_str())
                .collect();
            warnings.push(SimWarning::new(
                WarningKind::Cycle,
                circuit.wire(wire).id.as_str(),
                format!(
                    "wire closes a feedback loop through {}; its destination reads 0 until the driver is evaluated",
                    members.join(", ")
                ),
            ));
        }
        debug!(feedback = resolved.feedback.len(), "resolved evaluation order");

        let mut state = CircuitState::reset(&circuit);
        let mut evaluator = SubcircuitEvaluator::new(&self.config, &mut self.cache, templates);
        evaluator.sweep(&circuit, &resolved.order, &mut state, 0)?;
        let (nested, stats) = evaluator.finish();
        warnings.extend(nested.into_vec());
        debug!(
            evaluated = stats.gates_evaluated,
            cache_hits = stats.cache_hits,
            "evaluated circuit"
        );

        let signals = collect_signals(&circuit, state);
        let warnings = warnings.into_vec();
        for warning in &warnings {
            warn!(kind = %warning.kind, subject = %warning.subject, "{}", warning.message);
        }
        info!(
            gates = gates.len(),
            warnings = warnings.len(),
            subcircuits = stats.subcircuit_evaluations,
            "simulation pass complete"
        );

        Ok(SimulationOutcome {
            signals,
            order: resolved.gate_ids(&circuit),
            feedback: resolved.feedback_ids(&circuit),
            warnings,
            stats,
        })
    }
}

/// Flag gates with fewer wired inputs than their kind needs
fn validate_arity(circuit: &IndexedCircuit<'_>, warnings: &mut Warnings) {
    for (idx, gate) in circuit.gates().iter().enumerate() {
        let wired = circuit.wired_inputs(idx);
        let needed = gate.min_inputs();
        if wired < needed {
            warnings.push(SimWarning::new(
                WarningKind::Structural,
                gate.id.as_str(),
                format!(
                    "{} gate has {} of {} inputs wired; missing inputs read 0",
                    gate.kind, wired, needed
                ),
            ));
        }
    }
}

fn collect_signals(circuit: &IndexedCircuit<'_>, state: CircuitState) -> SignalMap {
    let (outputs, wire_bits) = state.into_parts();
    let mut signals = SignalMap::new();
    for (wire, bit) in circuit.wires().iter().zip(wire_bits) {
        signals.set_wire(wire.id.clone(), bit);
    }
    for (gate, bits) in circuit.gates().iter().zip(outputs) {
        signals.set_gate(gate.id.clone(), bits);
    }
    signals
}
