//! Subcircuit Evaluator
//!
//! Produces the outputs of a SUBCIRCUIT instance by simulating its template's
//! internal graph:
//!
//! 1. **Input binding** - each instance input bit replaces the stored value
//!    of the internal INPUT/CLOCK gate it is bound to, or drives the bound
//!    input port of any other gate.
//! 2. **Stabilization** - internal gates are evaluated in dependency order.
//!    A graph without feedback needs one sweep; with feedback, sweeps repeat
//!    until a sweep changes no gate output or `max_iterations` sweeps ran.
//! 3. **Recursion** - internal SUBCIRCUIT gates are evaluated through this
//!    same evaluator one level deeper. Past `max_depth` only that branch is
//!    abandoned and reads all-zero.
//! 4. **Output extraction** - the output bindings are read from the settled
//!    internal state.
//!
//! Results are looked up in and stored to the [`SimulationCache`] unless
//! real-time evaluation is forced or the template opts out. Each cached result
//! records how many levels it nested below its instance, and a hit is only
//! served where that many levels remain under the depth cap. Results that hit
//! the recursion limit depend on the nesting depth they were computed at and
//! are never cached.

use crate::cache::{CacheKey, CachedResult, SimulationCache};
use crate::config::SimulationConfig;
use crate::error::{SimError, SimulationResult};
use crate::gate_eval::evaluate_primitive;
use crate::graph::IndexedCircuit;
use crate::resolver::{resolve, EvaluationOrder};
use crate::simulator::PassStats;
use crate::state::CircuitState;
use crate::warning::{SimWarning, WarningKind, Warnings};
use gateflow_netlist::{Gate, PortRef, Template, TemplateId, TemplateResolver};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Where an instance input bit enters the template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputBinding {
    /// Replaces the stored value of an INPUT/CLOCK gate
    Source(usize),
    /// Drives an input port of any other gate
    Port { gate: usize, port: usize },
}

/// A template's internal graph, indexed and ordered once per pass
#[derive(Debug)]
struct CompiledTemplate<'t> {
    circuit: IndexedCircuit<'t>,
    order: EvaluationOrder,
    inputs: Vec<Option<InputBinding>>,
    outputs: Vec<Option<(usize, usize)>>,
    /// Bindings that name unknown internal gates
    binding_warnings: Vec<SimWarning>,
}

impl<'t> CompiledTemplate<'t> {
    fn compile(template: &'t Template) -> SimulationResult<Self> {
        let circuit = IndexedCircuit::build(&template.gates, &template.wires).map_err(|err| {
            SimError::MalformedTemplate {
                template: template.id.clone(),
                source: Box::new(err),
            }
        })?;
        let order = resolve(&circuit);
        let mut binding_warnings = Vec::new();

        let mut locate = |direction: &str, name: &str, binding: &PortRef| {
            let found = circuit.index_of(&binding.gate);
            if found.is_none() {
                binding_warnings.push(SimWarning::new(
                    WarningKind::Structural,
                    "",
                    format!(
                        "{} port '{}' of template {} is bound to unknown gate {}",
                        direction, name, template.id, binding.gate
                    ),
                ));
            }
            found
        };

        let inputs = template
            .inputs
            .iter()
            .map(|port| {
                locate("input", &port.name, &port.binding).map(|gate| {
                    if circuit.gate(gate).kind.is_source() {
                        InputBinding::Source(gate)
                    } else {
                        InputBinding::Port {
                            gate,
                            port: port.binding.port,
                        }
                    }
                })
            })
            .collect();
        let outputs = template
            .outputs
            .iter()
            .map(|port| {
                locate("output", &port.name, &port.binding).map(|gate| (gate, port.binding.port))
            })
            .collect();

        debug!(
            template = %template.id,
            gates = circuit.gate_count(),
            wires = circuit.wire_count(),
            feedback = order.feedback.len(),
            "compiled template"
        );

        Ok(Self {
            circuit,
            order,
            inputs,
            outputs,
            binding_warnings,
        })
    }
}

/// Evaluates gates and SUBCIRCUIT instances for one simulation pass
///
/// Holds the pass-wide context: limits, the shared cache, the template
/// resolver, memoised template compilations, and the warnings and counters
/// accumulated so far.
pub struct SubcircuitEvaluator<'a> {
    config: &'a SimulationConfig,
    cache: &'a mut SimulationCache,
    templates: &'a dyn TemplateResolver,
    compiled: HashMap<(TemplateId, u64), Rc<CompiledTemplate<'a>>>,
    warnings: Warnings,
    stats: PassStats,
    /// Deepest level reached inside the instance being evaluated
    reached: usize,
}

impl<'a> SubcircuitEvaluator<'a> {
    pub fn new(
        config: &'a SimulationConfig,
        cache: &'a mut SimulationCache,
        templates: &'a dyn TemplateResolver,
    ) -> Self {
        Self {
            config,
            cache,
            templates,
            compiled: HashMap::new(),
            warnings: Warnings::new(),
            stats: PassStats::default(),
            reached: 0,
        }
    }

    /// Consume the evaluator, returning warnings and counters
    pub fn finish(self) -> (Warnings, PassStats) {
        (self.warnings, self.stats)
    }

    /// Evaluate every gate of `order` once, committing outputs as it goes
    ///
    /// `depth` is the nesting level of the circuit being swept (0 for the
    /// top level). Returns true if any gate output changed.
    pub fn sweep(
        &mut self,
        circuit: &IndexedCircuit<'_>,
        order: &[usize],
        state: &mut CircuitState,
        depth: usize,
    ) -> SimulationResult<bool> {
        let mut changed = false;
        for &idx in order {
            let gate = circuit.gate(idx);
            let inputs = state.gather_inputs(circuit, idx);
            let outputs = match evaluate_primitive(gate.kind, &inputs, state.stored(idx)) {
                Some(bit) => vec![bit],
                None => self.evaluate_instance(gate, &inputs, depth + 1)?,
            };
            trace!(gate = %gate.id, kind = %gate.kind, ?inputs, ?outputs, depth, "evaluated");
            self.stats.gates_evaluated += 1;
            changed |= state.commit(circuit, idx, outputs);
        }
        Ok(changed)
    }

    /// Evaluate a SUBCIRCUIT instance at nesting level `depth` (1 for an
    /// instance placed directly in the top-level circuit)
    ///
    /// Always yields `gate.output_arity()` bits; unresolvable templates,
    /// arity mismatches and depth overruns yield zeros plus a warning.
    pub fn evaluate_instance(
        &mut self,
        gate: &Gate,
        inputs: &[bool],
        depth: usize,
    ) -> SimulationResult<Vec<bool>> {
        let width = gate.output_arity();
        let max_depth = self.config.effective_max_depth();
        self.note_reached(depth);

        if depth > max_depth {
            self.warnings.push(SimWarning::new(
                WarningKind::RecursionLimit,
                gate.id.as_str(),
                format!(
                    "subcircuit nesting depth {} exceeds the limit of {}; outputs forced to 0",
                    depth, max_depth
                ),
            ));
            return Ok(vec![false; width]);
        }

        let templates = self.templates;
        let template = match gate.template.as_ref() {
            Some(id) => match templates.get_template(id) {
                Some(template) => template,
                None => {
                    self.warnings.push(SimWarning::new(
                        WarningKind::MissingTemplate,
                        gate.id.as_str(),
                        format!("unknown template {}; outputs forced to 0", id),
                    ));
                    return Ok(vec![false; width]);
                }
            },
            None => {
                self.warnings.push(SimWarning::new(
                    WarningKind::MissingTemplate,
                    gate.id.as_str(),
                    "subcircuit has no template reference; outputs forced to 0",
                ));
                return Ok(vec![false; width]);
            }
        };

        if template.input_count() != inputs.len() || template.output_count() != width {
            self.warnings.push(SimWarning::new(
                WarningKind::Structural,
                gate.id.as_str(),
                format!(
                    "instance has {} inputs and {} outputs but template {} declares {} and {}; outputs forced to 0",
                    inputs.len(),
                    width,
                    template.id,
                    template.input_count(),
                    template.output_count()
                ),
            ));
            return Ok(vec![false; width]);
        }

        let key = (!self.config.force_realtime && template.cacheable)
            .then(|| CacheKey::new(template, inputs));
        if let Some(key) = &key {
            // A hit must not nest past the cap from this depth
            if let Some(hit) = self.cache.lookup_within(key, max_depth - depth) {
                self.stats.cache_hits += 1;
                self.note_reached(depth + hit.height);
                self.merge_nested(hit.warnings, gate);
                return Ok(hit.outputs);
            }
            self.stats.cache_misses += 1;
        }

        // Collect the template's own warnings separately so they can be
        // cached relative to the instance
        let outer = std::mem::take(&mut self.warnings);
        let outer_reached = std::mem::replace(&mut self.reached, depth);
        let result = self.simulate_template(template, inputs, depth);
        let inner = std::mem::replace(&mut self.warnings, outer).into_vec();
        let height = self.reached - depth;
        self.reached = self.reached.max(outer_reached);
        let outputs = result?;

        if let Some(key) = key {
            if depth + height <= max_depth {
                self.cache.insert(
                    key,
                    CachedResult {
                        outputs: outputs.clone(),
                        warnings: inner.clone(),
                        height,
                    },
                );
            }
        }
        self.merge_nested(inner, gate);
        Ok(outputs)
    }

    fn note_reached(&mut self, depth: usize) {
        self.reached = self.reached.max(depth);
        self.stats.deepest_nesting = self.stats.deepest_nesting.max(depth);
    }

    fn merge_nested(&mut self, warnings: Vec<SimWarning>, gate: &Gate) {
        for warning in warnings {
            self.warnings.push(warning.nested_under(gate.id.as_str()));
        }
    }

    fn compile(&mut self, template: &'a Template) -> SimulationResult<Rc<CompiledTemplate<'a>>> {
        let key = (template.id.clone(), template.version);
        if let Some(compiled) = self.compiled.get(&key) {
            return Ok(Rc::clone(compiled));
        }
        let compiled = Rc::new(CompiledTemplate::compile(template)?);
        self.compiled.insert(key, Rc::clone(&compiled));
        Ok(compiled)
    }

    /// Run a template's internal graph to a fixed point for one input vector
    fn simulate_template(
        &mut self,
        template: &'a Template,
        inputs: &[bool],
        depth: usize,
    ) -> SimulationResult<Vec<bool>> {
        self.stats.subcircuit_evaluations += 1;
        let compiled = self.compile(template)?;

        let circuit = &compiled.circuit;
        let mut state = CircuitState::reset(circuit);
        for (binding, &bit) in compiled.inputs.iter().zip(inputs) {
            match binding {
                Some(InputBinding::Source(gate)) => state.set_stored(*gate, bit),
                Some(InputBinding::Port { gate, port }) => state.pin_input(*gate, *port, bit),
                None => {}
            }
        }

        let acyclic = compiled.order.is_acyclic();
        let max_sweeps = if acyclic {
            1
        } else {
            self.config.max_iterations.max(1)
        };
        let mut converged = acyclic;
        let mut sweeps = 0;
        while sweeps < max_sweeps {
            sweeps += 1;
            // Only the settled sweep's nested warnings describe the result
            self.warnings = Warnings::new();
            if !self.sweep(circuit, &compiled.order.order, &mut state, depth)? {
                converged = true;
                break;
            }
        }
        let swept = std::mem::take(&mut self.warnings);
        self.warnings
            .extend(compiled.binding_warnings.iter().cloned());
        self.warnings.extend(swept.into_vec());

        trace!(template = %template.id, depth, sweeps, converged, "template settled");
        if !converged {
            self.warnings.push(SimWarning::new(
                WarningKind::NonConvergence,
                "",
                format!(
                    "template {} did not stabilize within {} iterations; returning last values",
                    template.id, max_sweeps
                ),
            ));
        }

        Ok(compiled
            .outputs
            .iter()
            .map(|binding| binding.map_or(false, |(gate, port)| state.output(gate, port)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_DEPTH_LIMIT;
    use gateflow_netlist::{GateKind, TemplateLibrary, Wire};

    fn half_adder() -> Template {
        Template::new("half_adder")
            .with_gate(Gate::input("a", false))
            .with_gate(Gate::input("b", false))
            .with_gate(Gate::new("xor", GateKind::Xor))
            .with_gate(Gate::new("and", GateKind::And))
            .with_gate(Gate::output("sum"))
            .with_gate(Gate::output("carry"))
            .with_wire(Wire::connect("w0", "a", 0, "xor", 0))
            .with_wire(Wire::connect("w1", "b", 0, "xor", 1))
            .with_wire(Wire::connect("w2", "a", 0, "and", 0))
            .with_wire(Wire::connect("w3", "b", 0, "and", 1))
            .with_wire(Wire::connect("w4", "xor", 0, "sum", 0))
            .with_wire(Wire::connect("w5", "and", 0, "carry", 0))
            .with_input("A", PortRef::new("a", 0))
            .with_input("B", PortRef::new("b", 0))
            .with_output("Sum", PortRef::new("sum", 0))
            .with_output("Carry", PortRef::new("carry", 0))
    }

    fn sr_latch() -> Template {
        Template::new("sr_latch")
            .with_gate(Gate::input("s", false))
            .with_gate(Gate::input("r", false))
            .with_gate(Gate::new("q", GateKind::Nor))
            .with_gate(Gate::new("qb", GateKind::Nor))
            .with_wire(Wire::connect("w0", "r", 0, "q", 0))
            .with_wire(Wire::connect("w1", "qb", 0, "q", 1))
            .with_wire(Wire::connect("w2", "s", 0, "qb", 0))
            .with_wire(Wire::connect("w3", "q", 0, "qb", 1))
            .with_input("S", PortRef::new("s", 0))
            .with_input("R", PortRef::new("r", 0))
            .with_output("Q", PortRef::new("q", 0))
            .with_output("Qn", PortRef::new("qb", 0))
    }

    fn oscillator() -> Template {
        Template::new("osc")
            .with_gate(Gate::new("n", GateKind::Not))
            .with_wire(Wire::connect("w0", "n", 0, "n", 0))
            .with_output("Y", PortRef::new("n", 0))
    }

    /// Inverts its input, then feeds it through another instance of itself
    fn self_referential() -> Template {
        Template::new("forever")
            .with_gate(Gate::input("a", false))
            .with_gate(Gate::new("n", GateKind::Not))
            .with_gate(Gate::subcircuit("inner", "forever", 1, 1))
            .with_wire(Wire::connect("w0", "a", 0, "n", 0))
            .with_wire(Wire::connect("w1", "n", 0, "inner", 0))
            .with_input("A", PortRef::new("a", 0))
            .with_output("Y", PortRef::new("inner", 0))
    }

    /// NOT gate driven straight from the instance input
    fn leaf() -> Template {
        Template::new("leaf")
            .with_gate(Gate::new("n", GateKind::Not))
            .with_input("A", PortRef::new("n", 0))
            .with_output("Y", PortRef::new("n", 0))
    }

    /// One instance of `inner`, passing the input through
    fn wrapper(id: &str, inner: &str) -> Template {
        Template::new(id)
            .with_gate(Gate::input("a", false))
            .with_gate(Gate::subcircuit("sub", inner, 1, 1))
            .with_wire(Wire::connect("w0", "a", 0, "sub", 0))
            .with_input("A", PortRef::new("a", 0))
            .with_output("Y", PortRef::new("sub", 0))
    }

    /// NAND fed back into itself: oscillates while enabled, settles to 1 otherwise
    fn gated_oscillator() -> Template {
        Template::new("osc_en")
            .with_gate(Gate::input("en", false))
            .with_gate(Gate::new("nand", GateKind::Nand))
            .with_wire(Wire::connect("w0", "en", 0, "nand", 0))
            .with_wire(Wire::connect("w1", "nand", 0, "nand", 1))
            .with_input("EN", PortRef::new("en", 0))
            .with_output("Y", PortRef::new("nand", 0))
    }

    /// Enables the oscillator only in the first sweep: `en` reads the reset
    /// value of `x` through the feedback wire before `x` latches high
    fn first_sweep_enable() -> Template {
        Template::new("latched")
            .with_gate(Gate::new("x", GateKind::Or))
            .with_gate(Gate::new("en", GateKind::Not))
            .with_gate(Gate::subcircuit("osc", "osc_en", 1, 1))
            .with_gate(Gate::input("a", false))
            .with_wire(Wire::connect("w0", "a", 0, "x", 0))
            .with_wire(Wire::connect("w1", "en", 0, "x", 1))
            .with_wire(Wire::connect("w2", "x", 0, "en", 0))
            .with_wire(Wire::connect("w3", "en", 0, "osc", 0))
            .with_input("A", PortRef::new("a", 0))
            .with_output("Y", PortRef::new("osc", 0))
    }

    struct Harness {
        config: SimulationConfig,
        cache: SimulationCache,
        library: TemplateLibrary,
    }

    impl Harness {
        fn new(templates: Vec<Template>) -> Self {
            Self::with_config(templates, SimulationConfig::default())
        }

        fn with_config(templates: Vec<Template>, config: SimulationConfig) -> Self {
            Self {
                cache: SimulationCache::new(config.cache_capacity),
                config,
                library: templates.into_iter().collect(),
            }
        }

        fn eval(&mut self, gate: &Gate, inputs: &[bool]) -> (Vec<bool>, Warnings, PassStats) {
            let mut evaluator = SubcircuitEvaluator::new(&self.config, &mut self.cache, &self.library);
            let outputs = evaluator.evaluate_instance(gate, inputs, 1).unwrap();
            let (warnings, stats) = evaluator.finish();
            (outputs, warnings, stats)
        }
    }

    #[test]
    fn test_half_adder() {
        let mut h = Harness::new(vec![half_adder()]);
        let gate = half_adder().instantiate("ha");

        let (out, warnings, _) = h.eval(&gate, &[true, true]);
        assert_eq!(out, vec![false, true]);
        assert!(warnings.is_empty());

        let (out, _, _) = h.eval(&gate, &[true, false]);
        assert_eq!(out, vec![true, false]);
    }

    #[test]
    fn test_second_call_served_from_cache() {
        let mut h = Harness::new(vec![half_adder()]);
        let gate = half_adder().instantiate("ha");

        let (first, _, stats) = h.eval(&gate, &[false, true]);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.subcircuit_evaluations, 1);

        let (second, _, stats) = h.eval(&gate, &[false, true]);
        assert_eq!(first, second);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.subcircuit_evaluations, 0);

        let key = CacheKey::new(&half_adder(), &[false, true]);
        assert_eq!(h.cache.entry(&key).unwrap().hits, 1);
    }

    #[test]
    fn test_realtime_bypasses_cache() {
        let config = SimulationConfig::default().with_realtime(true);
        let mut h = Harness::with_config(vec![half_adder()], config);
        let gate = half_adder().instantiate("ha");
        h.eval(&gate, &[true, true]);
        let (out, _, stats) = h.eval(&gate, &[true, true]);
        assert_eq!(out, vec![false, true]);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.subcircuit_evaluations, 1);
        assert!(h.cache.is_empty());
    }

    #[test]
    fn test_uncached_template_bypasses_cache() {
        let mut h = Harness::new(vec![half_adder().uncached()]);
        let gate = half_adder().instantiate("ha");
        h.eval(&gate, &[true, true]);
        h.eval(&gate, &[true, true]);
        assert!(h.cache.is_empty());
        assert_eq!(h.cache.stats().hits + h.cache.stats().misses, 0);
    }

    #[test]
    fn test_sr_latch_settles() {
        let mut h = Harness::new(vec![sr_latch()]);
        let gate = sr_latch().instantiate("latch");

        let (set, warnings, _) = h.eval(&gate, &[true, false]);
        assert_eq!(set, vec![true, false]);
        assert!(warnings.is_empty());

        let (reset, warnings, _) = h.eval(&gate, &[false, true]);
        assert_eq!(reset, vec![false, true]);
        assert!(warnings.is_empty());

        let (idle, warnings, _) = h.eval(&gate, &[false, false]);
        assert_eq!(idle, vec![false, true]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_oscillator_reports_non_convergence() {
        let mut h = Harness::new(vec![oscillator()]);
        let gate = oscillator().instantiate("osc1");

        let (out, warnings, stats) = h.eval(&gate, &[]);
        // Ten sweeps from 0: odd sweeps drive 1, even sweeps drive 0
        assert_eq!(out, vec![false]);
        assert_eq!(stats.gates_evaluated, 10);
        let warning = warnings.iter().next().unwrap();
        assert_eq!(warning.kind, WarningKind::NonConvergence);
        assert_eq!(warning.subject, "osc1");

        // Replayed from the cache on the next call
        let (again, warnings, stats) = h.eval(&gate, &[]);
        assert_eq!(again, out);
        assert_eq!(stats.cache_hits, 1);
        assert!(warnings.contains_kind(WarningKind::NonConvergence));
    }

    #[test]
    fn test_iteration_cap_is_configurable() {
        let config = SimulationConfig::default().with_max_iterations(3);
        let mut h = Harness::with_config(vec![oscillator()], config);
        let (out, warnings, stats) = h.eval(&oscillator().instantiate("osc1"), &[]);
        assert_eq!(out, vec![true]);
        assert_eq!(stats.gates_evaluated, 3);
        assert!(warnings.contains_kind(WarningKind::NonConvergence));
    }

    #[test]
    fn test_recursion_limit_terminates() {
        let mut h = Harness::new(vec![self_referential()]);
        let gate = self_referential().instantiate("top");

        let (out, warnings, stats) = h.eval(&gate, &[true]);
        assert_eq!(out, vec![false]);
        assert_eq!(stats.deepest_nesting, 11);
        assert_eq!(stats.subcircuit_evaluations, 10);

        let limit: Vec<_> = warnings
            .iter()
            .filter(|w| w.kind == WarningKind::RecursionLimit)
            .collect();
        assert_eq!(limit.len(), 1);
        assert_eq!(limit[0].subject, format!("top{}", "/inner".repeat(10)));

        // Depth-dependent results stay out of the cache
        assert!(h.cache.is_empty());
    }

    #[test]
    fn test_recursion_ceiling_applies_to_unclamped_config() {
        let mut config = SimulationConfig::default();
        config.max_depth = usize::MAX;
        let mut h = Harness::with_config(vec![self_referential()], config);

        let (out, warnings, stats) = h.eval(&self_referential().instantiate("top"), &[true]);
        assert_eq!(out, vec![false]);
        assert_eq!(stats.deepest_nesting, MAX_DEPTH_LIMIT + 1);
        assert_eq!(stats.subcircuit_evaluations, MAX_DEPTH_LIMIT);
        assert!(warnings.contains_kind(WarningKind::RecursionLimit));
    }

    #[test]
    fn test_cached_height_recorded() {
        let mut h = Harness::new(vec![leaf(), wrapper("mid", "leaf"), wrapper("outer", "mid")]);
        let (out, _, stats) = h.eval(&wrapper("outer", "mid").instantiate("o"), &[true]);
        assert_eq!(out, vec![false]);
        assert_eq!(stats.deepest_nesting, 3);

        let height = |h: &Harness, t: Template| {
            h.cache.entry(&CacheKey::new(&t, &[true])).unwrap().result.height
        };
        assert_eq!(height(&h, leaf()), 0);
        assert_eq!(height(&h, wrapper("mid", "leaf")), 1);
        assert_eq!(height(&h, wrapper("outer", "mid")), 2);

        // Served from the cache, the nesting below is still accounted for
        let (_, _, stats) = h.eval(&wrapper("outer", "mid").instantiate("o"), &[true]);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.deepest_nesting, 3);
    }

    #[test]
    fn test_cache_hit_respects_depth_cap() {
        let config = SimulationConfig::default().with_max_depth(2);
        let mid = wrapper("mid", "leaf");
        let outer = wrapper("outer", "mid");
        let mut h = Harness::with_config(vec![leaf(), mid.clone(), outer.clone()], config);

        // At depth 1 the leaf sits at depth 2, within the cap
        let (out, warnings, _) = h.eval(&mid.instantiate("m"), &[false]);
        assert_eq!(out, vec![true]);
        assert!(warnings.is_empty());
        assert_eq!(h.cache.entry(&CacheKey::new(&mid, &[false])).unwrap().result.height, 1);

        // Inside outer the same mid result would need depth 3
        let (out, warnings, stats) = h.eval(&outer.instantiate("o"), &[false]);
        assert_eq!(out, vec![false]);
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 2);
        assert_eq!(stats.deepest_nesting, 3);
        let warning = warnings.iter().next().unwrap();
        assert_eq!(warning.kind, WarningKind::RecursionLimit);
        assert_eq!(warning.subject, "o/sub/sub");

        // The shallow entry survives and is still served at depth 1
        let (out, _, stats) = h.eval(&mid.instantiate("m"), &[false]);
        assert_eq!(out, vec![true]);
        assert_eq!(stats.cache_hits, 1);
        assert!(!h.cache.contains(&CacheKey::new(&outer, &[false])));
    }

    #[test]
    fn test_only_settled_sweep_warnings_kept() {
        let mut h = Harness::new(vec![gated_oscillator(), first_sweep_enable()]);
        let (out, warnings, stats) = h.eval(&first_sweep_enable().instantiate("l"), &[true]);

        assert_eq!(out, vec![true]);
        assert!(warnings.is_empty(), "{:?}", warnings);
        assert_eq!(stats.subcircuit_evaluations, 3);

        // The first sweep did oscillate; that result is cached with its warning
        let enabled = CacheKey::new(&gated_oscillator(), &[true]);
        let entry = h.cache.entry(&enabled).unwrap();
        assert_eq!(entry.result.outputs, vec![false]);
        assert_eq!(entry.result.warnings[0].kind, WarningKind::NonConvergence);
    }

    #[test]
    fn test_indirect_recursion() {
        let ping = Template::new("ping")
            .with_gate(Gate::input("a", false))
            .with_gate(Gate::subcircuit("p", "pong", 1, 1))
            .with_wire(Wire::connect("w0", "a", 0, "p", 0))
            .with_input("A", PortRef::new("a", 0))
            .with_output("Y", PortRef::new("p", 0));
        let pong = Template::new("pong")
            .with_gate(Gate::input("a", false))
            .with_gate(Gate::subcircuit("q", "ping", 1, 1))
            .with_wire(Wire::connect("w0", "a", 0, "q", 0))
            .with_input("A", PortRef::new("a", 0))
            .with_output("Y", PortRef::new("q", 0));

        let config = SimulationConfig::default().with_max_depth(4);
        let mut h = Harness::with_config(vec![ping.clone(), pong], config);
        let (out, warnings, _) = h.eval(&ping.instantiate("top"), &[true]);
        assert_eq!(out, vec![false]);
        assert!(warnings.contains_kind(WarningKind::RecursionLimit));
    }

    #[test]
    fn test_missing_template() {
        let mut h = Harness::new(vec![]);
        let gate = Gate::subcircuit("ghost", "nowhere", 2, 3);
        let (out, warnings, _) = h.eval(&gate, &[true, true]);
        assert_eq!(out, vec![false, false, false]);
        let warning = warnings.iter().next().unwrap();
        assert_eq!(warning.kind, WarningKind::MissingTemplate);
        assert_eq!(warning.subject, "ghost");

        let unbound = Gate::new("bare", GateKind::Subcircuit);
        let (out, warnings, _) = h.eval(&unbound, &[]);
        assert!(out.is_empty());
        assert!(warnings.contains_kind(WarningKind::MissingTemplate));
    }

    #[test]
    fn test_arity_mismatch_degrades() {
        let mut h = Harness::new(vec![half_adder()]);
        let gate = Gate::subcircuit("ha", "half_adder", 3, 2);
        let (out, warnings, stats) = h.eval(&gate, &[true, true, true]);
        assert_eq!(out, vec![false, false]);
        assert!(warnings.contains_kind(WarningKind::Structural));
        assert_eq!(stats.subcircuit_evaluations, 0);
    }

    #[test]
    fn test_port_binding_drives_gate_input() {
        let direct = Template::new("direct_not")
            .with_gate(Gate::new("n", GateKind::Not))
            .with_input("A", PortRef::new("n", 0))
            .with_output("Y", PortRef::new("n", 0));
        let mut h = Harness::new(vec![direct.clone()]);
        let gate = direct.instantiate("d");
        assert_eq!(h.eval(&gate, &[true]).0, vec![false]);
        assert_eq!(h.eval(&gate, &[false]).0, vec![true]);
    }

    #[test]
    fn test_unknown_binding_reported() {
        let broken = Template::new("broken")
            .with_gate(Gate::input("a", false))
            .with_input("A", PortRef::new("a", 0))
            .with_output("Y", PortRef::new("missing", 0));
        let mut h = Harness::new(vec![broken.clone()]);
        let (out, warnings, _) = h.eval(&broken.instantiate("b"), &[true]);
        assert_eq!(out, vec![false]);
        let warning = warnings.iter().next().unwrap();
        assert_eq!(warning.kind, WarningKind::Structural);
        assert_eq!(warning.subject, "b");
    }

    #[test]
    fn test_malformed_template_is_an_error() {
        let bad = Template::new("bad")
            .with_gate(Gate::input("a", false))
            .with_wire(Wire::connect("w0", "a", 0, "nope", 0))
            .with_input("A", PortRef::new("a", 0));
        let mut h = Harness::new(vec![bad.clone()]);
        let mut evaluator = SubcircuitEvaluator::new(&h.config, &mut h.cache, &h.library);
        let err = evaluator
            .evaluate_instance(&bad.instantiate("x"), &[true], 1)
            .unwrap_err();
        assert!(matches!(err, SimError::MalformedTemplate { .. }));
    }

    #[test]
    fn test_version_bump_misses_cache() {
        let mut h = Harness::new(vec![half_adder()]);
        let gate = half_adder().instantiate("ha");
        h.eval(&gate, &[true, true]);

        // Redefine the template so Sum is an OR instead of an XOR
        let mut edited = half_adder();
        edited.gates[2].kind = GateKind::Or;
        h.library.upsert(edited);

        let (out, _, stats) = h.eval(&gate, &[true, true]);
        assert_eq!(out, vec![true, true]);
        assert_eq!(stats.cache_misses, 1);
    }
}
