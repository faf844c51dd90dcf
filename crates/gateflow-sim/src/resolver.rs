//! Dependency Resolver
//!
//! Orders gates so that every gate is evaluated after the gates driving its
//! inputs. The traversal is a depth-first walk over each gate's drivers with
//! a visiting/visited marking; reaching a gate that is still on the walk
//! stack means the wire just followed closes a feedback loop. Such wires are
//! reported and skipped, which breaks the loop for the pass: the destination
//! reads the wire's reset value (0) because its driver is evaluated later.
//!
//! Roots are taken in gate-list order, so unconnected gates keep their
//! relative order and the result is deterministic.

use crate::error::SimulationResult;
use crate::graph::IndexedCircuit;
use gateflow_netlist::{Gate, GateId, Wire, WireId};
use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Result of dependency resolution, in gate and wire indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOrder {
    /// Every gate exactly once, drivers before the gates they drive
    pub order: Vec<usize>,
    /// Wires whose destination is ordered before their source
    pub feedback: Vec<usize>,
}

impl EvaluationOrder {
    pub fn is_acyclic(&self) -> bool {
        self.feedback.is_empty()
    }

    /// The order as gate ids
    pub fn gate_ids(&self, circuit: &IndexedCircuit<'_>) -> Vec<GateId> {
        self.order
            .iter()
            .map(|&idx| circuit.gate(idx).id.clone())
            .collect()
    }

    /// The feedback wires as wire ids
    pub fn feedback_ids(&self, circuit: &IndexedCircuit<'_>) -> Vec<WireId> {
        self.feedback
            .iter()
            .map(|&w| circuit.wire(w).id.clone())
            .collect()
    }
}

/// Compute the evaluation order of an indexed circuit
pub fn resolve(circuit: &IndexedCircuit<'_>) -> EvaluationOrder {
    let n = circuit.gate_count();
    let mut marks = vec![Mark::Unvisited; n];
    let mut order = Vec::with_capacity(n);
    let mut feedback = Vec::new();
    // (gate, index of the next incoming wire to follow)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::Visiting;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (gate, cursor) = *frame;
            match circuit.incoming(gate).get(cursor) {
                Some(incoming) => {
                    frame.1 += 1;
                    match marks[incoming.source] {
                        Mark::Unvisited => {
                            marks[incoming.source] = Mark::Visiting;
                            stack.push((incoming.source, 0));
                        }
                        Mark::Visiting => feedback.push(incoming.wire),
                        Mark::Visited => {}
                    }
                }
                None => {
                    marks[gate] = Mark::Visited;
                    order.push(gate);
                    stack.pop();
                }
            }
        }
    }

    EvaluationOrder { order, feedback }
}

/// Index and order a gate/wire snapshot, returning gate and wire ids
pub fn resolve_order(
    gates: &[Gate],
    wires: &[Wire],
) -> SimulationResult<(Vec<GateId>, Vec<WireId>)> {
    let circuit = IndexedCircuit::build(gates, wires)?;
    let resolved = resolve(&circuit);
    Ok((resolved.gate_ids(&circuit), resolved.feedback_ids(&circuit)))
}

/// Gates on the feedback loop closed by `wire`
///
/// Returns the members of the strongly connected component containing both
/// ends of the wire, in gate-list order.
pub fn loop_members(circuit: &IndexedCircuit<'_>, wire: usize) -> Vec<usize> {
    let (src, dst) = circuit.endpoints(wire);
    if src == dst {
        return vec![src];
    }

    let mut graph = DiGraph::<usize, ()>::with_capacity(circuit.gate_count(), circuit.wire_count());
    let nodes: Vec<_> = (0..circuit.gate_count()).map(|i| graph.add_node(i)).collect();
    for w in 0..circuit.wire_count() {
        let (s, d) = circuit.endpoints(w);
        graph.add_edge(nodes[s], nodes[d], ());
    }

    kosaraju_scc(&graph)
        .into_iter()
        .map(|scc| {
            let mut members: Vec<usize> = scc.into_iter().map(|node| graph[node]).collect();
            members.sort_unstable();
            members
        })
        .find(|members| members.contains(&dst))
        .unwrap_or_else(|| vec![src, dst])
}
