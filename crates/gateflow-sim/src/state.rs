//! Per-pass signal state
//!
//! Holds the bit on every wire and the output bits of every gate while a
//! circuit (top level or template interior) is being evaluated.

use crate::graph::IndexedCircuit;
use std::collections::HashMap;

/// Signal values of one circuit during evaluation
#[derive(Debug, Clone)]
pub struct CircuitState {
    /// Output bits per gate, one entry per output port
    outputs: Vec<Vec<bool>>,
    /// Bit carried by each wire
    wires: Vec<bool>,
    /// Effective stored value of each gate (INPUT/CLOCK read this)
    stored: Vec<bool>,
    /// Input ports driven from outside the circuit, (gate, port) -> bit
    pinned: HashMap<(usize, usize), bool>,
}

impl CircuitState {
    /// Reset state: every wire 0, source gates seeded from their stored
    /// value, all other outputs 0
    pub fn reset(circuit: &IndexedCircuit<'_>) -> Self {
        let outputs = circuit
            .gates()
            .iter()
            .map(|gate| {
                let mut bits = vec![false; gate.output_arity()];
                if gate.kind.is_source() {
                    if let Some(bit) = bits.first_mut() {
                        *bit = gate.value;
                    }
                }
                bits
            })
            .collect();
        let stored = circuit.gates().iter().map(|g| g.value).collect();

        Self {
            outputs,
            wires: vec![false; circuit.wire_count()],
            stored,
            pinned: HashMap::new(),
        }
    }

    /// Override the stored value of a source gate
    pub fn set_stored(&mut self, gate: usize, value: bool) {
        self.stored[gate] = value;
        if let Some(bit) = self.outputs[gate].first_mut() {
            *bit = value;
        }
    }

    pub fn stored(&self, gate: usize) -> bool {
        self.stored[gate]
    }

    /// Drive an input port directly, taking precedence over any wire
    pub fn pin_input(&mut self, gate: usize, port: usize, value: bool) {
        self.pinned.insert((gate, port), value);
    }

    /// Current input bits of a gate in port order; unwired ports read 0
    pub fn gather_inputs(&self, circuit: &IndexedCircuit<'_>, gate: usize) -> Vec<bool> {
        let incoming = circuit.incoming(gate);
        let mut width = circuit.gate(gate).input_arity();
        if let Some(last) = incoming.last() {
            width = width.max(last.port + 1);
        }
        for &(g, port) in self.pinned.keys() {
            if g == gate {
                width = width.max(port + 1);
            }
        }

        let mut inputs = vec![false; width];
        for inc in incoming {
            inputs[inc.port] = self.wires[inc.wire];
        }
        for (&(g, port), &value) in &self.pinned {
            if g == gate {
                inputs[port] = value;
            }
        }
        inputs
    }

    /// Store a gate's outputs and drive them onto its outgoing wires
    ///
    /// Returns true if any output bit changed.
    pub fn commit(&mut self, circuit: &IndexedCircuit<'_>, gate: usize, outputs: Vec<bool>) -> bool {
        let changed = self.outputs[gate] != outputs;
        for &w in circuit.outgoing(gate) {
            let port = circuit.wire(w).source.port;
            self.wires[w] = outputs.get(port).copied().unwrap_or(false);
        }
        self.outputs[gate] = outputs;
        changed
    }

    pub fn outputs(&self, gate: usize) -> &[bool] {
        &self.outputs[gate]
    }

    /// Output bit on a port, 0 if the port does not exist
    pub fn output(&self, gate: usize, port: usize) -> bool {
        self.outputs[gate].get(port).copied().unwrap_or(false)
    }

    pub fn wire(&self, wire: usize) -> bool {
        self.wires[wire]
    }

    pub fn into_parts(self) -> (Vec<Vec<bool>>, Vec<bool>) {
        (self.outputs, self.wires)
    }
}
