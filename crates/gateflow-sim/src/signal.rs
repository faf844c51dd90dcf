//! Signal map returned by a simulation pass

use crate::gate_eval::bits_to_value;
use gateflow_netlist::{GateId, WireId};
use indexmap::IndexMap;
use serde::Serialize;

/// Bits on every wire and every gate output after a pass
///
/// Both maps keep the order of the snapshot's wire and gate lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalMap {
    wires: IndexMap<WireId, bool>,
    gates: IndexMap<GateId, Vec<bool>>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_wire(&mut self, id: WireId, value: bool) {
        self.wires.insert(id, value);
    }

    pub fn set_gate(&mut self, id: GateId, outputs: Vec<bool>) {
        self.gates.insert(id, outputs);
    }

    /// Bit carried by a wire
    pub fn wire(&self, id: &str) -> Option<bool> {
        self.wires.get(id).copied()
    }

    /// First output bit of a gate
    pub fn gate(&self, id: &str) -> Option<bool> {
        self.port(id, 0)
    }

    /// Output bit of a gate on a specific port
    pub fn port(&self, id: &str, port: usize) -> Option<bool> {
        self.gates.get(id).and_then(|bits| bits.get(port).copied())
    }

    /// All output bits of a gate
    pub fn outputs(&self, id: &str) -> Option<&[bool]> {
        self.gates.get(id).map(Vec::as_slice)
    }

    /// Read several single-output gates as an integer, first id is bit 0
    pub fn bus(&self, ids: &[&str]) -> Option<u64> {
        let bits = ids
            .iter()
            .map(|id| self.gate(id))
            .collect::<Option<Vec<bool>>>()?;
        Some(bits_to_value(&bits))
    }

    pub fn wires(&self) -> impl Iterator<Item = (&WireId, bool)> {
        self.wires.iter().map(|(id, &v)| (id, v))
    }

    pub fn gates(&self) -> impl Iterator<Item = (&GateId, &[bool])> {
        self.gates.iter().map(|(id, v)| (id, v.as_slice()))
    }

    /// Gate outputs keyed by label: `gateId` for single-output gates,
    /// `gateId#port` for each port of a multi-output gate
    pub fn gate_labels(&self) -> IndexMap<String, bool> {
        let mut labels = IndexMap::new();
        for (id, bits) in &self.gates {
            if bits.len() == 1 {
                labels.insert(id.to_string(), bits[0]);
            } else {
                for (port, &bit) in bits.iter().enumerate() {
                    labels.insert(format!("{}#{}", id, port), bit);
                }
            }
        }
        labels
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }
}
