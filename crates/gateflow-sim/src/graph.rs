//! Indexed view of a gate/wire snapshot
//!
//! Resolves wire endpoints to gate indices once per graph so ordering and
//! evaluation can work with plain `usize` lookups. Building the index is
//! where malformed snapshots are rejected.

use crate::error::{SimError, SimulationResult};
use gateflow_netlist::{Gate, GateId, Wire};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A wire arriving at a gate input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incoming {
    /// Destination port index
    pub port: usize,
    /// Index of the wire
    pub wire: usize,
    /// Index of the driving gate
    pub source: usize,
}

/// Borrowed gate/wire lists plus adjacency
#[derive(Debug)]
pub struct IndexedCircuit<'a> {
    gates: &'a [Gate],
    wires: &'a [Wire],
    gate_index: IndexMap<&'a GateId, usize>,
    /// Per gate, incoming wires sorted by destination port
    incoming: Vec<Vec<Incoming>>,
    /// Per gate, outgoing wire indices in wire-list order
    outgoing: Vec<Vec<usize>>,
    /// Per wire, (source gate, destination gate)
    endpoints: Vec<(usize, usize)>,
}

impl<'a> IndexedCircuit<'a> {
    /// Index a snapshot, rejecting duplicate ids, dangling wires and
    /// input ports driven by more than one wire
    pub fn build(gates: &'a [Gate], wires: &'a [Wire]) -> SimulationResult<Self> {
        let mut gate_index = IndexMap::with_capacity(gates.len());
        for (idx, gate) in gates.iter().enumerate() {
            if gate_index.insert(&gate.id, idx).is_some() {
                return Err(SimError::DuplicateGate(gate.id.clone()));
            }
        }

        let mut incoming = vec![Vec::new(); gates.len()];
        let mut outgoing = vec![Vec::new(); gates.len()];
        let mut endpoints = Vec::with_capacity(wires.len());
        let mut drivers: HashMap<(usize, usize), usize> = HashMap::new();
        let mut wire_ids = HashMap::with_capacity(wires.len());

        for (w, wire) in wires.iter().enumerate() {
            if wire_ids.insert(&wire.id, w).is_some() {
                return Err(SimError::DuplicateWire(wire.id.clone()));
            }
            let lookup = |id: &GateId| {
                gate_index
                    .get(id)
                    .copied()
                    .ok_or_else(|| SimError::UnknownGate {
                        wire: wire.id.clone(),
                        gate: id.clone(),
                    })
            };
            let src = lookup(&wire.source.gate)?;
            let dst = lookup(&wire.destination.gate)?;
            let port = wire.destination.port;

            if let Some(&first) = drivers.get(&(dst, port)) {
                return Err(SimError::PortConflict {
                    gate: wire.destination.gate.clone(),
                    port,
                    first: wires[first].id.clone(),
                    second: wire.id.clone(),
                });
            }
            drivers.insert((dst, port), w);

            incoming[dst].push(Incoming {
                port,
                wire: w,
                source: src,
            });
            outgoing[src].push(w);
            endpoints.push((src, dst));
        }

        for list in &mut incoming {
            list.sort_by_key(|i| i.port);
        }

        Ok(Self {
            gates,
            wires,
            gate_index,
            incoming,
            outgoing,
            endpoints,
        })
    }

    pub fn gates(&self) -> &'a [Gate] {
        self.gates
    }

    pub fn wires(&self) -> &'a [Wire] {
        self.wires
    }

    pub fn gate(&self, idx: usize) -> &'a Gate {
        &self.gates[idx]
    }

    pub fn wire(&self, idx: usize) -> &'a Wire {
        &self.wires[idx]
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    pub fn index_of(&self, id: &GateId) -> Option<usize> {
        self.gate_index.get(id).copied()
    }

    pub fn incoming(&self, idx: usize) -> &[Incoming] {
        &self.incoming[idx]
    }

    pub fn outgoing(&self, idx: usize) -> &[usize] {
        &self.outgoing[idx]
    }

    /// Source and destination gate indices of a wire
    pub fn endpoints(&self, wire: usize) -> (usize, usize) {
        self.endpoints[wire]
    }

    /// Number of distinct input ports that have a wire attached
    pub fn wired_inputs(&self, idx: usize) -> usize {
        // Sorted by port and fan-in is at most one, so every entry is distinct
        self.incoming[idx].len()
    }
}
