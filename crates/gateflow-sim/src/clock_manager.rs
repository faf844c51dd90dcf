//! Caller-side clock driver
//!
//! The engine treats CLOCK gates like INPUT gates: they output their stored
//! value. Something outside a pass has to flip that value between passes;
//! `ClockManager` does this for a gate snapshot and reports the edge each
//! clock went through.

use gateflow_netlist::{Gate, GateId, GateKind};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockEdge {
    None,
    Rising,
    Falling,
}

#[derive(Debug, Clone)]
pub struct ClockInfo {
    pub id: GateId,
    pub current_value: bool,
    pub previous_value: bool,
}

impl ClockInfo {
    pub fn new(id: GateId, value: bool) -> Self {
        ClockInfo {
            id,
            current_value: value,
            previous_value: value,
        }
    }

    pub fn detect_edge(&self) -> ClockEdge {
        match (self.previous_value, self.current_value) {
            (false, true) => ClockEdge::Rising,
            (true, false) => ClockEdge::Falling,
            _ => ClockEdge::None,
        }
    }

    pub fn update(&mut self, new_value: bool) {
        self.previous_value = self.current_value;
        self.current_value = new_value;
    }

    pub fn toggle(&mut self) {
        self.update(!self.current_value);
    }
}

/// Tracks CLOCK gates of a snapshot and toggles them half a period at a time
#[derive(Debug, Clone, Default)]
pub struct ClockManager {
    clocks: IndexMap<GateId, ClockInfo>,
    half_periods: u64,
}

impl ClockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every CLOCK gate, starting from its stored value
    pub fn from_gates(gates: &[Gate]) -> Self {
        let mut manager = Self::new();
        for gate in gates.iter().filter(|g| g.kind == GateKind::Clock) {
            manager.add_clock(gate.id.clone(), gate.value);
        }
        manager
    }

    pub fn add_clock(&mut self, id: GateId, value: bool) {
        self.clocks
            .insert(id.clone(), ClockInfo::new(id, value));
    }

    pub fn set_clock(&mut self, id: &str, value: bool) -> Option<ClockEdge> {
        let clock = self.clocks.get_mut(id)?;
        clock.update(value);
        Some(clock.detect_edge())
    }

    pub fn toggle_clock(&mut self, id: &str) -> Option<ClockEdge> {
        let clock = self.clocks.get_mut(id)?;
        clock.toggle();
        Some(clock.detect_edge())
    }

    pub fn clock_value(&self, id: &str) -> Option<bool> {
        self.clocks.get(id).map(|c| c.current_value)
    }

    pub fn clock_edge(&self, id: &str) -> Option<ClockEdge> {
        self.clocks.get(id).map(|c| c.detect_edge())
    }

    /// Toggle every clock and write the new values into `gates`
    ///
    /// Returns the edge each clock went through, in registration order.
    pub fn tick(&mut self, gates: &mut [Gate]) -> Vec<(GateId, ClockEdge)> {
        self.half_periods += 1;
        let edges: Vec<_> = self
            .clocks
            .values_mut()
            .map(|clock| {
                clock.toggle();
                (clock.id.clone(), clock.detect_edge())
            })
            .collect();
        self.apply(gates);
        edges
    }

    /// Copy the tracked clock values into matching CLOCK gates
    pub fn apply(&self, gates: &mut [Gate]) {
        for gate in gates.iter_mut().filter(|g| g.kind == GateKind::Clock) {
            if let Some(clock) = self.clocks.get(gate.id.as_str()) {
                gate.value = clock.current_value;
            }
        }
    }

    /// Half periods elapsed since creation or the last reset
    pub fn half_periods(&self) -> u64 {
        self.half_periods
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    pub fn reset(&mut self) {
        self.half_periods = 0;
        for clock in self.clocks.values_mut() {
            clock.current_value = false;
            clock.previous_value = false;
        }
    }
}
