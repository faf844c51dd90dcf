//! Errors for malformed simulation input
//!
//! Topology problems a user can create in the editor (missing inputs,
//! feedback loops, broken templates) are reported as warnings instead; see
//! [`crate::warning`].

use gateflow_netlist::{GateId, TemplateId, WireId};
use thiserror::Error;

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimError>;

/// Input that should have been rejected before it reached the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Two gates share an id
    #[error("Duplicate gate id: {0}")]
    DuplicateGate(GateId),

    /// Two wires share an id
    #[error("Duplicate wire id: {0}")]
    DuplicateWire(WireId),

    /// A wire endpoint names a gate that is not in the gate list
    #[error("Wire {wire} references unknown gate {gate}")]
    UnknownGate { wire: WireId, gate: GateId },

    /// More than one wire drives the same input port
    #[error("Input port {gate}#{port} is driven by both {first} and {second}")]
    PortConflict {
        gate: GateId,
        port: usize,
        first: WireId,
        second: WireId,
    },

    /// A template's internal graph is malformed
    #[error("Template {template} is malformed: {source}")]
    MalformedTemplate {
        template: TemplateId,
        #[source]
        source: Box<SimError>,
    },
}
