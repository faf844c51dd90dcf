//! gateflow netlist - circuit data model
//!
//! This crate handles:
//! - Gate kinds, gates and wires of an editable circuit
//! - Port references between gates
//! - Reusable composite-gate templates and their resolution
//! - Loading circuit snapshots from JSON
//!
//! The simulation engine in `gateflow-sim` only ever reads these types; the
//! editor that owns them is free to mutate them between passes.

pub mod circuit;
pub mod error;
pub mod snapshot;
pub mod template;

pub use circuit::{Gate, GateId, GateKind, PortRef, Wire, WireId};
pub use error::{NetlistError, Result};
pub use snapshot::CircuitSnapshot;
pub use template::{Template, TemplateId, TemplateLibrary, TemplatePort, TemplateResolver};
