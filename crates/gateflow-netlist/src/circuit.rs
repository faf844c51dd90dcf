//! Gates, wires and port references
//!
//! A circuit is a flat list of [`Gate`]s connected by [`Wire`]s. Each wire
//! carries one bit from an output port of its source gate to an input port of
//! its destination gate. A destination port is driven by at most one wire,
//! while a source port may fan out to any number of wires.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a gate within one circuit or template
    GateId
);

string_id!(
    /// Unique identifier for a wire within one circuit or template
    WireId
);

string_id!(
    /// Identifier of a reusable composite-gate template
    TemplateId
);

// ============================================================================
// Gate Kinds
// ============================================================================

/// The fixed set of gate kinds understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateKind {
    And,
    Or,
    Not,
    Xor,
    Nand,
    Nor,
    /// Switch driven by the user; outputs its stored value
    Input,
    /// Display sink; passes its single input through
    Output,
    /// Square-wave source; toggled externally, outputs its stored value
    Clock,
    /// Composite gate backed by a template
    Subcircuit,
}

impl GateKind {
    /// True for kinds that take a variable number of inputs (at least two)
    pub fn is_variadic(self) -> bool {
        matches!(
            self,
            GateKind::And | GateKind::Or | GateKind::Xor | GateKind::Nand | GateKind::Nor
        )
    }

    /// True for kinds whose output comes from the stored value
    pub fn is_source(self) -> bool {
        matches!(self, GateKind::Input | GateKind::Clock)
    }

    /// Short upper-case mnemonic used in logs and reports
    pub fn mnemonic(self) -> &'static str {
        match self {
            GateKind::And => "AND",
            GateKind::Or => "OR",
            GateKind::Not => "NOT",
            GateKind::Xor => "XOR",
            GateKind::Nand => "NAND",
            GateKind::Nor => "NOR",
            GateKind::Input => "INPUT",
            GateKind::Output => "OUTPUT",
            GateKind::Clock => "CLOCK",
            GateKind::Subcircuit => "SUBCIRCUIT",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// ============================================================================
// Gates
// ============================================================================

/// A node in the circuit graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// Unique identifier
    pub id: GateId,
    /// What the gate computes
    pub kind: GateKind,
    /// Stored value (only meaningful for INPUT and CLOCK)
    #[serde(default)]
    pub value: bool,
    /// Template backing a SUBCIRCUIT gate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateId>,
    /// Declared input port count (variadic kinds and SUBCIRCUIT)
    #[serde(default)]
    pub input_count: usize,
    /// Declared output port count (SUBCIRCUIT)
    #[serde(default)]
    pub output_count: usize,
}

impl Gate {
    /// Create a gate of the given kind with the kind's default port counts
    pub fn new(id: impl Into<GateId>, kind: GateKind) -> Self {
        let input_count = match kind {
            GateKind::Input | GateKind::Clock | GateKind::Subcircuit => 0,
            GateKind::Not | GateKind::Output => 1,
            _ => 2,
        };
        let output_count = match kind {
            GateKind::Subcircuit => 0,
            _ => 1,
        };
        Self {
            id: id.into(),
            kind,
            value: false,
            template: None,
            input_count,
            output_count,
        }
    }

    /// Create an INPUT gate holding `value`
    pub fn input(id: impl Into<GateId>, value: bool) -> Self {
        Self::new(id, GateKind::Input).with_value(value)
    }

    /// Create a CLOCK gate holding `value`
    pub fn clock(id: impl Into<GateId>, value: bool) -> Self {
        Self::new(id, GateKind::Clock).with_value(value)
    }

    /// Create an OUTPUT (display) gate
    pub fn output(id: impl Into<GateId>) -> Self {
        Self::new(id, GateKind::Output)
    }

    /// Create a SUBCIRCUIT gate instantiating `template`
    pub fn subcircuit(
        id: impl Into<GateId>,
        template: impl Into<TemplateId>,
        input_count: usize,
        output_count: usize,
    ) -> Self {
        Self {
            template: Some(template.into()),
            input_count,
            output_count,
            ..Self::new(id, GateKind::Subcircuit)
        }
    }

    /// Set the stored value
    pub fn with_value(mut self, value: bool) -> Self {
        self.value = value;
        self
    }

    /// Set the declared input count (variadic kinds)
    pub fn with_inputs(mut self, input_count: usize) -> Self {
        self.input_count = input_count;
        self
    }

    /// Number of input ports the engine reads for this gate
    pub fn input_arity(&self) -> usize {
        match self.kind {
            GateKind::Input | GateKind::Clock => 0,
            GateKind::Not | GateKind::Output => 1,
            GateKind::Subcircuit => self.input_count,
            _ => self.input_count.max(2),
        }
    }

    /// Number of output ports this gate drives
    pub fn output_arity(&self) -> usize {
        match self.kind {
            GateKind::Subcircuit => self.output_count,
            _ => 1,
        }
    }

    /// Minimum number of wired inputs before the gate is considered complete
    pub fn min_inputs(&self) -> usize {
        match self.kind {
            GateKind::Input | GateKind::Clock => 0,
            GateKind::Not | GateKind::Output => 1,
            GateKind::Subcircuit => self.input_count,
            _ => 2,
        }
    }
}

// ============================================================================
// Wires
// ============================================================================

/// A port on a gate: `gate` plus port index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub gate: GateId,
    #[serde(default)]
    pub port: usize,
}

impl PortRef {
    pub fn new(gate: impl Into<GateId>, port: usize) -> Self {
        Self {
            gate: gate.into(),
            port,
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.gate, self.port)
    }
}

/// A directed edge carrying one bit between two ports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    /// Unique identifier
    pub id: WireId,
    /// Output port driving this wire
    pub source: PortRef,
    /// Input port this wire drives
    pub destination: PortRef,
}

impl Wire {
    pub fn new(id: impl Into<WireId>, source: PortRef, destination: PortRef) -> Self {
        Self {
            id: id.into(),
            source,
            destination,
        }
    }

    /// Shorthand for `gate#src_port -> gate#dst_port`
    pub fn connect(
        id: impl Into<WireId>,
        from: impl Into<GateId>,
        from_port: usize,
        to: impl Into<GateId>,
        to_port: usize,
    ) -> Self {
        Self::new(id, PortRef::new(from, from_port), PortRef::new(to, to_port))
    }
}
