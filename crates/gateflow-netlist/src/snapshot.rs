//! Circuit snapshots
//!
//! A snapshot bundles the gate list, wire list and templates that the
//! editor hands to the engine for one pass. It is read from JSON for tests
//! and the command-line driver.

use crate::circuit::{Gate, GateKind, Wire};
use crate::error::{NetlistError, Result};
use crate::template::{Template, TemplateLibrary};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Gates, wires and templates of one circuit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    #[serde(default)]
    pub gates: Vec<Gate>,
    #[serde(default)]
    pub wires: Vec<Wire>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

impl CircuitSnapshot {
    /// Parse a snapshot from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| NetlistError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a template library from the snapshot's templates
    pub fn library(&self) -> TemplateLibrary {
        self.templates.iter().cloned().collect()
    }

    /// Iterate over the OUTPUT gates in list order
    pub fn outputs(&self) -> impl Iterator<Item = &Gate> {
        self.gates.iter().filter(|g| g.kind == GateKind::Output)
    }

    /// Set the stored value of an INPUT or CLOCK gate; returns false if no
    /// such source gate exists
    pub fn set_input(&mut self, id: &str, value: bool) -> bool {
        match self
            .gates
            .iter_mut()
            .find(|g| g.id.as_str() == id && g.kind.is_source())
        {
            Some(gate) => {
                gate.value = value;
                true
            }
            None => false,
        }
    }
}
