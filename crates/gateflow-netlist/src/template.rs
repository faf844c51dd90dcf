//! Composite-gate templates
//!
//! A [`Template`] is the reusable definition behind every SUBCIRCUIT gate: an
//! internal gate/wire graph plus ordered input and output ports bound to
//! ports of internal gates. Templates are owned by the editor; the engine
//! reads them through the narrow [`TemplateResolver`] capability.

use crate::circuit::{Gate, PortRef, Wire};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use crate::circuit::TemplateId;

/// A named port of a template and the internal port it is bound to
///
/// For inputs, a binding that names an INPUT or CLOCK gate replaces that
/// gate's stored value; any other gate has the bound input port driven
/// directly. For outputs, the binding names the internal output port that
/// is read once the internal graph has settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePort {
    pub name: String,
    pub binding: PortRef,
}

impl TemplatePort {
    pub fn new(name: impl Into<String>, binding: PortRef) -> Self {
        Self {
            name: name.into(),
            binding,
        }
    }
}

/// Reusable definition of a composite gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    #[serde(default)]
    pub name: String,
    pub inputs: Vec<TemplatePort>,
    pub outputs: Vec<TemplatePort>,
    pub gates: Vec<Gate>,
    pub wires: Vec<Wire>,
    /// Whether evaluation results may be served from the simulation cache
    #[serde(default = "default_cacheable")]
    pub cacheable: bool,
    /// Revision counter, bumped whenever the definition is replaced
    #[serde(default)]
    pub version: u64,
}

fn default_cacheable() -> bool {
    true
}

impl Template {
    /// Create an empty template
    pub fn new(id: impl Into<TemplateId>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            inputs: Vec::new(),
            outputs: Vec::new(),
            gates: Vec::new(),
            wires: Vec::new(),
            cacheable: true,
            version: 0,
        }
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn with_wire(mut self, wire: Wire) -> Self {
        self.wires.push(wire);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, binding: PortRef) -> Self {
        self.inputs.push(TemplatePort::new(name, binding));
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, binding: PortRef) -> Self {
        self.outputs.push(TemplatePort::new(name, binding));
        self
    }

    /// Mark the template as non-cacheable (always evaluated in real time)
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Instantiate this template as a SUBCIRCUIT gate with matching arity
    pub fn instantiate(&self, gate_id: impl Into<crate::circuit::GateId>) -> Gate {
        Gate::subcircuit(
            gate_id,
            self.id.clone(),
            self.input_count(),
            self.output_count(),
        )
    }
}

/// Read-only template lookup handed to the engine
pub trait TemplateResolver {
    fn get_template(&self, id: &TemplateId) -> Option<&Template>;
}

impl<T: TemplateResolver + ?Sized> TemplateResolver for &T {
    fn get_template(&self, id: &TemplateId) -> Option<&Template> {
        (**self).get_template(id)
    }
}

impl TemplateResolver for IndexMap<TemplateId, Template> {
    fn get_template(&self, id: &TemplateId) -> Option<&Template> {
        self.get(id)
    }
}

/// Insertion-ordered template store
///
/// Replacing a template through [`TemplateLibrary::upsert`] bumps its
/// version so results cached for the old definition are never reused.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: IndexMap<TemplateId, Template>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a template, returning the version it was stored at
    pub fn upsert(&mut self, mut template: Template) -> u64 {
        if let Some(previous) = self.templates.get(&template.id) {
            template.version = template.version.max(previous.version + 1);
        }
        let version = template.version;
        self.templates.insert(template.id.clone(), template);
        version
    }

    /// Remove a template, returning it if present
    pub fn remove(&mut self, id: &TemplateId) -> Option<Template> {
        self.templates.shift_remove(id)
    }

    pub fn get(&self, id: &TemplateId) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }
}

impl TemplateResolver for TemplateLibrary {
    fn get_template(&self, id: &TemplateId) -> Option<&Template> {
        self.templates.get(id)
    }
}

impl FromIterator<Template> for TemplateLibrary {
    fn from_iter<I: IntoIterator<Item = Template>>(iter: I) -> Self {
        let mut library = Self::new();
        for template in iter {
            library.upsert(template);
        }
        library
    }
}
