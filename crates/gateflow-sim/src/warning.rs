//! Non-fatal simulation warnings
//!
//! Every pass returns a complete signal map; problems inherent to the circuit
//! topology are collected here instead of aborting the pass.

use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;

/// Category of a recoverable issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WarningKind {
    /// Fewer wired inputs than the gate kind needs, or an instance whose
    /// port counts disagree with its template
    Structural,
    /// Feedback in the top-level graph
    Cycle,
    /// A SUBCIRCUIT names a template that cannot be resolved
    MissingTemplate,
    /// Subcircuit nesting exceeded the depth cap
    RecursionLimit,
    /// Internal feedback did not settle within the iteration cap
    NonConvergence,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningKind::Structural => "structural",
            WarningKind::Cycle => "cycle",
            WarningKind::MissingTemplate => "missing-template",
            WarningKind::RecursionLimit => "recursion-limit",
            WarningKind::NonConvergence => "non-convergence",
        };
        f.write_str(name)
    }
}

/// A recoverable issue found during a pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SimWarning {
    pub kind: WarningKind,
    pub message: String,
    /// Offending gate or wire, as a `/`-separated instance path
    pub subject: String,
}

impl SimWarning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            subject: subject.into(),
        }
    }

    /// Re-root the subject under an enclosing instance
    pub fn nested_under(mut self, instance: &str) -> Self {
        self.subject = if self.subject.is_empty() {
            instance.to_string()
        } else {
            format!("{}/{}", instance, self.subject)
        };
        self
    }
}

impl fmt::Display for SimWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}

/// De-duplicating, insertion-ordered warning collector
#[derive(Debug, Clone, Default)]
pub struct Warnings {
    items: IndexSet<SimWarning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning; repeats of an identical warning are dropped
    pub fn push(&mut self, warning: SimWarning) {
        self.items.insert(warning);
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = SimWarning>) {
        for warning in warnings {
            self.push(warning);
        }
    }

    pub fn contains_kind(&self, kind: WarningKind) -> bool {
        self.items.iter().any(|w| w.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimWarning> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<SimWarning> {
        self.items.into_iter().collect()
    }
}
