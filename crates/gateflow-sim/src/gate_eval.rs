//! Gate Logic Table
//!
//! Pure evaluation functions for the primitive gate kinds. Inputs are the
//! bits on the gate's input ports in port order, with unwired ports already
//! defaulted to 0 by the caller.
//!
//! # Usage
//!
//! ```
//! use gateflow_netlist::GateKind;
//! use gateflow_sim::gate_eval::evaluate_primitive;
//!
//! assert_eq!(evaluate_primitive(GateKind::Xor, &[true, false], false), Some(true));
//! assert_eq!(evaluate_primitive(GateKind::Not, &[], false), Some(true));
//! // SUBCIRCUIT is not a primitive; the subcircuit evaluator handles it
//! assert_eq!(evaluate_primitive(GateKind::Subcircuit, &[true], false), None);
//! ```

use gateflow_netlist::GateKind;

/// 1 iff every input is 1; 0 with fewer than two inputs
pub fn and(inputs: &[bool]) -> bool {
    inputs.len() >= 2 && inputs.iter().all(|&x| x)
}

/// 1 iff at least one input is 1
pub fn or(inputs: &[bool]) -> bool {
    inputs.iter().any(|&x| x)
}

/// 1 iff an odd number of inputs are 1
pub fn xor(inputs: &[bool]) -> bool {
    inputs.iter().fold(false, |acc, &x| acc ^ x)
}

pub fn nand(inputs: &[bool]) -> bool {
    !and(inputs)
}

pub fn nor(inputs: &[bool]) -> bool {
    !or(inputs)
}

/// Complement of the single input; an unwired NOT outputs 1
pub fn not(inputs: &[bool]) -> bool {
    !inputs.first().copied().unwrap_or(false)
}

/// Pass-through of the single input
pub fn buffer(inputs: &[bool]) -> bool {
    inputs.first().copied().unwrap_or(false)
}

/// Evaluate a primitive gate kind
///
/// # Arguments
///
/// * `kind` - The gate kind to evaluate
/// * `inputs` - Input port values in port order
/// * `stored` - The gate's stored value (read by INPUT and CLOCK only)
///
/// # Returns
///
/// The gate's single output bit, or `None` for SUBCIRCUIT, whose outputs
/// come from its template.
pub fn evaluate_primitive(kind: GateKind, inputs: &[bool], stored: bool) -> Option<bool> {
    let out = match kind {
        GateKind::And => and(inputs),
        GateKind::Or => or(inputs),
        GateKind::Xor => xor(inputs),
        GateKind::Nand => nand(inputs),
        GateKind::Nor => nor(inputs),
        GateKind::Not => not(inputs),
        GateKind::Output => buffer(inputs),
        // Clock toggling happens outside the engine; a pass only sees the level
        GateKind::Input | GateKind::Clock => stored,
        GateKind::Subcircuit => return None,
    };
    Some(out)
}

/// Pack a bit slice into an integer, bit 0 first
pub fn bits_to_value(bits: &[bool]) -> u64 {
    bits.iter()
        .take(64)
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | ((b as u64) << i))
}

/// Unpack the low `width` bits of `value`, bit 0 first
pub fn value_to_bits(value: u64, width: usize) -> Vec<bool> {
    (0..width).map(|i| i < 64 && (value >> i) & 1 == 1).collect()
}
