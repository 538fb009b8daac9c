//! Error types for model access.

use crate::operand::OperandType;

/// Errors that can occur when reading the model tables.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An operand index is out of bounds for the operand table.
    #[error("operand index {index} out of bounds (table size: {size})")]
    OperandOutOfRange { index: usize, size: usize },

    /// An operation index is out of bounds for the operation table.
    #[error("operation index {index} out of bounds (table size: {size})")]
    OperationOutOfRange { index: usize, size: usize },

    /// An input/output slot is out of bounds for an operation.
    #[error("operation {operation}: {kind} slot {slot} out of bounds ({len} declared)")]
    SlotOutOfRange {
        operation: usize,
        kind: &'static str,
        slot: usize,
        len: usize,
    },

    /// A typed extraction found a different declared type than expected.
    #[error("operand {operand}: expected {expected}, found {found}")]
    TypeMismatch {
        operand: u32,
        expected: &'static str,
        found: OperandType,
    },

    /// A value was requested from an operand with no constant payload.
    #[error("operand {operand} has no constant value (lifetime {lifetime:?})")]
    NotConstant {
        operand: u32,
        lifetime: crate::Lifetime,
    },

    /// A constant payload does not match the operand's declared size.
    #[error("operand {operand}: payload is {actual} bytes, expected {expected}")]
    PayloadSizeMismatch {
        operand: u32,
        expected: usize,
        actual: usize,
    },

    /// A model referenced an operand index that does not exist.
    #[error("model references operand {index}, but the table has {size} entries")]
    BadOperandReference { index: u32, size: usize },
}
