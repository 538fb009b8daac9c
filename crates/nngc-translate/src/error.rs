//! The translation error taxonomy.

use nngc_graph::GraphError;
use nngc_model::{ModelError, OperationCode};

/// Errors that abort a translation pass.
///
/// Every variant is fatal for the whole pass: an unsupported or invalid
/// operation means the model cannot be represented, and skipping it would
/// produce a semantically wrong graph.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// No builder is registered for the operator kind.
    #[error("operation {index}: no builder for {code}")]
    UnsupportedOperation {
        /// The offending operator kind.
        code: OperationCode,
        /// Index into the model's operation table.
        index: usize,
    },

    /// A builder's validation rejected the operation's operands.
    #[error("operation {index} ({code}): {reason}")]
    ValidationRejected {
        /// The operator kind.
        code: OperationCode,
        /// Index into the model's operation table.
        index: usize,
        /// What the builder objected to.
        reason: String,
    },

    /// An input operand has neither a recorded producer nor constant data.
    #[error("operand {operand} resolved before any producer ran (model is malformed or not topologically ordered)")]
    DanglingInput {
        /// The operand index that failed to resolve.
        operand: u32,
    },

    /// A model table access failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Graph construction failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
