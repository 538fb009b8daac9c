//! NNAPI model tables for the graph translation engine.
//!
//! A [`Model`] is the immutable, already-parsed form of a vendor-neutral
//! neural-network description: a flat operand table, a flat operation table,
//! and the declared input/output operand index lists. The accessor methods on
//! `Model` (shared references are the read-only view) resolve operation slots
//! to operand indices and extract strongly-typed constant values.

mod error;
mod model;
mod operand;
mod operation;

pub use error::ModelError;
pub use model::{Model, ModelBuilder, OperandValue};
pub use operand::{ChannelQuant, Lifetime, Operand, OperandType};
pub use operation::{Operation, OperationCode};
