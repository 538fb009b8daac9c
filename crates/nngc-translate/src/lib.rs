//! Translation engine: NNAPI model → target computation graph.
//!
//! A single synchronous pass walks the model's operation table in declared
//! order, dispatches each operation to its builder, and wires the produced
//! nodes into one [`nngc_graph::Graph`]. The pass either completes or fails
//! outright; a partially built graph is never handed off.
//!
//! Use [`translate_model`] for the common case, or drive a
//! [`GraphAssembler`] directly when the caller wants to hold the
//! intermediate state.

mod assembler;
mod builder;
mod error;
mod ops;
mod plugin;
mod primitives;
mod registry;

pub use assembler::{translate_model, GraphAssembler};
pub use error::TranslateError;
pub use plugin::PluginTarget;
