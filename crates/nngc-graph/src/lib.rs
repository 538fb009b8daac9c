//! Target computation-graph IR for the translation engine.
//!
//! An arena-based directed acyclic graph: nodes live in an append-only arena
//! and reference their inputs through stable typed [`Handle`]s, so ownership
//! of the whole dependency DAG is the arena itself and consumers never hold
//! direct references. The finished [`Graph`] — node arena plus ordered
//! parameter and result lists — is the object handed to the backend
//! compilation engine.

mod arena;
mod display;
mod error;
mod graph;
mod node;
mod types;

pub use arena::{Arena, Handle};
pub use display::dump_graph;
pub use error::GraphError;
pub use graph::Graph;
pub use node::{
    BinaryOp, InterpolateMode, Node, NodeKind, PadMode, PadScheme, ReduceOp, TopKOutput, UnaryOp,
};
pub use types::{ElementType, Shape};
