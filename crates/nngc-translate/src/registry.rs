//! Operand-indexed store of produced graph nodes.

use nngc_graph::{Graph, Handle, Node, Shape};
use nngc_model::Model;

use crate::error::TranslateError;
use crate::primitives::element_type_of;

/// Maps operand indices to the graph nodes that produce them.
///
/// Sized to the model's operand count up front so lookups are O(1).
/// Constant operands materialize lazily: the first consumer triggers
/// creation of a constant node, which is memoized here so later consumers
/// share the same handle.
#[derive(Debug)]
pub struct NodeRegistry {
    outputs: Vec<Option<Handle<Node>>>,
}

impl NodeRegistry {
    /// Creates a registry for a model with `operand_count` operands.
    pub fn new(operand_count: usize) -> Self {
        Self {
            outputs: vec![None; operand_count],
        }
    }

    /// Records the node producing `operand`. Called exactly once per
    /// output-producing operand, before any consumer resolves it; a second
    /// call overwrites (the last producer wins, matching declared order).
    pub fn record_output(&mut self, operand: u32, node: Handle<Node>) {
        if let Some(slot) = self.outputs.get_mut(operand as usize) {
            if slot.is_some() {
                log::debug!("operand {operand}: producer overwritten");
            }
            *slot = Some(node);
        }
    }

    /// Returns the recorded producer, if any.
    pub fn try_resolve(&self, operand: u32) -> Option<Handle<Node>> {
        self.outputs.get(operand as usize).copied().flatten()
    }

    /// Resolves an operation input to its producing node.
    ///
    /// Falls back to materializing (and memoizing) a constant node when the
    /// operand's lifetime is constant. Anything else without a recorded
    /// producer is a dangling reference and fails the translation.
    pub fn resolve_input(
        &mut self,
        operand: u32,
        model: &Model,
        graph: &mut Graph,
    ) -> Result<Handle<Node>, TranslateError> {
        if let Some(node) = self.try_resolve(operand) {
            return Ok(node);
        }
        let entry = model.operand(operand)?;
        if entry.lifetime.is_const() {
            let data = model.operand_bytes(operand)?.to_vec();
            let node = graph.add_constant(
                element_type_of(entry.ty),
                Shape::from_dims(&entry.dimensions),
                data,
            );
            self.record_output(operand, node);
            return Ok(node);
        }
        Err(TranslateError::DanglingInput { operand })
    }
}
