//! The computation graph object.

use crate::arena::{Arena, Handle};
use crate::error::GraphError;
use crate::node::{Node, NodeKind};
use crate::types::{ElementType, Shape};

/// A single-entry-per-parameter, multi-exit directed acyclic graph.
///
/// Nodes are appended in dependency order: every input handle of a node must
/// already be in the arena, which makes cycles unrepresentable. The ordered
/// `parameters` and `results` lists are the external contract consumed by
/// the backend compilation engine.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Arena<Node>,
    parameters: Vec<Handle<Node>>,
    results: Vec<Handle<Node>>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node, checking that all of its inputs are already present.
    pub fn add_node(&mut self, node: Node) -> Result<Handle<Node>, GraphError> {
        for &input in &node.inputs {
            if !self.nodes.contains(input) {
                return Err(GraphError::BadHandle {
                    index: input.index(),
                    size: self.nodes.len(),
                });
            }
        }
        Ok(self.nodes.append(node))
    }

    /// Appends a [`NodeKind::Parameter`] node and registers it in the
    /// ordered parameter list.
    pub fn add_parameter(
        &mut self,
        ty: ElementType,
        shape: Shape,
        name: Option<String>,
    ) -> Handle<Node> {
        let handle = self.nodes.append(Node {
            kind: NodeKind::Parameter,
            inputs: Vec::new(),
            ty,
            shape,
            name,
        });
        self.parameters.push(handle);
        handle
    }

    /// Appends a [`NodeKind::Constant`] node.
    pub fn add_constant(&mut self, ty: ElementType, shape: Shape, data: Vec<u8>) -> Handle<Node> {
        self.nodes.append(Node {
            kind: NodeKind::Constant { data },
            inputs: Vec::new(),
            ty,
            shape,
            name: None,
        })
    }

    /// Appends a handle to the ordered result list.
    pub fn mark_result(&mut self, handle: Handle<Node>) -> Result<(), GraphError> {
        if !self.nodes.contains(handle) {
            return Err(GraphError::BadListEntry {
                list: "result",
                index: handle.index(),
            });
        }
        self.results.push(handle);
        Ok(())
    }

    /// Looks up a node.
    pub fn node(&self, handle: Handle<Node>) -> &Node {
        &self.nodes[handle]
    }

    /// Fallible node lookup.
    pub fn try_node(&self, handle: Handle<Node>) -> Option<&Node> {
        self.nodes.try_get(handle)
    }

    /// Output element type of a node.
    pub fn element_type(&self, handle: Handle<Node>) -> ElementType {
        self.nodes[handle].ty
    }

    /// Output shape of a node.
    pub fn shape(&self, handle: Handle<Node>) -> &Shape {
        &self.nodes[handle].shape
    }

    /// Ordered graph inputs.
    pub fn parameters(&self) -> &[Handle<Node>] {
        &self.parameters
    }

    /// Ordered graph outputs.
    pub fn results(&self) -> &[Handle<Node>] {
        &self.results
    }

    /// Number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over `(handle, &node)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<Node>, &Node)> {
        self.nodes.iter()
    }

    /// Checks structural invariants: every node input, parameter, and result
    /// handle must resolve inside the arena, and parameter-list entries must
    /// actually be parameter nodes.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (_, node) in self.nodes.iter() {
            for &input in &node.inputs {
                if !self.nodes.contains(input) {
                    return Err(GraphError::BadHandle {
                        index: input.index(),
                        size: self.nodes.len(),
                    });
                }
            }
        }
        for &p in &self.parameters {
            match self.nodes.try_get(p) {
                Some(node) if matches!(node.kind, NodeKind::Parameter) => {}
                _ => {
                    return Err(GraphError::BadListEntry {
                        list: "parameter",
                        index: p.index(),
                    })
                }
            }
        }
        for &r in &self.results {
            if !self.nodes.contains(r) {
                return Err(GraphError::BadListEntry {
                    list: "result",
                    index: r.index(),
                });
            }
        }
        Ok(())
    }
}
