//! Comparison, logical, and selection operators. All produce or consume
//! boolean tensors and broadcast NumPy-style.

use nngc_graph::{BinaryOp, Handle, Node, NodeKind, UnaryOp};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::broadcast_shapes;

fn comparison(ctx: &mut OpCtx, op: BinaryOp) -> Result<Handle<Node>, TranslateError> {
    let lhs = ctx.float_input(0)?;
    let rhs = ctx.float_input(1)?;
    ctx.binary(op, lhs, rhs)
}

/// Logical operators take the boolean storage directly.
fn logical(ctx: &mut OpCtx, op: BinaryOp) -> Result<Handle<Node>, TranslateError> {
    let lhs = ctx.input_node(0)?;
    let rhs = ctx.input_node(1)?;
    ctx.binary(op, lhs, rhs)
}

pub(crate) struct Equal;
impl OperationBuilder for Equal {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        comparison(ctx, BinaryOp::Equal)
    }
}

pub(crate) struct NotEqual;
impl OperationBuilder for NotEqual {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        comparison(ctx, BinaryOp::NotEqual)
    }
}

pub(crate) struct Greater;
impl OperationBuilder for Greater {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        comparison(ctx, BinaryOp::Greater)
    }
}

pub(crate) struct GreaterEqual;
impl OperationBuilder for GreaterEqual {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        comparison(ctx, BinaryOp::GreaterEqual)
    }
}

pub(crate) struct Less;
impl OperationBuilder for Less {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        comparison(ctx, BinaryOp::Less)
    }
}

pub(crate) struct LessEqual;
impl OperationBuilder for LessEqual {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        comparison(ctx, BinaryOp::LessEqual)
    }
}

pub(crate) struct LogicalAnd;
impl OperationBuilder for LogicalAnd {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        logical(ctx, BinaryOp::LogicalAnd)
    }
}

pub(crate) struct LogicalOr;
impl OperationBuilder for LogicalOr {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        logical(ctx, BinaryOp::LogicalOr)
    }
}

pub(crate) struct LogicalNot;
impl OperationBuilder for LogicalNot {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        ctx.unary(UnaryOp::LogicalNot, input)
    }
}

/// Elementwise choice between two tensors by a boolean condition.
pub(crate) struct Select;
impl OperationBuilder for Select {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let cond = ctx.input_node(0)?;
        let then = ctx.float_input(1)?;
        let otherwise = ctx.float_input(2)?;
        let shape = broadcast_shapes(ctx.graph.shape(then), ctx.graph.shape(otherwise))?;
        let shape = broadcast_shapes(ctx.graph.shape(cond), &shape)?;
        let ty = ctx.node_type(then);
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::Select,
            inputs: vec![cond, then, otherwise],
            ty,
            shape,
            name: None,
        })?)
    }
}
