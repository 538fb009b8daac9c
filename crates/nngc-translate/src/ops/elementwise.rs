//! Binary arithmetic operators.
//!
//! ADD/SUB/MUL/DIV carry the fused activation parameter at input slot 2;
//! MAXIMUM/MINIMUM/POW/PRELU do not.

use nngc_graph::{BinaryOp, Handle, Node, NodeKind};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::broadcast_shapes;

/// Broadcast arithmetic followed by the fused activation at slot 2.
fn fused_arithmetic(ctx: &mut OpCtx, op: BinaryOp) -> Result<Handle<Node>, TranslateError> {
    let lhs = ctx.float_input(0)?;
    let rhs = ctx.float_input(1)?;
    let raw = ctx.binary(op, lhs, rhs)?;
    let activation = ctx.parse_or::<i32>(2, 0)?;
    ctx.apply_activation(raw, activation)
}

fn plain_arithmetic(ctx: &mut OpCtx, op: BinaryOp) -> Result<Handle<Node>, TranslateError> {
    let lhs = ctx.float_input(0)?;
    let rhs = ctx.float_input(1)?;
    ctx.binary(op, lhs, rhs)
}

pub(crate) struct Add;
impl OperationBuilder for Add {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        fused_arithmetic(ctx, BinaryOp::Add)
    }
}

pub(crate) struct Sub;
impl OperationBuilder for Sub {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        fused_arithmetic(ctx, BinaryOp::Sub)
    }
}

pub(crate) struct Mul;
impl OperationBuilder for Mul {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        fused_arithmetic(ctx, BinaryOp::Mul)
    }
}

pub(crate) struct Div;
impl OperationBuilder for Div {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        fused_arithmetic(ctx, BinaryOp::Div)
    }
}

pub(crate) struct Maximum;
impl OperationBuilder for Maximum {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        plain_arithmetic(ctx, BinaryOp::Maximum)
    }
}

pub(crate) struct Minimum;
impl OperationBuilder for Minimum {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        plain_arithmetic(ctx, BinaryOp::Minimum)
    }
}

pub(crate) struct Pow;
impl OperationBuilder for Pow {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        plain_arithmetic(ctx, BinaryOp::Pow)
    }
}

/// Parametric ReLU; the slope tensor broadcasts against the data.
pub(crate) struct Prelu;
impl OperationBuilder for Prelu {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let data = ctx.float_input(0)?;
        let slope = ctx.float_input(1)?;
        let shape = broadcast_shapes(ctx.graph.shape(data), ctx.graph.shape(slope))?;
        let ty = ctx.node_type(data);
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::Prelu,
            inputs: vec![data, slope],
            ty,
            shape,
            name: None,
        })?)
    }
}
