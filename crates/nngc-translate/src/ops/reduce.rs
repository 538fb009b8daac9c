//! Reduction operators and the argmax family.
//!
//! MEAN carries its keep_dims as an INT32 (strictly positive is true); the
//! REDUCE_* generation declares it BOOL. Axis lists normalize negative
//! entries modulo rank.

use nngc_graph::{Handle, Node, NodeKind, ReduceOp, Shape, TopKOutput};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::ops::normalized_axes;
use crate::primitives::reduce_shape;

fn reduction(
    ctx: &mut OpCtx,
    op: ReduceOp,
    bool_input: bool,
) -> Result<Handle<Node>, TranslateError> {
    let input = if bool_input {
        ctx.input_node(0)?
    } else {
        ctx.float_input(0)?
    };
    let rank = ctx.graph.shape(input).rank();
    let axes = normalized_axes(ctx, 1, rank)?;
    let keep_dims = ctx.keep_dims(2)?;
    let shape = reduce_shape(ctx.graph.shape(input), &axes, keep_dims);
    let ty = ctx.node_type(input);
    Ok(ctx.graph.add_node(Node {
        kind: NodeKind::Reduce {
            op,
            axes,
            keep_dims,
        },
        inputs: vec![input],
        ty,
        shape,
        name: None,
    })?)
}

pub(crate) struct Mean;
impl OperationBuilder for Mean {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        reduction(ctx, ReduceOp::Mean, false)
    }
}

pub(crate) struct ReduceAll;
impl OperationBuilder for ReduceAll {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        reduction(ctx, ReduceOp::All, true)
    }
}

pub(crate) struct ReduceAny;
impl OperationBuilder for ReduceAny {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        reduction(ctx, ReduceOp::Any, true)
    }
}

pub(crate) struct ReduceMax;
impl OperationBuilder for ReduceMax {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        reduction(ctx, ReduceOp::Max, false)
    }
}

pub(crate) struct ReduceMin;
impl OperationBuilder for ReduceMin {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        reduction(ctx, ReduceOp::Min, false)
    }
}

pub(crate) struct ReduceProd;
impl OperationBuilder for ReduceProd {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        reduction(ctx, ReduceOp::Prod, false)
    }
}

pub(crate) struct ReduceSum;
impl OperationBuilder for ReduceSum {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        reduction(ctx, ReduceOp::Sum, false)
    }
}

/// ARGMAX/ARGMIN lower to a k=1 top-k selection whose index output is kept
/// and the selection axis squeezed away.
fn arg_extreme(ctx: &mut OpCtx, largest: bool) -> Result<Handle<Node>, TranslateError> {
    let input = ctx.float_input(0)?;
    let axis = ctx.parse::<i32>(1)?;
    let axis = ctx.resolve_axis(input, axis)?;

    let mut picked = ctx.graph.shape(input).dims().to_vec();
    picked[axis] = 1;
    let indices = ctx.graph.add_node(Node {
        kind: NodeKind::TopK {
            k: 1,
            axis,
            largest,
            output: TopKOutput::Indices,
        },
        inputs: vec![input],
        ty: nngc_graph::ElementType::I32,
        shape: Shape(picked.clone()),
        name: None,
    })?;

    picked.remove(axis);
    ctx.reshape(indices, Shape(picked))
}

pub(crate) struct ArgMax;
impl OperationBuilder for ArgMax {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        arg_extreme(ctx, true)
    }
}

pub(crate) struct ArgMin;
impl OperationBuilder for ArgMin {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        arg_extreme(ctx, false)
    }
}
