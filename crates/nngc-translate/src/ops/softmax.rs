//! Softmax family, lowered to primitive arithmetic.

use half::f16;
use nngc_graph::{BinaryOp, Handle, Node, NodeKind, ReduceOp, UnaryOp};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::reduce_shape;

/// The beta scale parameter follows the tensor precision: FLOAT16 models
/// declare it as a half scalar.
fn parse_beta(ctx: &OpCtx, slot: usize) -> Result<f32, TranslateError> {
    if ctx.input_has_type(slot, nngc_model::OperandType::Float16) {
        Ok(ctx.parse::<f16>(slot)?.to_f32())
    } else {
        ctx.parse::<f32>(slot)
    }
}

fn reduce_keep(
    ctx: &mut OpCtx,
    op: ReduceOp,
    input: Handle<Node>,
    axis: usize,
) -> Result<Handle<Node>, TranslateError> {
    let shape = reduce_shape(ctx.graph.shape(input), &[axis], true);
    let ty = ctx.node_type(input);
    Ok(ctx.graph.add_node(Node {
        kind: NodeKind::Reduce {
            op,
            axes: vec![axis],
            keep_dims: true,
        },
        inputs: vec![input],
        ty,
        shape,
        name: None,
    })?)
}

/// `exp(beta * (x - max(x))) / sum(exp(beta * (x - max(x))))` along `axis`.
pub(crate) struct Softmax;

impl Softmax {
    fn lower(&self, ctx: &mut OpCtx, stabilized: bool) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        let beta = parse_beta(ctx, 1)?;
        let axis = ctx.parse_or::<i32>(2, -1)?;
        let axis = ctx.resolve_axis(input, axis)?;

        let mut shifted = input;
        if stabilized {
            let max = reduce_keep(ctx, ReduceOp::Max, input, axis)?;
            shifted = ctx.binary(BinaryOp::Sub, input, max)?;
        }
        if beta != 1.0 {
            let beta = ctx.const_f32(beta);
            shifted = ctx.binary(BinaryOp::Mul, shifted, beta)?;
        }
        let exp = ctx.unary(UnaryOp::Exp, shifted)?;
        let sum = reduce_keep(ctx, ReduceOp::Sum, exp, axis)?;
        ctx.binary(BinaryOp::Div, exp, sum)
    }
}

impl OperationBuilder for Softmax {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        self.lower(ctx, true)
    }

    /// The VPU plugin folds the exp/sum pair into one fused kernel and does
    /// its own range handling, so the max-subtraction is skipped there.
    fn create_node_for_plugin(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        match ctx.plugin {
            crate::plugin::PluginTarget::Vpu => self.lower(ctx, false),
            _ => self.create_node(ctx),
        }
    }
}

/// `beta * x - log(sum(exp(beta * x)))` along `axis`.
pub(crate) struct LogSoftmax;
impl OperationBuilder for LogSoftmax {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        let beta = parse_beta(ctx, 1)?;
        let axis = ctx.parse_or::<i32>(2, -1)?;
        let axis = ctx.resolve_axis(input, axis)?;

        let mut scaled = input;
        if beta != 1.0 {
            let beta = ctx.const_f32(beta);
            scaled = ctx.binary(BinaryOp::Mul, scaled, beta)?;
        }
        let exp = ctx.unary(UnaryOp::Exp, scaled)?;
        let sum = reduce_keep(ctx, ReduceOp::Sum, exp, axis)?;
        let log = ctx.unary(UnaryOp::Log, sum)?;
        ctx.binary(BinaryOp::Sub, scaled, log)
    }
}
