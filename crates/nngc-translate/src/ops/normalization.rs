//! Normalization operators.

use nngc_graph::{BinaryOp, Handle, Node, NodeKind, ReduceOp, UnaryOp};
use nngc_model::OperandType;

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::reduce_shape;

/// `gamma * mvn(x) + beta` over the spatial axes of each channel.
///
/// The epsilon sits inside the square root, so a zero-variance slice
/// divides by `sqrt(eps)` rather than zero.
pub(crate) struct InstanceNormalization;
impl OperationBuilder for InstanceNormalization {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        let float = ctx.input_has_type(0, OperandType::TensorFloat32)
            || ctx.input_has_type(0, OperandType::TensorFloat16);
        if !float {
            return Err("input must be a float tensor".into());
        }
        let rank = ctx.input_rank(0).map_err(|e| e.to_string())?;
        if rank != 4 {
            return Err(format!("expected a rank-4 input, found rank {rank}"));
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let gamma = ctx.parse::<f32>(1)?;
        let beta = ctx.parse::<f32>(2)?;
        let eps = ctx.parse::<f32>(3)?;
        let nchw = ctx.flag_or(4, false)?;

        let mut input = ctx.float_input(0)?;
        if !nchw {
            input = ctx.to_nchw(input)?;
        }
        let ty = ctx.node_type(input);
        let shape = ctx.node_shape(input);
        let mvn = ctx.graph.add_node(Node {
            kind: NodeKind::Mvn {
                axes: vec![2, 3],
                eps,
            },
            inputs: vec![input],
            ty,
            shape,
            name: None,
        })?;
        let gamma = ctx.const_f32(gamma);
        let scaled = ctx.binary(BinaryOp::Mul, mvn, gamma)?;
        let beta = ctx.const_f32(beta);
        let out = ctx.binary(BinaryOp::Add, scaled, beta)?;
        if !nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

/// `x / sqrt(max(sum(x^2, axis), 1e-6))`.
pub(crate) struct L2Normalization;
impl OperationBuilder for L2Normalization {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        let axis = ctx.parse_or::<i32>(1, -1)?;
        let axis = ctx.resolve_axis(input, axis)?;

        let squared = ctx.binary(BinaryOp::Mul, input, input)?;
        let shape = reduce_shape(ctx.graph.shape(squared), &[axis], true);
        let ty = ctx.node_type(squared);
        let sum = ctx.graph.add_node(Node {
            kind: NodeKind::Reduce {
                op: ReduceOp::Sum,
                axes: vec![axis],
                keep_dims: true,
            },
            inputs: vec![squared],
            ty,
            shape,
            name: None,
        })?;
        let floor = ctx.const_f32(1e-6);
        let bounded = ctx.binary(BinaryOp::Maximum, sum, floor)?;
        let norm = ctx.unary(UnaryOp::Sqrt, bounded)?;
        ctx.binary(BinaryOp::Div, input, norm)
    }
}

/// Across-channel local response normalization; the window covers
/// `2 * radius + 1` channels.
pub(crate) struct LocalResponseNormalization;
impl OperationBuilder for LocalResponseNormalization {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        let rank = ctx.input_rank(0).map_err(|e| e.to_string())?;
        if rank != 4 {
            return Err(format!("expected a rank-4 input, found rank {rank}"));
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let radius = ctx.parse::<i32>(1)?.max(0) as usize;
        let bias = ctx.parse::<f32>(2)?;
        let alpha = ctx.parse::<f32>(3)?;
        let beta = ctx.parse::<f32>(4)?;
        let axis = ctx.parse_or::<i32>(5, -1)?;

        let input = ctx.float_input(0)?;
        let rank = ctx.graph.shape(input).rank();
        let axis = ctx.resolve_axis(input, axis)?;
        // The normalization window runs across channels: the last axis in
        // the model's NHWC view, the second after conversion.
        if axis != rank - 1 {
            return Err(ctx.reject(format!(
                "normalization along axis {axis} is not supported"
            )));
        }

        let input = ctx.to_nchw(input)?;
        let ty = ctx.node_type(input);
        let shape = ctx.node_shape(input);
        let out = ctx.graph.add_node(Node {
            kind: NodeKind::Lrn {
                alpha,
                beta,
                bias,
                size: 2 * radius + 1,
            },
            inputs: vec![input],
            ty,
            shape,
            name: None,
        })?;
        ctx.to_nhwc(out)
    }
}
