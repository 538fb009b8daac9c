//! 2-D pooling operators.
//!
//! Each comes in two signatures: explicit padding (ten or more inputs,
//! per-edge pads) and implicit padding (a scheme code). Spatial parameters
//! arrive width-first; the internal layout is NCHW, so NHWC models are
//! wrapped in a transpose pair.

use nngc_graph::{BinaryOp, Handle, Node, NodeKind, PadScheme, Shape, UnaryOp};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::window_output_dim;

struct PoolParams {
    kernel: [usize; 2],
    strides: [usize; 2],
    pads_begin: [usize; 2],
    pads_end: [usize; 2],
    scheme: PadScheme,
    activation: i32,
    nchw: bool,
}

pub(super) fn parse_scheme(ctx: &OpCtx, slot: usize) -> Result<PadScheme, TranslateError> {
    match ctx.parse::<i32>(slot)? {
        1 => Ok(PadScheme::SameUpper),
        2 => Ok(PadScheme::Valid),
        other => Err(ctx.reject(format!("unknown implicit padding scheme {other}"))),
    }
}

fn dim(ctx: &OpCtx, slot: usize) -> Result<usize, TranslateError> {
    Ok(ctx.parse::<i32>(slot)?.max(0) as usize)
}

fn parse_pool(ctx: &OpCtx) -> Result<PoolParams, TranslateError> {
    if ctx.input_count() >= 10 {
        let (pad_l, pad_r, pad_t, pad_b) = (dim(ctx, 1)?, dim(ctx, 2)?, dim(ctx, 3)?, dim(ctx, 4)?);
        Ok(PoolParams {
            kernel: [dim(ctx, 8)?, dim(ctx, 7)?],
            strides: [dim(ctx, 6)?, dim(ctx, 5)?],
            pads_begin: [pad_t, pad_l],
            pads_end: [pad_b, pad_r],
            scheme: PadScheme::Explicit,
            activation: ctx.parse::<i32>(9)?,
            nchw: ctx.flag_or(10, false)?,
        })
    } else {
        Ok(PoolParams {
            kernel: [dim(ctx, 5)?, dim(ctx, 4)?],
            strides: [dim(ctx, 3)?, dim(ctx, 2)?],
            pads_begin: [0, 0],
            pads_end: [0, 0],
            scheme: parse_scheme(ctx, 1)?,
            activation: ctx.parse::<i32>(6)?,
            nchw: ctx.flag_or(7, false)?,
        })
    }
}

/// Output shape of a pooling window over an NCHW input.
fn pooled_shape(input: &Shape, p: &PoolParams) -> Shape {
    let d = input.dims();
    let out_h = window_output_dim(
        d[2],
        p.kernel[0],
        p.strides[0],
        1,
        (p.pads_begin[0], p.pads_end[0]),
        p.scheme,
    );
    let out_w = window_output_dim(
        d[3],
        p.kernel[1],
        p.strides[1],
        1,
        (p.pads_begin[1], p.pads_end[1]),
        p.scheme,
    );
    Shape(vec![d[0], d[1], out_h, out_w])
}

enum PoolKind {
    Avg,
    Max,
    L2,
}

fn pool(ctx: &mut OpCtx, kind: PoolKind) -> Result<Handle<Node>, TranslateError> {
    let p = parse_pool(ctx)?;
    let mut input = ctx.float_input(0)?;
    if !p.nchw {
        input = ctx.to_nchw(input)?;
    }
    if let PoolKind::L2 = kind {
        input = ctx.binary(BinaryOp::Mul, input, input)?;
    }

    let shape = pooled_shape(ctx.graph.shape(input), &p);
    let node_kind = match kind {
        PoolKind::Max => NodeKind::MaxPool {
            kernel: p.kernel,
            strides: p.strides,
            pads_begin: p.pads_begin,
            pads_end: p.pads_end,
            scheme: p.scheme,
        },
        PoolKind::Avg | PoolKind::L2 => NodeKind::AvgPool {
            kernel: p.kernel,
            strides: p.strides,
            pads_begin: p.pads_begin,
            pads_end: p.pads_end,
            scheme: p.scheme,
        },
    };
    let ty = ctx.node_type(input);
    let mut out = ctx.graph.add_node(Node {
        kind: node_kind,
        inputs: vec![input],
        ty,
        shape,
        name: None,
    })?;
    if let PoolKind::L2 = kind {
        out = ctx.unary(UnaryOp::Sqrt, out)?;
    }
    out = ctx.apply_activation(out, p.activation)?;
    if !p.nchw {
        out = ctx.to_nhwc(out)?;
    }
    Ok(out)
}

fn rank4(ctx: &OpCtx) -> Result<(), String> {
    let rank = ctx.input_rank(0).map_err(|e| e.to_string())?;
    if rank != 4 {
        return Err(format!("expected a rank-4 input, found rank {rank}"));
    }
    Ok(())
}

pub(crate) struct AveragePool2d;
impl OperationBuilder for AveragePool2d {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        rank4(ctx)
    }
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        pool(ctx, PoolKind::Avg)
    }
}

pub(crate) struct MaxPool2d;
impl OperationBuilder for MaxPool2d {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        rank4(ctx)
    }
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        pool(ctx, PoolKind::Max)
    }
}

/// `sqrt(avg_pool(x^2))`.
pub(crate) struct L2Pool2d;
impl OperationBuilder for L2Pool2d {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        rank4(ctx)
    }
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        pool(ctx, PoolKind::L2)
    }
}
