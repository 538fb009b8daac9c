//! Spatial resampling operators.
//!
//! The output size arrives either as INT32 width/height or as float scale
//! factors (width first, matching the model's NHWC view). FLOAT16 models
//! declare the scales as halves.

use half::f16;
use nngc_graph::{Handle, InterpolateMode, Node, NodeKind, Shape};
use nngc_model::OperandType;

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;

fn scale_factor(ctx: &OpCtx, slot: usize) -> Result<Option<f32>, TranslateError> {
    if ctx.input_has_type(slot, OperandType::Float32) {
        Ok(Some(ctx.parse::<f32>(slot)?))
    } else if ctx.input_has_type(slot, OperandType::Float16) {
        Ok(Some(ctx.parse::<f16>(slot)?.to_f32()))
    } else {
        Ok(None)
    }
}

fn resize(ctx: &mut OpCtx, mode: InterpolateMode) -> Result<Handle<Node>, TranslateError> {
    let nchw = ctx.flag_or(3, false)?;
    let align_corners = ctx.flag_or(4, false)?;
    let half_pixel = ctx.flag_or(5, false)?;

    let mut input = ctx.float_input(0)?;
    if !nchw {
        input = ctx.to_nchw(input)?;
    }
    let d = ctx.graph.shape(input).dims().to_vec();
    let (out_w, out_h) = match (scale_factor(ctx, 1)?, scale_factor(ctx, 2)?) {
        (Some(sw), Some(sh)) => (
            (d[3] as f32 * sw).floor() as usize,
            (d[2] as f32 * sh).floor() as usize,
        ),
        _ => (
            ctx.parse::<i32>(1)?.max(0) as usize,
            ctx.parse::<i32>(2)?.max(0) as usize,
        ),
    };
    if out_w == 0 || out_h == 0 {
        return Err(ctx.reject("output spatial size must be positive"));
    }

    let ty = ctx.node_type(input);
    let out = ctx.graph.add_node(Node {
        kind: NodeKind::Interpolate {
            mode,
            sizes: [out_h, out_w],
            align_corners,
            half_pixel,
        },
        inputs: vec![input],
        ty,
        shape: Shape(vec![d[0], d[1], out_h, out_w]),
        name: None,
    })?;
    if !nchw {
        ctx.to_nhwc(out)
    } else {
        Ok(out)
    }
}

fn rank4(ctx: &OpCtx) -> Result<(), String> {
    let rank = ctx.input_rank(0).map_err(|e| e.to_string())?;
    if rank != 4 {
        return Err(format!("expected a rank-4 input, found rank {rank}"));
    }
    Ok(())
}

pub(crate) struct ResizeBilinear;
impl OperationBuilder for ResizeBilinear {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        rank4(ctx)
    }
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        resize(ctx, InterpolateMode::Linear)
    }
}

pub(crate) struct ResizeNearestNeighbor;
impl OperationBuilder for ResizeNearestNeighbor {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        rank4(ctx)
    }
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        resize(ctx, InterpolateMode::Nearest)
    }
}
