//! Convolution operators and the fully-connected layer.
//!
//! NNAPI filters arrive OHWI (depthwise: 1HWO) and are legalized to the
//! OIHW layout the convolution nodes expect. Bias tensors in quantized
//! models arrive as INT32 with an implied scale of `input_scale *
//! filter_scale` (per-channel filters carry one scale per output channel)
//! and are materialized as f32 constants.

use nngc_graph::{BinaryOp, ElementType, Handle, Node, NodeKind, PadScheme, Shape};
use nngc_model::OperandType;

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::ops::pool::parse_scheme;
use crate::primitives::{window_output_dim, IHWO_TO_OIHW, OHWI_TO_OIHW};

struct ConvParams {
    strides: [usize; 2],
    dilations: [usize; 2],
    pads_begin: [usize; 2],
    pads_end: [usize; 2],
    scheme: PadScheme,
    activation: i32,
    nchw: bool,
}

fn dim(ctx: &OpCtx, slot: usize) -> Result<usize, TranslateError> {
    Ok(ctx.parse::<i32>(slot)?.max(0) as usize)
}

fn dim_or(ctx: &OpCtx, slot: usize, default: usize) -> Result<usize, TranslateError> {
    if slot < ctx.input_count() {
        dim(ctx, slot)
    } else {
        Ok(default)
    }
}

/// Explicit-padding parse: pads at `base..base+4` (left, right, top,
/// bottom), then stride w/h, then the trailing slots the caller names.
fn explicit_params(
    ctx: &OpCtx,
    base: usize,
    activation: usize,
    layout: usize,
    dilation: Option<usize>,
) -> Result<ConvParams, TranslateError> {
    let (pad_l, pad_r) = (dim(ctx, base)?, dim(ctx, base + 1)?);
    let (pad_t, pad_b) = (dim(ctx, base + 2)?, dim(ctx, base + 3)?);
    let dilations = match dilation {
        Some(slot) => [dim_or(ctx, slot + 1, 1)?, dim_or(ctx, slot, 1)?],
        None => [1, 1],
    };
    Ok(ConvParams {
        strides: [dim(ctx, base + 5)?, dim(ctx, base + 4)?],
        dilations,
        pads_begin: [pad_t, pad_l],
        pads_end: [pad_b, pad_r],
        scheme: PadScheme::Explicit,
        activation: ctx.parse::<i32>(activation)?,
        nchw: ctx.flag_or(layout, false)?,
    })
}

fn implicit_params(
    ctx: &OpCtx,
    base: usize,
    activation: usize,
    layout: usize,
    dilation: Option<usize>,
) -> Result<ConvParams, TranslateError> {
    let dilations = match dilation {
        Some(slot) => [dim_or(ctx, slot + 1, 1)?, dim_or(ctx, slot, 1)?],
        None => [1, 1],
    };
    Ok(ConvParams {
        strides: [dim(ctx, base + 2)?, dim(ctx, base + 1)?],
        dilations,
        pads_begin: [0, 0],
        pads_end: [0, 0],
        scheme: parse_scheme(ctx, base)?,
        activation: ctx.parse::<i32>(activation)?,
        nchw: ctx.flag_or(layout, false)?,
    })
}

/// Resolves a filter input, decoding per-channel quantized constants to f32
/// (the per-tensor path goes through the shared dequantize helper).
fn filter_node(ctx: &mut OpCtx, slot: usize) -> Result<Handle<Node>, TranslateError> {
    let operand = ctx.input_operand(slot)?;
    if operand.ty != OperandType::TensorQuant8SymmPerChannel {
        return ctx.float_input(slot);
    }
    let quant = operand
        .channel_quant
        .as_ref()
        .ok_or_else(|| ctx.reject("per-channel filter is missing its quantization parameters"))?;
    let bytes = ctx.model.operand_bytes(ctx.input_index(slot)?)?;
    let dims = &operand.dimensions;
    let channel_dim = quant.channel_dim as usize;
    let inner: usize = dims[channel_dim + 1..].iter().map(|&d| d as usize).product();
    let channels = dims[channel_dim] as usize;
    let values: Vec<f32> = bytes
        .iter()
        .enumerate()
        .map(|(i, &b)| (b as i8) as f32 * quant.scales[(i / inner.max(1)) % channels])
        .collect();
    Ok(ctx.const_f32_vec(&values, Shape::from_dims(dims)))
}

/// Resolves a bias input. INT32 bias in a quantized model dequantizes with
/// `input_scale * filter_scale` (per output channel when the filter is
/// per-channel quantized).
fn bias_node(
    ctx: &mut OpCtx,
    slot: usize,
    input_slot: usize,
    filter_slot: usize,
) -> Result<Handle<Node>, TranslateError> {
    let operand = ctx.input_operand(slot)?;
    if operand.ty == OperandType::TensorInt32 && operand.lifetime.is_const() {
        let raw: Vec<i32> = ctx.parse(slot)?;
        let input_scale = ctx.input_operand(input_slot)?.scale;
        let filter = ctx.input_operand(filter_slot)?;
        let values: Vec<f32> = match &filter.channel_quant {
            Some(quant) => raw
                .iter()
                .enumerate()
                .map(|(i, &v)| v as f32 * input_scale * quant.scales[i])
                .collect(),
            None => {
                let scale = input_scale * filter.scale;
                raw.iter().map(|&v| v as f32 * scale).collect()
            }
        };
        let shape = Shape(vec![values.len()]);
        Ok(ctx.const_f32_vec(&values, shape))
    } else {
        let node = ctx.float_input(slot)?;
        if ctx.graph.element_type(node) == ElementType::I32 {
            ctx.convert(node, ElementType::F32)
        } else {
            Ok(node)
        }
    }
}

/// Emits the convolution node plus the broadcast bias add, all in NCHW.
fn convolution(
    ctx: &mut OpCtx,
    input: Handle<Node>,
    filter: Handle<Node>,
    bias: Handle<Node>,
    p: &ConvParams,
    groups: usize,
) -> Result<Handle<Node>, TranslateError> {
    let xd = ctx.graph.shape(input).dims().to_vec();
    let fd = ctx.graph.shape(filter).dims().to_vec();
    let out_h = window_output_dim(
        xd[2],
        fd[2],
        p.strides[0],
        p.dilations[0],
        (p.pads_begin[0], p.pads_end[0]),
        p.scheme,
    );
    let out_w = window_output_dim(
        xd[3],
        fd[3],
        p.strides[1],
        p.dilations[1],
        (p.pads_begin[1], p.pads_end[1]),
        p.scheme,
    );
    let ty = ctx.node_type(input);
    let conv = ctx.graph.add_node(Node {
        kind: NodeKind::Convolution {
            strides: p.strides,
            dilations: p.dilations,
            pads_begin: p.pads_begin,
            pads_end: p.pads_end,
            scheme: p.scheme,
            groups,
        },
        inputs: vec![input, filter],
        ty,
        shape: Shape(vec![xd[0], fd[0], out_h, out_w]),
        name: None,
    })?;
    let channels = ctx.graph.shape(bias).element_count();
    let bias = ctx.reshape(bias, Shape(vec![1, channels, 1, 1]))?;
    ctx.binary(BinaryOp::Add, conv, bias)
}

fn validate_conv(ctx: &OpCtx) -> Result<(), String> {
    for slot in [0, 1] {
        let rank = ctx.input_rank(slot).map_err(|e| e.to_string())?;
        if rank != 4 {
            return Err(format!("input {slot}: expected rank 4, found rank {rank}"));
        }
    }
    Ok(())
}

pub(crate) struct Conv2d;
impl OperationBuilder for Conv2d {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        validate_conv(ctx)
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let n = ctx.input_count();
        // The 10-input case is ambiguous between the explicit v1.0 form and
        // the implicit form with layout + dilations; slot 7 is a BOOL only
        // in the latter.
        let explicit = n == 13
            || n == 11
            || (n == 10 && !ctx.input_has_type(7, OperandType::Bool));
        let p = if explicit {
            explicit_params(ctx, 3, 9, 10, Some(11))?
        } else {
            implicit_params(ctx, 3, 6, 7, Some(8))?
        };

        let mut input = ctx.float_input(0)?;
        let filter = filter_node(ctx, 1)?;
        let filter = ctx.transpose_node(filter, &OHWI_TO_OIHW)?;
        let bias = bias_node(ctx, 2, 0, 1)?;

        if !p.nchw {
            input = ctx.to_nchw(input)?;
        }
        let out = convolution(ctx, input, filter, bias, &p, 1)?;
        let out = ctx.apply_activation(out, p.activation)?;
        if !p.nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

/// Depthwise convolution: one filter slice per input channel, lowered to a
/// grouped convolution with `groups == channels`.
pub(crate) struct DepthwiseConv2d;
impl OperationBuilder for DepthwiseConv2d {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        validate_conv(ctx)?;
        let filter = ctx.input_dims(1).map_err(|e| e.to_string())?;
        if filter[0] != 1 {
            return Err(format!(
                "depthwise filter must have a leading dimension of 1, found {}",
                filter[0]
            ));
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let n = ctx.input_count();
        let explicit = n == 14
            || n == 12
            || (n == 11 && !ctx.input_has_type(8, OperandType::Bool));
        let (p, multiplier) = if explicit {
            (explicit_params(ctx, 3, 10, 11, Some(12))?, dim(ctx, 9)?)
        } else {
            (implicit_params(ctx, 3, 7, 8, Some(9))?, dim(ctx, 6)?)
        };

        let mut input = ctx.float_input(0)?;
        // Filter is [1, kh, kw, out_c] with out_c = channels * multiplier.
        let filter = filter_node(ctx, 1)?;
        let filter = ctx.transpose_node(filter, &IHWO_TO_OIHW)?;
        let bias = bias_node(ctx, 2, 0, 1)?;

        if !p.nchw {
            input = ctx.to_nchw(input)?;
        }
        let channels = ctx.graph.shape(input).dims()[1];
        let out_channels = ctx.graph.shape(filter).dims()[0];
        if multiplier == 0 || out_channels != channels * multiplier {
            return Err(ctx.reject(format!(
                "depth multiplier {multiplier} does not relate {channels} input \
                 channels to {out_channels} filter outputs"
            )));
        }
        let out = convolution(ctx, input, filter, bias, &p, channels)?;
        let out = ctx.apply_activation(out, p.activation)?;
        if !p.nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

pub(crate) struct GroupedConv2d;
impl OperationBuilder for GroupedConv2d {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        validate_conv(ctx)
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let explicit = ctx.input_count() == 12;
        let (p, groups) = if explicit {
            (explicit_params(ctx, 3, 10, 11, None)?, dim(ctx, 9)?)
        } else {
            (implicit_params(ctx, 3, 7, 8, None)?, dim(ctx, 6)?)
        };
        if groups == 0 {
            return Err(ctx.reject("group count must be positive"));
        }

        let mut input = ctx.float_input(0)?;
        let filter = filter_node(ctx, 1)?;
        let filter = ctx.transpose_node(filter, &OHWI_TO_OIHW)?;
        let bias = bias_node(ctx, 2, 0, 1)?;

        if !p.nchw {
            input = ctx.to_nchw(input)?;
        }
        let out = convolution(ctx, input, filter, bias, &p, groups)?;
        let out = ctx.apply_activation(out, p.activation)?;
        if !p.nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

pub(crate) struct TransposeConv2d;
impl OperationBuilder for TransposeConv2d {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        validate_conv(ctx)
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let explicit = ctx.input_count() == 11;
        let (p, out_spatial) = if explicit {
            (explicit_params(ctx, 3, 9, 10, None)?, None)
        } else {
            // Implicit form carries the output shape as an NHWC dims tensor.
            let sizes: Vec<i32> = ctx.parse(3)?;
            if sizes.len() != 4 {
                return Err(ctx.reject(format!(
                    "output shape tensor has {} entries, expected 4",
                    sizes.len()
                )));
            }
            let p = ConvParams {
                strides: [dim(ctx, 6)?, dim(ctx, 5)?],
                dilations: [1, 1],
                pads_begin: [0, 0],
                pads_end: [0, 0],
                scheme: parse_scheme(ctx, 4)?,
                activation: ctx.parse::<i32>(7)?,
                nchw: ctx.flag_or(8, false)?,
            };
            let spatial = [sizes[1].max(0) as usize, sizes[2].max(0) as usize];
            (p, Some(spatial))
        };

        let mut input = ctx.float_input(0)?;
        let filter = filter_node(ctx, 1)?;
        let filter = ctx.transpose_node(filter, &OHWI_TO_OIHW)?;
        let bias = bias_node(ctx, 2, 0, 1)?;

        if !p.nchw {
            input = ctx.to_nchw(input)?;
        }
        let xd = ctx.graph.shape(input).dims().to_vec();
        let fd = ctx.graph.shape(filter).dims().to_vec();
        let [out_h, out_w] = match out_spatial {
            Some(sizes) => sizes,
            None => [
                ((xd[2] - 1) * p.strides[0] + fd[2])
                    .saturating_sub(p.pads_begin[0] + p.pads_end[0]),
                ((xd[3] - 1) * p.strides[1] + fd[3])
                    .saturating_sub(p.pads_begin[1] + p.pads_end[1]),
            ],
        };
        let ty = ctx.node_type(input);
        let deconv = ctx.graph.add_node(Node {
            kind: NodeKind::ConvolutionBackprop {
                strides: p.strides,
                pads_begin: p.pads_begin,
                pads_end: p.pads_end,
                scheme: p.scheme,
            },
            inputs: vec![input, filter],
            ty,
            shape: Shape(vec![xd[0], fd[0], out_h, out_w]),
            name: None,
        })?;
        let channels = ctx.graph.shape(bias).element_count();
        let bias = ctx.reshape(bias, Shape(vec![1, channels, 1, 1]))?;
        let out = ctx.binary(BinaryOp::Add, deconv, bias)?;
        let out = ctx.apply_activation(out, p.activation)?;
        if !p.nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

/// `activation(x . weights^T + bias)`, flattening the input to two
/// dimensions first.
pub(crate) struct FullyConnected;
impl OperationBuilder for FullyConnected {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        let rank = ctx.input_rank(1).map_err(|e| e.to_string())?;
        if rank != 2 {
            return Err(format!("weights must be rank 2, found rank {rank}"));
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let mut input = ctx.float_input(0)?;
        let weights = filter_node(ctx, 1)?;
        let bias = bias_node(ctx, 2, 0, 1)?;
        let activation = ctx.parse::<i32>(3)?;

        let wd = ctx.graph.shape(weights).dims().to_vec();
        let (units, input_size) = (wd[0], wd[1]);
        let elements = ctx.graph.shape(input).element_count();
        if input_size == 0 || elements % input_size != 0 {
            return Err(ctx.reject(format!(
                "input of {elements} elements does not divide into rows of {input_size}"
            )));
        }
        let batch = elements / input_size;
        if ctx.graph.shape(input).dims() != [batch, input_size] {
            input = ctx.reshape(input, Shape(vec![batch, input_size]))?;
        }

        let ty = ctx.node_type(input);
        let product = ctx.graph.add_node(Node {
            kind: NodeKind::MatMul {
                transpose_a: false,
                transpose_b: true,
            },
            inputs: vec![input, weights],
            ty,
            shape: Shape(vec![batch, units]),
            name: None,
        })?;
        let with_bias = ctx.binary(BinaryOp::Add, product, bias)?;
        ctx.apply_activation(with_bias, activation)
    }
}
