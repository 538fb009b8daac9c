//! Shape and data-movement operators.
//!
//! These pass the operand's storage type straight through (no dequantize
//! round-trip): rearranging quantized bytes preserves their scale.

use nngc_graph::{Handle, Node, NodeKind, PadMode, Shape};
use nngc_model::{Lifetime, OperandType};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::resolve_reshape;

pub(crate) struct Reshape;
impl OperationBuilder for Reshape {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        let target = ctx.input_operand(1).map_err(|e| e.to_string())?;
        if !target.lifetime.is_const() {
            return Err("target shape must be a constant".into());
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let spec: Vec<i32> = ctx.parse(1)?;
        let shape = resolve_reshape(ctx.graph.shape(input), &spec);
        ctx.reshape(input, shape)
    }
}

pub(crate) struct Squeeze;
impl OperationBuilder for Squeeze {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let dims = ctx.graph.shape(input).dims().to_vec();
        let explicit = ctx.input_count() > 1
            && ctx.input_operand(1)?.lifetime != Lifetime::NoValue;
        let axes: Vec<usize> = if explicit {
            crate::ops::normalized_axes(ctx, 1, dims.len())?
        } else {
            (0..dims.len()).filter(|&i| dims[i] == 1).collect()
        };
        let kept: Vec<usize> = dims
            .iter()
            .enumerate()
            .filter(|(i, &d)| !(axes.contains(i) && d == 1))
            .map(|(_, &d)| d)
            .collect();
        ctx.reshape(input, Shape(kept))
    }
}

pub(crate) struct ExpandDims;
impl OperationBuilder for ExpandDims {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let mut dims = ctx.graph.shape(input).dims().to_vec();
        let axis = ctx.parse::<i32>(1)?;
        // The new axis may sit one past the current rank.
        let rank = dims.len() as i32 + 1;
        let axis = if axis < 0 { axis + rank } else { axis };
        if axis < 0 || axis >= rank {
            return Err(ctx.reject(format!("axis {axis} out of range for rank {rank}")));
        }
        dims.insert(axis as usize, 1);
        ctx.reshape(input, Shape(dims))
    }
}

pub(crate) struct Transpose;
impl OperationBuilder for Transpose {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let rank = ctx.graph.shape(input).rank();
        let explicit = ctx.input_count() > 1
            && ctx.input_operand(1)?.lifetime != Lifetime::NoValue;
        let perm: Vec<usize> = if explicit {
            let raw: Vec<i32> = ctx.parse(1)?;
            raw.iter()
                .map(|&a| crate::primitives::normalize_axis(a, rank))
                .collect::<Result<_, _>>()?
        } else {
            (0..rank).rev().collect()
        };
        ctx.transpose_node(input, &perm)
    }
}

/// Concatenates every data input along the axis carried in the final slot.
pub(crate) struct Concatenation;
impl OperationBuilder for Concatenation {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        if ctx.input_count() < 2 {
            return Err("expected at least one data input and the axis".into());
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let count = ctx.input_count() - 1;
        let mut inputs = Vec::with_capacity(count);
        for slot in 0..count {
            inputs.push(ctx.float_input(slot)?);
        }
        let axis = ctx.parse::<i32>(count)?;
        let axis = ctx.resolve_axis(inputs[0], axis)?;

        let mut dims = ctx.graph.shape(inputs[0]).dims().to_vec();
        dims[axis] = inputs
            .iter()
            .map(|&h| ctx.graph.shape(h).dims()[axis])
            .sum();
        let ty = ctx.node_type(inputs[0]);
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::Concat { axis },
            inputs,
            ty,
            shape: Shape(dims),
            name: None,
        })?)
    }
}

/// Even split into `parts` outputs; registers one node per output slot.
pub(crate) struct Split;
impl OperationBuilder for Split {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        // Unreachable through connect(); the first slice stands in when a
        // caller asks for a single node.
        self.connect(ctx)?;
        let operand = ctx.output_index(0)?;
        ctx.registry
            .try_resolve(operand)
            .ok_or(TranslateError::DanglingInput { operand })
    }

    fn connect(&self, ctx: &mut OpCtx) -> Result<(), TranslateError> {
        let input = ctx.input_node(0)?;
        let axis = ctx.parse::<i32>(1)?;
        let axis = ctx.resolve_axis(input, axis)?;
        let parts = ctx.parse::<i32>(2)?.max(0) as usize;

        let mut dims = ctx.graph.shape(input).dims().to_vec();
        if parts == 0 || dims[axis] % parts != 0 {
            return Err(ctx.reject(format!(
                "cannot split axis {axis} of size {} into {parts} even parts",
                dims[axis]
            )));
        }
        dims[axis] /= parts;

        let ty = ctx.node_type(input);
        for index in 0..parts {
            let part = ctx.graph.add_node(Node {
                kind: NodeKind::Split { axis, parts, index },
                inputs: vec![input],
                ty,
                shape: Shape(dims.clone()),
                name: None,
            })?;
            let part = ctx.requantize_for_output(part, index)?;
            ctx.record_output(index, part)?;
        }
        Ok(())
    }
}

pub(crate) struct Slice;
impl OperationBuilder for Slice {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        for slot in [1, 2] {
            let operand = ctx.input_operand(slot).map_err(|e| e.to_string())?;
            if !operand.lifetime.is_const() {
                return Err("begin and size must be constants".into());
            }
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let dims = ctx.graph.shape(input).dims().to_vec();
        let begin_raw: Vec<i32> = ctx.parse(1)?;
        let size_raw: Vec<i32> = ctx.parse(2)?;
        if begin_raw.len() != dims.len() || size_raw.len() != dims.len() {
            return Err(ctx.reject("begin/size length does not match input rank"));
        }
        let begin: Vec<usize> = begin_raw.iter().map(|&b| b.max(0) as usize).collect();
        // A size of -1 takes everything from begin to the end of the axis.
        let size: Vec<usize> = size_raw
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                if s < 0 {
                    dims[i].saturating_sub(begin[i])
                } else {
                    s as usize
                }
            })
            .collect();
        let shape = Shape(size.clone());
        let ty = ctx.node_type(input);
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::Slice { begin, size },
            inputs: vec![input],
            ty,
            shape,
            name: None,
        })?)
    }
}

/// Extent of one strided-slice axis after mask resolution.
fn strided_extent(
    d: usize,
    begin: i32,
    end: i32,
    stride: i32,
    begin_masked: bool,
    end_masked: bool,
) -> usize {
    let d = d as i64;
    let stride = stride as i64;
    let norm = |v: i32| -> i64 {
        let v = v as i64;
        if v < 0 {
            v + d
        } else {
            v
        }
    };
    let begin = if begin_masked {
        if stride > 0 {
            0
        } else {
            d - 1
        }
    } else if stride > 0 {
        norm(begin).clamp(0, d)
    } else {
        norm(begin).clamp(0, d - 1)
    };
    let end = if end_masked {
        if stride > 0 {
            d
        } else {
            -1
        }
    } else if stride > 0 {
        norm(end).clamp(0, d)
    } else {
        norm(end).clamp(-1, d - 1)
    };
    let span = if stride > 0 { end - begin } else { begin - end };
    if span <= 0 {
        0
    } else {
        ((span + stride.abs() - 1) / stride.abs()) as usize
    }
}

pub(crate) struct StridedSlice;
impl OperationBuilder for StridedSlice {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        for slot in [1, 2, 3] {
            let operand = ctx.input_operand(slot).map_err(|e| e.to_string())?;
            if !operand.lifetime.is_const() {
                return Err("begin, end, and strides must be constants".into());
            }
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let dims = ctx.graph.shape(input).dims().to_vec();
        let begin: Vec<i32> = ctx.parse(1)?;
        let end: Vec<i32> = ctx.parse(2)?;
        let strides: Vec<i32> = ctx.parse(3)?;
        let begin_mask = ctx.parse::<i32>(4)? as u32;
        let end_mask = ctx.parse::<i32>(5)? as u32;
        let shrink_axis_mask = ctx.parse::<i32>(6)? as u32;

        if begin.len() != dims.len() || end.len() != dims.len() || strides.len() != dims.len() {
            return Err(ctx.reject("begin/end/strides length does not match input rank"));
        }
        if strides.iter().any(|&s| s == 0) {
            return Err(ctx.reject("strides must be non-zero"));
        }

        let mut out = Vec::with_capacity(dims.len());
        for i in 0..dims.len() {
            if shrink_axis_mask & (1 << i) != 0 {
                continue;
            }
            out.push(strided_extent(
                dims[i],
                begin[i],
                end[i],
                strides[i],
                begin_mask & (1 << i) != 0,
                end_mask & (1 << i) != 0,
            ));
        }
        let ty = ctx.node_type(input);
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::StridedSlice {
                begin,
                end,
                strides,
                begin_mask,
                end_mask,
                shrink_axis_mask,
            },
            inputs: vec![input],
            ty,
            shape: Shape(out),
            name: None,
        })?)
    }
}

pub(crate) struct Tile;
impl OperationBuilder for Tile {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let multiples: Vec<i32> = ctx.parse(1)?;
        let dims = ctx.graph.shape(input).dims().to_vec();
        if multiples.len() != dims.len() {
            return Err(ctx.reject("multiples length does not match input rank"));
        }
        let repeats: Vec<usize> = multiples.iter().map(|&m| m.max(0) as usize).collect();
        let shape = Shape(
            dims.iter()
                .zip(&repeats)
                .map(|(&d, &r)| d * r)
                .collect::<Vec<_>>(),
        );
        let ty = ctx.node_type(input);
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::Tile { repeats },
            inputs: vec![input],
            ty,
            shape,
            name: None,
        })?)
    }
}

/// Gathers slices along `axis` (slot 1) by the indices tensor (slot 2).
pub(crate) struct Gather;
impl OperationBuilder for Gather {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let axis = ctx.parse::<i32>(1)?;
        let axis = ctx.resolve_axis(input, axis)?;
        let indices = ctx.input_node(2)?;

        let data_dims = ctx.graph.shape(input).dims().to_vec();
        let index_dims = ctx.graph.shape(indices).dims().to_vec();
        let mut dims = data_dims[..axis].to_vec();
        dims.extend_from_slice(&index_dims);
        dims.extend_from_slice(&data_dims[axis + 1..]);
        let ty = ctx.node_type(input);
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::Gather { axis },
            inputs: vec![input, indices],
            ty,
            shape: Shape(dims),
            name: None,
        })?)
    }
}

/// Parses the `[rank, 2]` paddings tensor into begin/end vectors.
fn parse_paddings(
    ctx: &OpCtx,
    slot: usize,
    rank: usize,
) -> Result<(Vec<usize>, Vec<usize>), TranslateError> {
    let raw: Vec<i32> = ctx.parse(slot)?;
    if raw.len() != rank * 2 {
        return Err(ctx.reject(format!(
            "paddings tensor has {} entries, expected {}",
            raw.len(),
            rank * 2
        )));
    }
    let begin = raw.iter().step_by(2).map(|&p| p.max(0) as usize).collect();
    let end = raw[1..].iter().step_by(2).map(|&p| p.max(0) as usize).collect();
    Ok((begin, end))
}

fn pad_with_value(ctx: &mut OpCtx, value: f32) -> Result<Handle<Node>, TranslateError> {
    let input = ctx.input_node(0)?;
    let dims = ctx.graph.shape(input).dims().to_vec();
    let (pads_begin, pads_end) = parse_paddings(ctx, 1, dims.len())?;
    let shape = Shape(
        dims.iter()
            .enumerate()
            .map(|(i, &d)| d + pads_begin[i] + pads_end[i])
            .collect::<Vec<_>>(),
    );
    let ty = ctx.node_type(input);
    Ok(ctx.graph.add_node(Node {
        kind: NodeKind::Pad {
            pads_begin,
            pads_end,
            mode: PadMode::Constant,
            value,
        },
        inputs: vec![input],
        ty,
        shape,
        name: None,
    })?)
}

pub(crate) struct Pad;
impl OperationBuilder for Pad {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        pad_with_value(ctx, 0.0)
    }
}

/// PAD with an explicit fill value. Quantized tensors carry the value as a
/// raw INT32 in the storage domain.
pub(crate) struct PadV2;
impl OperationBuilder for PadV2 {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let value = if ctx.input_has_type(2, OperandType::Float16) {
            ctx.parse::<half::f16>(2)?.to_f32()
        } else if ctx.input_has_type(2, OperandType::Int32) {
            ctx.parse::<i32>(2)? as f32
        } else {
            ctx.parse::<f32>(2)?
        };
        pad_with_value(ctx, value)
    }
}

fn spatial_block(ctx: &OpCtx, slot: usize) -> Result<[usize; 2], TranslateError> {
    let raw: Vec<i32> = ctx.parse(slot)?;
    if raw.len() != 2 {
        return Err(ctx.reject(format!(
            "block size tensor has {} entries, expected 2",
            raw.len()
        )));
    }
    Ok([raw[0].max(0) as usize, raw[1].max(0) as usize])
}

pub(crate) struct BatchToSpaceNd;
impl OperationBuilder for BatchToSpaceNd {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let block = spatial_block(ctx, 1)?;
        let nchw = ctx.flag_or(2, false)?;
        let mut input = ctx.input_node(0)?;
        if !nchw {
            input = ctx.to_nchw(input)?;
        }
        let d = ctx.graph.shape(input).dims().to_vec();
        if block[0] == 0 || block[1] == 0 || d[0] % (block[0] * block[1]) != 0 {
            return Err(ctx.reject(format!(
                "batch {} does not divide by block {}x{}",
                d[0], block[0], block[1]
            )));
        }
        let shape = Shape(vec![
            d[0] / (block[0] * block[1]),
            d[1],
            d[2] * block[0],
            d[3] * block[1],
        ]);
        let ty = ctx.node_type(input);
        let out = ctx.graph.add_node(Node {
            kind: NodeKind::BatchToSpace {
                block: block.to_vec(),
                crops_begin: vec![0, 0],
                crops_end: vec![0, 0],
            },
            inputs: vec![input],
            ty,
            shape,
            name: None,
        })?;
        if !nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

pub(crate) struct SpaceToBatchNd;
impl OperationBuilder for SpaceToBatchNd {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let block = spatial_block(ctx, 1)?;
        let (pads_begin, pads_end) = parse_paddings(ctx, 2, 2)?;
        let nchw = ctx.flag_or(3, false)?;
        let mut input = ctx.input_node(0)?;
        if !nchw {
            input = ctx.to_nchw(input)?;
        }
        let d = ctx.graph.shape(input).dims().to_vec();
        let padded_h = d[2] + pads_begin[0] + pads_end[0];
        let padded_w = d[3] + pads_begin[1] + pads_end[1];
        if block[0] == 0 || block[1] == 0 || padded_h % block[0] != 0 || padded_w % block[1] != 0 {
            return Err(ctx.reject(format!(
                "padded spatial {padded_h}x{padded_w} does not divide by block {}x{}",
                block[0], block[1]
            )));
        }
        let shape = Shape(vec![
            d[0] * block[0] * block[1],
            d[1],
            padded_h / block[0],
            padded_w / block[1],
        ]);
        let ty = ctx.node_type(input);
        let out = ctx.graph.add_node(Node {
            kind: NodeKind::SpaceToBatch {
                block: block.to_vec(),
                pads_begin,
                pads_end,
            },
            inputs: vec![input],
            ty,
            shape,
            name: None,
        })?;
        if !nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

pub(crate) struct DepthToSpace;
impl OperationBuilder for DepthToSpace {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let block = ctx.parse::<i32>(1)?.max(0) as usize;
        let nchw = ctx.flag_or(2, false)?;
        let mut input = ctx.input_node(0)?;
        if !nchw {
            input = ctx.to_nchw(input)?;
        }
        let d = ctx.graph.shape(input).dims().to_vec();
        if block == 0 || d[1] % (block * block) != 0 {
            return Err(ctx.reject(format!(
                "depth {} does not divide by block {block} squared",
                d[1]
            )));
        }
        let shape = Shape(vec![d[0], d[1] / (block * block), d[2] * block, d[3] * block]);
        let ty = ctx.node_type(input);
        let out = ctx.graph.add_node(Node {
            kind: NodeKind::DepthToSpace { block },
            inputs: vec![input],
            ty,
            shape,
            name: None,
        })?;
        if !nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

pub(crate) struct SpaceToDepth;
impl OperationBuilder for SpaceToDepth {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let block = ctx.parse::<i32>(1)?.max(0) as usize;
        let nchw = ctx.flag_or(2, false)?;
        let mut input = ctx.input_node(0)?;
        if !nchw {
            input = ctx.to_nchw(input)?;
        }
        let d = ctx.graph.shape(input).dims().to_vec();
        if block == 0 || d[2] % block != 0 || d[3] % block != 0 {
            return Err(ctx.reject(format!(
                "spatial {}x{} does not divide by block {block}",
                d[2], d[3]
            )));
        }
        let shape = Shape(vec![d[0], d[1] * block * block, d[2] / block, d[3] / block]);
        let ty = ctx.node_type(input);
        let out = ctx.graph.add_node(Node {
            kind: NodeKind::SpaceToDepth { block },
            inputs: vec![input],
            ty,
            shape,
            name: None,
        })?;
        if !nchw {
            ctx.to_nhwc(out)
        } else {
            Ok(out)
        }
    }
}

/// Shuffles channel groups: reshape the axis into `[groups, size/groups]`,
/// swap the pair, reshape back.
pub(crate) struct ChannelShuffle;
impl OperationBuilder for ChannelShuffle {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let groups = ctx.parse::<i32>(1)?.max(0) as usize;
        let axis = ctx.parse::<i32>(2)?;
        let axis = ctx.resolve_axis(input, axis)?;

        let dims = ctx.graph.shape(input).dims().to_vec();
        if groups == 0 || dims[axis] % groups != 0 {
            return Err(ctx.reject(format!(
                "axis {axis} of size {} does not divide into {groups} groups",
                dims[axis]
            )));
        }

        let mut grouped = dims[..axis].to_vec();
        grouped.push(groups);
        grouped.push(dims[axis] / groups);
        grouped.extend_from_slice(&dims[axis + 1..]);
        let reshaped = ctx.reshape(input, Shape(grouped.clone()))?;

        let mut perm: Vec<usize> = (0..grouped.len()).collect();
        perm.swap(axis, axis + 1);
        let swapped = ctx.transpose_node(reshaped, &perm)?;

        ctx.reshape(swapped, Shape(dims))
    }
}
