//! Shared translation helpers: type mapping, broadcasting, layout
//! permutations, and window shape arithmetic.

use nngc_graph::{ElementType, GraphError, PadScheme, Shape};
use nngc_model::OperandType;

/// Maps a model operand type to the graph element type its raw payload
/// carries. Quantized operands map to their storage integer type; the
/// dequantize helper converts them to `f32` at use sites.
pub fn element_type_of(ty: OperandType) -> ElementType {
    match ty {
        OperandType::Float32 | OperandType::TensorFloat32 => ElementType::F32,
        OperandType::Float16 | OperandType::TensorFloat16 => ElementType::F16,
        OperandType::Int32 | OperandType::TensorInt32 => ElementType::I32,
        OperandType::Uint32 => ElementType::I32,
        OperandType::Bool | OperandType::TensorBool8 => ElementType::Bool,
        OperandType::TensorQuant8Asymm => ElementType::U8,
        OperandType::TensorQuant8AsymmSigned
        | OperandType::TensorQuant8Symm
        | OperandType::TensorQuant8SymmPerChannel => ElementType::I8,
        OperandType::TensorQuant16Symm => ElementType::I16,
        OperandType::TensorQuant16Asymm => ElementType::U16,
    }
}

/// NumPy-style broadcast of two shapes: align at the trailing dimension,
/// size-1 dimensions stretch.
pub fn broadcast_shapes(lhs: &Shape, rhs: &Shape) -> Result<Shape, GraphError> {
    let rank = lhs.rank().max(rhs.rank());
    let mut dims = vec![0usize; rank];
    for i in 0..rank {
        let l = if i < lhs.rank() {
            lhs.dims()[lhs.rank() - 1 - i]
        } else {
            1
        };
        let r = if i < rhs.rank() {
            rhs.dims()[rhs.rank() - 1 - i]
        } else {
            1
        };
        dims[rank - 1 - i] = if l == r || r == 1 {
            l
        } else if l == 1 {
            r
        } else {
            return Err(GraphError::BroadcastMismatch {
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            });
        };
    }
    Ok(Shape(dims))
}

/// Normalizes a possibly-negative axis against a rank (Python indexing).
pub fn normalize_axis(axis: i32, rank: usize) -> Result<usize, GraphError> {
    let resolved = if axis < 0 { axis + rank as i32 } else { axis };
    if resolved < 0 || resolved as usize >= rank {
        return Err(GraphError::AxisOutOfRange { axis, rank });
    }
    Ok(resolved as usize)
}

/// The NHWC → NCHW axis permutation.
pub const NHWC_TO_NCHW: [usize; 4] = [0, 3, 1, 2];
/// The NCHW → NHWC axis permutation.
pub const NCHW_TO_NHWC: [usize; 4] = [0, 2, 3, 1];
/// NNAPI filter layout (OHWI) → convolution filter layout (OIHW).
pub const OHWI_TO_OIHW: [usize; 4] = [0, 3, 1, 2];
/// Depthwise filter layout (1HWO) → grouped filter layout (O1HW).
pub const IHWO_TO_OIHW: [usize; 4] = [3, 0, 1, 2];

/// Applies a permutation to a shape.
pub fn permute_shape(shape: &Shape, perm: &[usize]) -> Result<Shape, GraphError> {
    if shape.rank() != perm.len() {
        return Err(GraphError::RankMismatch {
            expected: perm.len(),
            found: shape.clone(),
        });
    }
    Ok(Shape(perm.iter().map(|&p| shape.dims()[p]).collect()))
}

/// Output spatial size of a convolution/pooling window.
pub fn window_output_dim(
    in_size: usize,
    filter: usize,
    stride: usize,
    dilation: usize,
    pads: (usize, usize),
    scheme: PadScheme,
) -> usize {
    let dilated = dilation * (filter - 1) + 1;
    match scheme {
        PadScheme::SameUpper => in_size.div_ceil(stride),
        PadScheme::Valid => (in_size.saturating_sub(dilated)) / stride + 1,
        PadScheme::Explicit => (in_size + pads.0 + pads.1 - dilated) / stride + 1,
    }
}

/// Output shape of a reduction.
pub fn reduce_shape(input: &Shape, axes: &[usize], keep_dims: bool) -> Shape {
    let mut dims = Vec::with_capacity(input.rank());
    for (i, &d) in input.dims().iter().enumerate() {
        if axes.contains(&i) {
            if keep_dims {
                dims.push(1);
            }
        } else {
            dims.push(d);
        }
    }
    Shape(dims)
}

/// Resolves a reshape target containing at most one `-1` wildcard.
pub fn resolve_reshape(input: &Shape, spec: &[i32]) -> Shape {
    let known: usize = spec
        .iter()
        .filter(|&&d| d > 0)
        .map(|&d| d as usize)
        .product();
    let dims = spec
        .iter()
        .map(|&d| {
            if d == -1 {
                input.element_count() / known.max(1)
            } else {
                d as usize
            }
        })
        .collect();
    Shape(dims)
}
