//! Graph node kinds and their attributes.

use crate::arena::Handle;
use crate::types::{ElementType, Shape};

/// Binary elementwise operators. All broadcast NumPy-style: shapes align at
/// the trailing dimension and size-1 dimensions stretch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Maximum,
    Minimum,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Comparison and logical operators produce boolean outputs.
    pub fn is_predicate(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Greater
                | Self::GreaterEqual
                | Self::Less
                | Self::LessEqual
                | Self::LogicalAnd
                | Self::LogicalOr
        )
    }
}

/// Unary elementwise operators.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum UnaryOp {
    Abs,
    Exp,
    Floor,
    Log,
    Neg,
    Sqrt,
    Sin,
    Relu,
    Sigmoid,
    Tanh,
    LogicalNot,
}

/// Reduction operators over a set of axes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum ReduceOp {
    Mean,
    Sum,
    Min,
    Max,
    Prod,
    All,
    Any,
}

/// Spatial padding resolution for convolution and pooling windows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PadScheme {
    /// Use the explicit pads carried on the node.
    Explicit,
    /// Pad so output size equals `ceil(input / stride)`; extra at the end.
    SameUpper,
    /// No padding.
    Valid,
}

/// Padding fill mode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PadMode {
    /// Fill with a constant value.
    Constant,
    /// Mirror without repeating the edge.
    Reflect,
}

/// Resampling mode for [`NodeKind::Interpolate`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InterpolateMode {
    /// Bilinear interpolation.
    Linear,
    /// Nearest-neighbor sampling.
    Nearest,
}

/// Which output of a top-k selection a node exposes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TopKOutput {
    /// The selected values.
    Values,
    /// The indices of the selected values.
    Indices,
}

/// The operation a graph node performs.
///
/// Attributes live here; data dependencies are the node's ordered input
/// handles. Operation kinds with several logical outputs (split, top-k) are
/// represented as one node per output so that every node has exactly one
/// output tensor.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A graph input.
    Parameter,
    /// A constant tensor; `data` holds the raw little-endian bytes.
    Constant {
        /// Raw element bytes, laid out row-major.
        data: Vec<u8>,
    },
    /// Elementwise binary operation with NumPy broadcasting.
    Binary(BinaryOp),
    /// Elementwise unary operation.
    Unary(UnaryOp),
    /// Clamp every element to `[min, max]`.
    Clamp {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },
    /// Exponential linear unit with the given alpha.
    Elu {
        /// Scale for the negative half.
        alpha: f32,
    },
    /// Parametric ReLU; inputs: data, slope (broadcast).
    Prelu,
    /// Elementwise type conversion to the node's element type.
    Convert,
    /// Permute dimensions by `perm`.
    Transpose {
        /// The axis permutation, one entry per input dimension.
        perm: Vec<usize>,
    },
    /// Reinterpret the input with the node's own shape.
    Reshape,
    /// Concatenate inputs along `axis`.
    Concat {
        /// Concatenation axis (already normalized, non-negative).
        axis: usize,
    },
    /// One slice of an even split; inputs: data.
    Split {
        /// Split axis (normalized).
        axis: usize,
        /// Total number of parts.
        parts: usize,
        /// Which part this node selects.
        index: usize,
    },
    /// Contiguous slice; `begin` and `size` are per-axis.
    Slice {
        /// Starting coordinate per axis.
        begin: Vec<usize>,
        /// Slice extent per axis.
        size: Vec<usize>,
    },
    /// TensorFlow-style strided slice.
    StridedSlice {
        /// Per-axis begin coordinates.
        begin: Vec<i32>,
        /// Per-axis end coordinates.
        end: Vec<i32>,
        /// Per-axis strides.
        strides: Vec<i32>,
        /// Bit i set: ignore `begin[i]`, start from the edge.
        begin_mask: u32,
        /// Bit i set: ignore `end[i]`, run to the edge.
        end_mask: u32,
        /// Bit i set: drop axis i from the output.
        shrink_axis_mask: u32,
    },
    /// Gather slices along `axis` by integer indices; inputs: data, indices.
    Gather {
        /// Gather axis (normalized).
        axis: usize,
    },
    /// Repeat the input `repeats[i]` times along axis i.
    Tile {
        /// Per-axis repeat counts.
        repeats: Vec<usize>,
    },
    /// Pad each axis with `pads_begin`/`pads_end` elements.
    Pad {
        /// Leading pad per axis.
        pads_begin: Vec<usize>,
        /// Trailing pad per axis.
        pads_end: Vec<usize>,
        /// Fill mode.
        mode: PadMode,
        /// Fill value for [`PadMode::Constant`].
        value: f32,
    },
    /// Rearrange spatial blocks into depth (NCHW).
    SpaceToDepth {
        /// Block size.
        block: usize,
    },
    /// Rearrange depth into spatial blocks (NCHW).
    DepthToSpace {
        /// Block size.
        block: usize,
    },
    /// Move batch elements into spatial dims (NCHW).
    BatchToSpace {
        /// Per-spatial-axis block sizes.
        block: Vec<usize>,
        /// Leading crop per spatial axis.
        crops_begin: Vec<usize>,
        /// Trailing crop per spatial axis.
        crops_end: Vec<usize>,
    },
    /// Move spatial blocks into the batch dim (NCHW).
    SpaceToBatch {
        /// Per-spatial-axis block sizes.
        block: Vec<usize>,
        /// Leading pad per spatial axis.
        pads_begin: Vec<usize>,
        /// Trailing pad per spatial axis.
        pads_end: Vec<usize>,
    },
    /// 2-D convolution in NCHW with OIHW filters; inputs: data, filter.
    /// `groups > 1` covers grouped and depthwise forms.
    Convolution {
        /// Spatial strides (h, w).
        strides: [usize; 2],
        /// Spatial dilations (h, w).
        dilations: [usize; 2],
        /// Explicit leading pads (h, w).
        pads_begin: [usize; 2],
        /// Explicit trailing pads (h, w).
        pads_end: [usize; 2],
        /// How pads are resolved.
        scheme: PadScheme,
        /// Feature-map groups.
        groups: usize,
    },
    /// Transposed 2-D convolution (deconvolution); inputs: data, filter.
    ConvolutionBackprop {
        /// Spatial strides (h, w).
        strides: [usize; 2],
        /// Explicit leading pads (h, w).
        pads_begin: [usize; 2],
        /// Explicit trailing pads (h, w).
        pads_end: [usize; 2],
        /// How pads are resolved.
        scheme: PadScheme,
    },
    /// Matrix product of the two inputs.
    MatMul {
        /// Transpose the first input's trailing two axes.
        transpose_a: bool,
        /// Transpose the second input's trailing two axes.
        transpose_b: bool,
    },
    /// 2-D average pooling in NCHW.
    AvgPool {
        /// Window size (h, w).
        kernel: [usize; 2],
        /// Spatial strides (h, w).
        strides: [usize; 2],
        /// Explicit leading pads (h, w).
        pads_begin: [usize; 2],
        /// Explicit trailing pads (h, w).
        pads_end: [usize; 2],
        /// How pads are resolved.
        scheme: PadScheme,
    },
    /// 2-D max pooling in NCHW.
    MaxPool {
        /// Window size (h, w).
        kernel: [usize; 2],
        /// Spatial strides (h, w).
        strides: [usize; 2],
        /// Explicit leading pads (h, w).
        pads_begin: [usize; 2],
        /// Explicit trailing pads (h, w).
        pads_end: [usize; 2],
        /// How pads are resolved.
        scheme: PadScheme,
    },
    /// Reduce over `axes`.
    Reduce {
        /// The reduction operator.
        op: ReduceOp,
        /// Axes to reduce (normalized, ascending).
        axes: Vec<usize>,
        /// Keep reduced axes as size 1.
        keep_dims: bool,
    },
    /// Mean-variance normalization over `axes`. The epsilon is added inside
    /// the square root, so a zero-variance slice divides by `sqrt(eps)`.
    Mvn {
        /// Axes to normalize over (normalized).
        axes: Vec<usize>,
        /// Variance floor.
        eps: f32,
    },
    /// Local response normalization across channels.
    Lrn {
        /// Scale factor.
        alpha: f32,
        /// Exponent.
        beta: f32,
        /// Additive bias.
        bias: f32,
        /// Window size.
        size: usize,
    },
    /// One output of a top-k selection along `axis`; inputs: data.
    TopK {
        /// Number of entries to keep.
        k: usize,
        /// Selection axis (normalized).
        axis: usize,
        /// Largest (true) or smallest (false) entries.
        largest: bool,
        /// Which output this node exposes.
        output: TopKOutput,
    },
    /// Elementwise choice; inputs: condition, then, else.
    Select,
    /// Spatial resampling of a 4-D NCHW tensor.
    Interpolate {
        /// Sampling mode.
        mode: InterpolateMode,
        /// Output spatial size (h, w).
        sizes: [usize; 2],
        /// Align corner sample points.
        align_corners: bool,
        /// Half-pixel coordinate mapping.
        half_pixel: bool,
    },
}

/// A node in the target computation graph.
///
/// Produced by exactly one builder invocation. The output element type and
/// shape are fixed at construction; downstream builders consult them for
/// shape inference.
#[derive(Clone, Debug)]
pub struct Node {
    /// What the node computes.
    pub kind: NodeKind,
    /// Ordered data dependencies.
    pub inputs: Vec<Handle<Node>>,
    /// Output element type.
    pub ty: ElementType,
    /// Output shape.
    pub shape: Shape,
    /// Optional debug name.
    pub name: Option<String>,
}
