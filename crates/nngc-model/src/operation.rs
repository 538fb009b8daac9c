//! Operation table entries and the operator enumeration.

use std::fmt;

/// The operator kind of an [`Operation`].
///
/// This is a closed enumeration so that dispatch sites can match
/// exhaustively; kinds without a registered builder are reported as
/// unsupported at translation time rather than ignored.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum OperationCode {
    Abs,
    Add,
    ArgMax,
    ArgMin,
    AveragePool2d,
    AxisAlignedBboxTransform,
    BatchToSpaceNd,
    BidirectionalSequenceLstm,
    BidirectionalSequenceRnn,
    BoxWithNmsLimit,
    Cast,
    ChannelShuffle,
    Concatenation,
    Conv2d,
    DepthToSpace,
    DepthwiseConv2d,
    Dequantize,
    DetectionPostprocessing,
    Div,
    Elu,
    EmbeddingLookup,
    Equal,
    Exp,
    ExpandDims,
    Fill,
    Floor,
    FullyConnected,
    Gather,
    GenerateProposals,
    Greater,
    GreaterEqual,
    GroupedConv2d,
    HardSwish,
    HashtableLookup,
    HeatmapMaxKeypoint,
    InstanceNormalization,
    L2Normalization,
    L2Pool2d,
    Less,
    LessEqual,
    LocalResponseNormalization,
    Log,
    LogSoftmax,
    LogicalAnd,
    LogicalNot,
    LogicalOr,
    Logistic,
    LshProjection,
    Lstm,
    MaxPool2d,
    Maximum,
    Mean,
    Minimum,
    Mul,
    Neg,
    NotEqual,
    Pad,
    PadV2,
    Pow,
    Prelu,
    Quantize,
    Quantized16BitLstm,
    RandomMultinomial,
    Rank,
    ReduceAll,
    ReduceAny,
    ReduceMax,
    ReduceMin,
    ReduceProd,
    ReduceSum,
    Relu,
    Relu1,
    Relu6,
    Reshape,
    ResizeBilinear,
    ResizeNearestNeighbor,
    Rnn,
    RoiAlign,
    RoiPooling,
    Rsqrt,
    Select,
    Sin,
    Slice,
    Softmax,
    SpaceToBatchNd,
    SpaceToDepth,
    Split,
    Sqrt,
    Squeeze,
    StridedSlice,
    Sub,
    Svdf,
    Tanh,
    Tile,
    TopkV2,
    Transpose,
    TransposeConv2d,
    UnidirectionalSequenceLstm,
    UnidirectionalSequenceRnn,
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// An entry in the model's flat operation table.
///
/// Inputs and outputs are ordered operand indices into the operand table.
/// Immutable.
#[derive(Clone, Debug)]
pub struct Operation {
    /// The operator kind.
    pub code: OperationCode,
    /// Ordered input operand indices.
    pub inputs: Vec<u32>,
    /// Ordered output operand indices.
    pub outputs: Vec<u32>,
}

impl Operation {
    /// Creates an operation entry.
    pub fn new(code: OperationCode, inputs: Vec<u32>, outputs: Vec<u32>) -> Self {
        Self {
            code,
            inputs,
            outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_debug() {
        assert_eq!(OperationCode::Conv2d.to_string(), "Conv2d");
        assert_eq!(OperationCode::ReduceSum.to_string(), "ReduceSum");
    }

    #[test]
    fn operation_new() {
        let op = Operation::new(OperationCode::Add, vec![0, 1, 2], vec![3]);
        assert_eq!(op.code, OperationCode::Add);
        assert_eq!(op.inputs.len(), 3);
        assert_eq!(op.outputs, vec![3]);
    }
}
