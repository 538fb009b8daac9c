//! Operand table entries: types, lifetimes, and constant payloads.

use std::fmt;

/// The element type of an operand.
///
/// Scalar variants describe single values passed as operation parameters;
/// tensor variants describe n-dimensional data.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum OperandType {
    /// 32-bit IEEE float scalar.
    Float32,
    /// 32-bit signed integer scalar.
    Int32,
    /// 32-bit unsigned integer scalar.
    Uint32,
    /// 8-bit boolean scalar (non-zero is true).
    Bool,
    /// 16-bit IEEE float scalar.
    Float16,
    /// Tensor of 32-bit IEEE floats.
    TensorFloat32,
    /// Tensor of 16-bit IEEE floats.
    TensorFloat16,
    /// Tensor of 32-bit signed integers.
    TensorInt32,
    /// Tensor of asymmetric quantized 8-bit values (u8, scale + zero point).
    TensorQuant8Asymm,
    /// Tensor of asymmetric quantized signed 8-bit values.
    TensorQuant8AsymmSigned,
    /// Tensor of symmetric quantized 8-bit values (zero point 0).
    TensorQuant8Symm,
    /// Tensor of symmetric quantized 8-bit values with per-channel scales.
    TensorQuant8SymmPerChannel,
    /// Tensor of symmetric quantized 16-bit values.
    TensorQuant16Symm,
    /// Tensor of asymmetric quantized 16-bit values.
    TensorQuant16Asymm,
    /// Tensor of 8-bit booleans.
    TensorBool8,
}

impl OperandType {
    /// Returns `true` for the tensor (non-scalar) variants.
    pub fn is_tensor(self) -> bool {
        !matches!(
            self,
            Self::Float32 | Self::Int32 | Self::Uint32 | Self::Bool | Self::Float16
        )
    }

    /// Returns `true` for the quantized tensor variants.
    pub fn is_quantized(self) -> bool {
        matches!(
            self,
            Self::TensorQuant8Asymm
                | Self::TensorQuant8AsymmSigned
                | Self::TensorQuant8Symm
                | Self::TensorQuant8SymmPerChannel
                | Self::TensorQuant16Symm
                | Self::TensorQuant16Asymm
        )
    }

    /// Size in bytes of one element of this type.
    pub fn element_size(self) -> usize {
        match self {
            Self::Float32 | Self::Int32 | Self::Uint32 | Self::TensorFloat32
            | Self::TensorInt32 => 4,
            Self::Float16 | Self::TensorFloat16 | Self::TensorQuant16Symm
            | Self::TensorQuant16Asymm => 2,
            Self::Bool
            | Self::TensorBool8
            | Self::TensorQuant8Asymm
            | Self::TensorQuant8AsymmSigned
            | Self::TensorQuant8Symm
            | Self::TensorQuant8SymmPerChannel => 1,
        }
    }
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// How an operand's value is provided over the model's lifetime.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Lifetime {
    /// Declared input of the (sub)graph.
    SubgraphInput,
    /// Declared output of the (sub)graph.
    SubgraphOutput,
    /// Constant whose payload was copied into the model.
    ConstantCopy,
    /// Constant whose payload lives in a shared memory pool; the model
    /// holds the bytes for its whole lifetime either way.
    ConstantReference,
    /// Produced and consumed inside the graph.
    TemporaryVariable,
    /// Omitted optional operand.
    NoValue,
}

impl Lifetime {
    /// Returns `true` if the operand carries a constant payload.
    pub fn is_const(self) -> bool {
        matches!(self, Self::ConstantCopy | Self::ConstantReference)
    }
}

/// Per-channel quantization parameters for
/// [`OperandType::TensorQuant8SymmPerChannel`] operands.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelQuant {
    /// One scale per slice along `channel_dim`.
    pub scales: Vec<f32>,
    /// The dimension the scales index.
    pub channel_dim: u32,
}

/// An entry in the model's flat operand table.
///
/// Immutable once the model is accepted. Constant operands own their backing
/// bytes in `value`.
#[derive(Clone, Debug)]
pub struct Operand {
    /// Element type.
    pub ty: OperandType,
    /// Dimension sizes; empty for scalars and rank-0 tensors.
    pub dimensions: Vec<u32>,
    /// How the value is provided.
    pub lifetime: Lifetime,
    /// Quantization scale (0.0 for non-quantized operands).
    pub scale: f32,
    /// Quantization zero point.
    pub zero_point: i32,
    /// Per-channel quantization, when the type calls for it.
    pub channel_quant: Option<ChannelQuant>,
    /// Constant payload for `ConstantCopy`/`ConstantReference` operands.
    pub value: Option<Vec<u8>>,
}

impl Operand {
    /// A non-constant tensor operand with no quantization.
    pub fn tensor(ty: OperandType, dimensions: Vec<u32>, lifetime: Lifetime) -> Self {
        Self {
            ty,
            dimensions,
            lifetime,
            scale: 0.0,
            zero_point: 0,
            channel_quant: None,
            value: None,
        }
    }

    /// Number of elements implied by the declared dimensions.
    pub fn element_count(&self) -> usize {
        self.dimensions.iter().map(|&d| d as usize).product()
    }

    /// Rank of the operand (0 for scalars).
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_predicate() {
        assert!(OperandType::TensorFloat32.is_tensor());
        assert!(OperandType::TensorBool8.is_tensor());
        assert!(!OperandType::Int32.is_tensor());
        assert!(!OperandType::Float16.is_tensor());
    }

    #[test]
    fn quantized_predicate() {
        assert!(OperandType::TensorQuant8Asymm.is_quantized());
        assert!(OperandType::TensorQuant8SymmPerChannel.is_quantized());
        assert!(!OperandType::TensorFloat32.is_quantized());
    }

    #[test]
    fn element_sizes() {
        assert_eq!(OperandType::TensorFloat32.element_size(), 4);
        assert_eq!(OperandType::TensorFloat16.element_size(), 2);
        assert_eq!(OperandType::TensorQuant8Asymm.element_size(), 1);
    }

    #[test]
    fn const_lifetimes() {
        assert!(Lifetime::ConstantCopy.is_const());
        assert!(Lifetime::ConstantReference.is_const());
        assert!(!Lifetime::TemporaryVariable.is_const());
        assert!(!Lifetime::SubgraphInput.is_const());
    }

    #[test]
    fn element_count_scalar_is_one() {
        let op = Operand::tensor(OperandType::TensorFloat32, vec![], Lifetime::NoValue);
        assert_eq!(op.element_count(), 1);
        assert_eq!(op.rank(), 0);
    }
}
