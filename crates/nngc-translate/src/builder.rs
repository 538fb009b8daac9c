//! The operation-builder capability trait, its per-operation context, and
//! the opcode → builder factory.

use nngc_graph::{
    BinaryOp, ElementType, Graph, Handle, Node, NodeKind, Shape, UnaryOp,
};
use nngc_model::{Model, Operand, OperandType, OperandValue, OperationCode};

use crate::error::TranslateError;
use crate::ops;
use crate::plugin::PluginTarget;
use crate::primitives::{
    broadcast_shapes, element_type_of, normalize_axis, permute_shape, NCHW_TO_NHWC, NHWC_TO_NCHW,
};
use crate::registry::NodeRegistry;

/// Everything a builder needs to translate one operation: the operation's
/// index, the model metadata, the node registry, the graph under
/// construction, and the active plugin. Exclusively owned by the single
/// translation pass.
pub(crate) struct OpCtx<'c, 'm> {
    pub index: usize,
    pub model: &'m Model,
    pub plugin: PluginTarget,
    pub registry: &'c mut NodeRegistry,
    pub graph: &'c mut Graph,
}

/// One NNAPI operator kind's translation capability.
///
/// Implementations are stateless unit structs; the operation binding lives
/// in the [`OpCtx`] handed to every call.
pub(crate) trait OperationBuilder: Sync {
    /// Pre-checks operand ranks/types/constantness. `Err(reason)` fails the
    /// translation with the operator's identity attached. Default: valid.
    fn validate(&self, _ctx: &OpCtx) -> Result<(), String> {
        Ok(())
    }

    /// Builds the node(s) expressing this operator's semantics and returns
    /// the node carrying its primary output.
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError>;

    /// Plugin-specific lowering override; the default is the portable form.
    fn create_node_for_plugin(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        self.create_node(ctx)
    }

    /// Wires the operator into the graph. The default registers the created
    /// node at output slot 0, re-quantizing when the output operand is a
    /// quantized type. Operators with several outputs override this.
    fn connect(&self, ctx: &mut OpCtx) -> Result<(), TranslateError> {
        let node = self.create_node_for_plugin(ctx)?;
        let node = ctx.requantize_for_output(node, 0)?;
        ctx.record_output(0, node)
    }
}

impl<'m> OpCtx<'_, 'm> {
    pub fn code(&self) -> OperationCode {
        // The assembler only constructs a ctx for in-range operations.
        self.model
            .operation_code(self.index)
            .unwrap_or(OperationCode::Add)
    }

    /// A validation failure carrying this operation's identity.
    pub fn reject(&self, reason: impl Into<String>) -> TranslateError {
        TranslateError::ValidationRejected {
            code: self.code(),
            index: self.index,
            reason: reason.into(),
        }
    }

    // -- model metadata ----------------------------------------------------

    pub fn input_count(&self) -> usize {
        self.model.operation_input_count(self.index).unwrap_or(0)
    }

    pub fn input_index(&self, slot: usize) -> Result<u32, TranslateError> {
        Ok(self.model.operation_input(self.index, slot)?)
    }

    pub fn output_index(&self, slot: usize) -> Result<u32, TranslateError> {
        Ok(self.model.operation_output(self.index, slot)?)
    }

    pub fn output_count(&self) -> usize {
        self.model.operation_output_count(self.index).unwrap_or(0)
    }

    pub fn input_operand(&self, slot: usize) -> Result<&'m Operand, TranslateError> {
        Ok(self.model.operand(self.input_index(slot)?)?)
    }

    pub fn output_operand(&self, slot: usize) -> Result<&'m Operand, TranslateError> {
        Ok(self.model.operand(self.output_index(slot)?)?)
    }

    /// Typed parameter extraction from a constant input operand.
    pub fn parse<T: OperandValue>(&self, slot: usize) -> Result<T, TranslateError> {
        Ok(self.model.operation_input_value(self.index, slot)?)
    }

    /// Typed extraction with a default when the optional slot is absent.
    pub fn parse_or<T: OperandValue>(&self, slot: usize, default: T) -> Result<T, TranslateError> {
        if slot < self.input_count() {
            self.parse(slot)
        } else {
            Ok(default)
        }
    }

    pub fn input_has_type(&self, slot: usize, ty: OperandType) -> bool {
        self.model
            .input_has_type(self.index, slot, ty)
            .unwrap_or(false)
    }

    pub fn input_dims(&self, slot: usize) -> Result<Vec<u32>, TranslateError> {
        Ok(self.model.input_dimensions(self.index, slot)?.to_vec())
    }

    pub fn input_rank(&self, slot: usize) -> Result<usize, TranslateError> {
        Ok(self.input_operand(slot)?.rank())
    }

    /// A boolean parameter that older model versions declare as INT32
    /// (strictly positive means true) and newer ones as BOOL.
    pub fn flag(&self, slot: usize) -> Result<bool, TranslateError> {
        if self.input_has_type(slot, OperandType::Bool) {
            self.parse::<bool>(slot)
        } else {
            Ok(self.parse::<i32>(slot)? > 0)
        }
    }

    /// [`flag`](Self::flag) for optional trailing parameters.
    pub fn flag_or(&self, slot: usize, default: bool) -> Result<bool, TranslateError> {
        if slot < self.input_count() {
            self.flag(slot)
        } else {
            Ok(default)
        }
    }

    /// The "keep reduced dimensions" parameter of the reduction operators.
    pub fn keep_dims(&self, slot: usize) -> Result<bool, TranslateError> {
        self.flag(slot)
    }

    // -- registry ----------------------------------------------------------

    /// Resolves an input slot to its producing node, raw storage type.
    pub fn input_node(&mut self, slot: usize) -> Result<Handle<Node>, TranslateError> {
        let operand = self.input_index(slot)?;
        self.registry.resolve_input(operand, self.model, self.graph)
    }

    /// Resolves an input slot and dequantizes quantized storage to `f32`.
    pub fn float_input(&mut self, slot: usize) -> Result<Handle<Node>, TranslateError> {
        let node = self.input_node(slot)?;
        let operand = self.input_operand(slot)?;
        if operand.ty.is_quantized() {
            let (scale, zero_point) = (operand.scale, operand.zero_point);
            self.dequantize(node, scale, zero_point)
        } else {
            Ok(node)
        }
    }

    /// Registers `node` as the producer of output slot `slot`.
    pub fn record_output(&mut self, slot: usize, node: Handle<Node>) -> Result<(), TranslateError> {
        let operand = self.output_index(slot)?;
        self.registry.record_output(operand, node);
        Ok(())
    }

    // -- node construction -------------------------------------------------

    pub fn node_shape(&self, node: Handle<Node>) -> Shape {
        self.graph.shape(node).clone()
    }

    pub fn node_type(&self, node: Handle<Node>) -> ElementType {
        self.graph.element_type(node)
    }

    /// Broadcast-aware binary elementwise node. Comparison and logical
    /// operators produce `Bool`; everything else keeps the lhs type.
    pub fn binary(
        &mut self,
        op: BinaryOp,
        lhs: Handle<Node>,
        rhs: Handle<Node>,
    ) -> Result<Handle<Node>, TranslateError> {
        let shape = broadcast_shapes(self.graph.shape(lhs), self.graph.shape(rhs))?;
        let ty = if op.is_predicate() {
            ElementType::Bool
        } else {
            self.graph.element_type(lhs)
        };
        Ok(self.graph.add_node(Node {
            kind: NodeKind::Binary(op),
            inputs: vec![lhs, rhs],
            ty,
            shape,
            name: None,
        })?)
    }

    pub fn unary(&mut self, op: UnaryOp, input: Handle<Node>) -> Result<Handle<Node>, TranslateError> {
        let ty = match op {
            UnaryOp::LogicalNot => ElementType::Bool,
            _ => self.graph.element_type(input),
        };
        Ok(self.graph.add_node(Node {
            kind: NodeKind::Unary(op),
            inputs: vec![input],
            ty,
            shape: self.node_shape(input),
            name: None,
        })?)
    }

    pub fn clamp(
        &mut self,
        input: Handle<Node>,
        min: f32,
        max: f32,
    ) -> Result<Handle<Node>, TranslateError> {
        Ok(self.graph.add_node(Node {
            kind: NodeKind::Clamp { min, max },
            inputs: vec![input],
            ty: self.graph.element_type(input),
            shape: self.node_shape(input),
            name: None,
        })?)
    }

    pub fn convert(
        &mut self,
        input: Handle<Node>,
        to: ElementType,
    ) -> Result<Handle<Node>, TranslateError> {
        if self.graph.element_type(input) == to {
            return Ok(input);
        }
        Ok(self.graph.add_node(Node {
            kind: NodeKind::Convert,
            inputs: vec![input],
            ty: to,
            shape: self.node_shape(input),
            name: None,
        })?)
    }

    pub fn const_f32(&mut self, value: f32) -> Handle<Node> {
        self.graph.add_constant(
            ElementType::F32,
            Shape::scalar(),
            value.to_le_bytes().to_vec(),
        )
    }

    pub fn const_f32_vec(&mut self, values: &[f32], shape: Shape) -> Handle<Node> {
        let data = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.graph.add_constant(ElementType::F32, shape, data)
    }

    pub fn reshape(
        &mut self,
        input: Handle<Node>,
        shape: Shape,
    ) -> Result<Handle<Node>, TranslateError> {
        Ok(self.graph.add_node(Node {
            kind: NodeKind::Reshape,
            inputs: vec![input],
            ty: self.graph.element_type(input),
            shape,
            name: None,
        })?)
    }

    pub fn transpose_node(
        &mut self,
        input: Handle<Node>,
        perm: &[usize],
    ) -> Result<Handle<Node>, TranslateError> {
        let shape = permute_shape(self.graph.shape(input), perm)?;
        Ok(self.graph.add_node(Node {
            kind: NodeKind::Transpose {
                perm: perm.to_vec(),
            },
            inputs: vec![input],
            ty: self.graph.element_type(input),
            shape,
            name: None,
        })?)
    }

    /// NHWC → NCHW legalization transpose.
    pub fn to_nchw(&mut self, input: Handle<Node>) -> Result<Handle<Node>, TranslateError> {
        self.transpose_node(input, &NHWC_TO_NCHW)
    }

    /// NCHW → NHWC restoring transpose.
    pub fn to_nhwc(&mut self, input: Handle<Node>) -> Result<Handle<Node>, TranslateError> {
        self.transpose_node(input, &NCHW_TO_NHWC)
    }

    /// Normalizes a possibly-negative axis against a node's rank.
    pub fn resolve_axis(&self, node: Handle<Node>, axis: i32) -> Result<usize, TranslateError> {
        Ok(normalize_axis(axis, self.graph.shape(node).rank())?)
    }

    // -- numeric policies --------------------------------------------------

    /// Applies a fused activation code (NONE/RELU/RELU1/RELU6) to a raw
    /// arithmetic result. NONE is the identity: no node is emitted.
    pub fn apply_activation(
        &mut self,
        input: Handle<Node>,
        activation: i32,
    ) -> Result<Handle<Node>, TranslateError> {
        match activation {
            0 => Ok(input),
            1 => self.unary(UnaryOp::Relu, input),
            2 => self.clamp(input, -1.0, 1.0),
            3 => self.clamp(input, 0.0, 6.0),
            other => {
                log::warn!(
                    "operation {}: unknown fused activation {other}, passing through",
                    self.index
                );
                Ok(input)
            }
        }
    }

    /// `real = scale * (stored - zero_point)`.
    pub fn dequantize(
        &mut self,
        node: Handle<Node>,
        scale: f32,
        zero_point: i32,
    ) -> Result<Handle<Node>, TranslateError> {
        let mut out = self.convert(node, ElementType::F32)?;
        if zero_point != 0 {
            let zp = self.const_f32(zero_point as f32);
            out = self.binary(BinaryOp::Sub, out, zp)?;
        }
        let scale = self.const_f32(scale);
        self.binary(BinaryOp::Mul, out, scale)
    }

    /// `stored = clamp(real / scale + zero_point)` in the operand's storage
    /// type. No-op when the output operand is not quantized or the node
    /// already carries the storage type.
    pub fn requantize_for_output(
        &mut self,
        node: Handle<Node>,
        slot: usize,
    ) -> Result<Handle<Node>, TranslateError> {
        let operand = self.output_operand(slot)?;
        if !operand.ty.is_quantized() {
            return Ok(node);
        }
        let storage = element_type_of(operand.ty);
        if self.graph.element_type(node) == storage {
            return Ok(node);
        }
        let (scale, zero_point) = (operand.scale, operand.zero_point);
        let (lo, hi) = storage_range(storage);
        let scale = self.const_f32(scale);
        let mut out = self.binary(BinaryOp::Div, node, scale)?;
        if zero_point != 0 {
            let zp = self.const_f32(zero_point as f32);
            out = self.binary(BinaryOp::Add, out, zp)?;
        }
        let out = self.clamp(out, lo, hi)?;
        self.convert(out, storage)
    }
}

/// Representable range of a quantized storage type.
fn storage_range(ty: ElementType) -> (f32, f32) {
    match ty {
        ElementType::U8 => (0.0, 255.0),
        ElementType::I8 => (-128.0, 127.0),
        ElementType::U16 => (0.0, 65535.0),
        ElementType::I16 => (-32768.0, 32767.0),
        _ => (f32::MIN, f32::MAX),
    }
}

/// Selects the builder for an operator kind.
///
/// Returns `None` for kinds without a registered builder; the assembler
/// turns that into [`TranslateError::UnsupportedOperation`], the single
/// place "unsupported operator" is detected.
pub(crate) fn builder_for(code: OperationCode) -> Option<&'static dyn OperationBuilder> {
    use OperationCode as Op;
    Some(match code {
        Op::Add => &ops::elementwise::Add,
        Op::Sub => &ops::elementwise::Sub,
        Op::Mul => &ops::elementwise::Mul,
        Op::Div => &ops::elementwise::Div,
        Op::Maximum => &ops::elementwise::Maximum,
        Op::Minimum => &ops::elementwise::Minimum,
        Op::Pow => &ops::elementwise::Pow,
        Op::Prelu => &ops::elementwise::Prelu,
        Op::Equal => &ops::compare::Equal,
        Op::NotEqual => &ops::compare::NotEqual,
        Op::Greater => &ops::compare::Greater,
        Op::GreaterEqual => &ops::compare::GreaterEqual,
        Op::Less => &ops::compare::Less,
        Op::LessEqual => &ops::compare::LessEqual,
        Op::LogicalAnd => &ops::compare::LogicalAnd,
        Op::LogicalOr => &ops::compare::LogicalOr,
        Op::LogicalNot => &ops::compare::LogicalNot,
        Op::Select => &ops::compare::Select,
        Op::Abs => &ops::unary::Abs,
        Op::Exp => &ops::unary::Exp,
        Op::Floor => &ops::unary::Floor,
        Op::Log => &ops::unary::Log,
        Op::Neg => &ops::unary::Neg,
        Op::Rsqrt => &ops::unary::Rsqrt,
        Op::Sin => &ops::unary::Sin,
        Op::Sqrt => &ops::unary::Sqrt,
        Op::Cast => &ops::unary::Cast,
        Op::Relu => &ops::unary::Relu,
        Op::Relu1 => &ops::unary::Relu1,
        Op::Relu6 => &ops::unary::Relu6,
        Op::Logistic => &ops::unary::Logistic,
        Op::Tanh => &ops::unary::Tanh,
        Op::HardSwish => &ops::unary::HardSwish,
        Op::Elu => &ops::unary::Elu,
        Op::Softmax => &ops::softmax::Softmax,
        Op::LogSoftmax => &ops::softmax::LogSoftmax,
        Op::Mean => &ops::reduce::Mean,
        Op::ReduceAll => &ops::reduce::ReduceAll,
        Op::ReduceAny => &ops::reduce::ReduceAny,
        Op::ReduceMax => &ops::reduce::ReduceMax,
        Op::ReduceMin => &ops::reduce::ReduceMin,
        Op::ReduceProd => &ops::reduce::ReduceProd,
        Op::ReduceSum => &ops::reduce::ReduceSum,
        Op::ArgMax => &ops::reduce::ArgMax,
        Op::ArgMin => &ops::reduce::ArgMin,
        Op::AveragePool2d => &ops::pool::AveragePool2d,
        Op::L2Pool2d => &ops::pool::L2Pool2d,
        Op::MaxPool2d => &ops::pool::MaxPool2d,
        Op::Conv2d => &ops::conv::Conv2d,
        Op::DepthwiseConv2d => &ops::conv::DepthwiseConv2d,
        Op::GroupedConv2d => &ops::conv::GroupedConv2d,
        Op::TransposeConv2d => &ops::conv::TransposeConv2d,
        Op::FullyConnected => &ops::conv::FullyConnected,
        Op::Reshape => &ops::shape::Reshape,
        Op::Squeeze => &ops::shape::Squeeze,
        Op::ExpandDims => &ops::shape::ExpandDims,
        Op::Transpose => &ops::shape::Transpose,
        Op::Concatenation => &ops::shape::Concatenation,
        Op::Split => &ops::shape::Split,
        Op::Slice => &ops::shape::Slice,
        Op::StridedSlice => &ops::shape::StridedSlice,
        Op::Tile => &ops::shape::Tile,
        Op::Gather => &ops::shape::Gather,
        Op::Pad => &ops::shape::Pad,
        Op::PadV2 => &ops::shape::PadV2,
        Op::BatchToSpaceNd => &ops::shape::BatchToSpaceNd,
        Op::SpaceToBatchNd => &ops::shape::SpaceToBatchNd,
        Op::DepthToSpace => &ops::shape::DepthToSpace,
        Op::SpaceToDepth => &ops::shape::SpaceToDepth,
        Op::ChannelShuffle => &ops::shape::ChannelShuffle,
        Op::ResizeBilinear => &ops::resize::ResizeBilinear,
        Op::ResizeNearestNeighbor => &ops::resize::ResizeNearestNeighbor,
        Op::InstanceNormalization => &ops::normalization::InstanceNormalization,
        Op::L2Normalization => &ops::normalization::L2Normalization,
        Op::LocalResponseNormalization => &ops::normalization::LocalResponseNormalization,
        Op::Quantize => &ops::quantize::Quantize,
        Op::Dequantize => &ops::quantize::Dequantize,
        Op::TopkV2 => &ops::topk::TopkV2,
        Op::Rnn => &ops::rnn::Rnn,
        Op::UnidirectionalSequenceRnn => &ops::rnn::UnidirectionalSequenceRnn,
        Op::AxisAlignedBboxTransform
        | Op::BidirectionalSequenceLstm
        | Op::BidirectionalSequenceRnn
        | Op::BoxWithNmsLimit
        | Op::DetectionPostprocessing
        | Op::EmbeddingLookup
        | Op::Fill
        | Op::GenerateProposals
        | Op::HashtableLookup
        | Op::HeatmapMaxKeypoint
        | Op::LshProjection
        | Op::Lstm
        | Op::Quantized16BitLstm
        | Op::RandomMultinomial
        | Op::Rank
        | Op::RoiAlign
        | Op::RoiPooling
        | Op::Svdf
        | Op::UnidirectionalSequenceLstm => return None,
    })
}
