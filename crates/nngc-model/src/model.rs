//! The model object and its read-only metadata accessor surface.

use half::f16;

use crate::error::ModelError;
use crate::operand::{Lifetime, Operand, OperandType};
use crate::operation::{Operation, OperationCode};

/// An immutable, parsed NNAPI model.
///
/// A shared reference is the read-only metadata view used throughout
/// translation: accessor methods never mutate and fail with a [`ModelError`]
/// on out-of-range indices or mismatched typed extraction.
#[derive(Clone, Debug)]
pub struct Model {
    operands: Vec<Operand>,
    operations: Vec<Operation>,
    inputs: Vec<u32>,
    outputs: Vec<u32>,
}

impl Model {
    /// Validates index references and constant payload sizes, then accepts
    /// the tables.
    pub fn new(
        operands: Vec<Operand>,
        operations: Vec<Operation>,
        inputs: Vec<u32>,
        outputs: Vec<u32>,
    ) -> Result<Self, ModelError> {
        let size = operands.len();
        let check = |index: u32| -> Result<(), ModelError> {
            if (index as usize) < size {
                Ok(())
            } else {
                Err(ModelError::BadOperandReference { index, size })
            }
        };
        for operation in &operations {
            for &i in operation.inputs.iter().chain(operation.outputs.iter()) {
                check(i)?;
            }
        }
        for &i in inputs.iter().chain(outputs.iter()) {
            check(i)?;
        }
        for (index, operand) in operands.iter().enumerate() {
            if let Some(value) = &operand.value {
                let expected = operand.element_count() * operand.ty.element_size();
                if value.len() != expected {
                    return Err(ModelError::PayloadSizeMismatch {
                        operand: index as u32,
                        expected,
                        actual: value.len(),
                    });
                }
            }
        }
        Ok(Self {
            operands,
            operations,
            inputs,
            outputs,
        })
    }

    /// Start assembling a model programmatically.
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Number of entries in the operand table.
    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }

    /// The operation table, in declared order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Declared model input operand indices, in order.
    pub fn input_indexes(&self) -> &[u32] {
        &self.inputs
    }

    /// Declared model output operand indices, in order.
    pub fn output_indexes(&self) -> &[u32] {
        &self.outputs
    }

    /// Looks up an operand by index.
    pub fn operand(&self, index: u32) -> Result<&Operand, ModelError> {
        self.operands
            .get(index as usize)
            .ok_or(ModelError::OperandOutOfRange {
                index: index as usize,
                size: self.operands.len(),
            })
    }

    /// Looks up an operation by index.
    pub fn operation(&self, index: usize) -> Result<&Operation, ModelError> {
        self.operations
            .get(index)
            .ok_or(ModelError::OperationOutOfRange {
                index,
                size: self.operations.len(),
            })
    }

    /// The operator kind of an operation.
    pub fn operation_code(&self, index: usize) -> Result<OperationCode, ModelError> {
        Ok(self.operation(index)?.code)
    }

    /// Resolves an operation's input slot to its operand index.
    pub fn operation_input(&self, operation: usize, slot: usize) -> Result<u32, ModelError> {
        let op = self.operation(operation)?;
        op.inputs
            .get(slot)
            .copied()
            .ok_or(ModelError::SlotOutOfRange {
                operation,
                kind: "input",
                slot,
                len: op.inputs.len(),
            })
    }

    /// Resolves an operation's output slot to its operand index.
    pub fn operation_output(&self, operation: usize, slot: usize) -> Result<u32, ModelError> {
        let op = self.operation(operation)?;
        op.outputs
            .get(slot)
            .copied()
            .ok_or(ModelError::SlotOutOfRange {
                operation,
                kind: "output",
                slot,
                len: op.outputs.len(),
            })
    }

    /// Number of inputs an operation declares.
    pub fn operation_input_count(&self, operation: usize) -> Result<usize, ModelError> {
        Ok(self.operation(operation)?.inputs.len())
    }

    /// Number of outputs an operation declares.
    pub fn operation_output_count(&self, operation: usize) -> Result<usize, ModelError> {
        Ok(self.operation(operation)?.outputs.len())
    }

    /// Raw constant payload of an operand.
    pub fn operand_bytes(&self, index: u32) -> Result<&[u8], ModelError> {
        let operand = self.operand(index)?;
        operand
            .value
            .as_deref()
            .ok_or(ModelError::NotConstant {
                operand: index,
                lifetime: operand.lifetime,
            })
    }

    /// Extracts a strongly-typed constant value from an operand.
    ///
    /// Fails with [`ModelError::TypeMismatch`] when the operand's declared
    /// type does not match `T`, and [`ModelError::NotConstant`] when there is
    /// no payload.
    pub fn value_of<T: OperandValue>(&self, index: u32) -> Result<T, ModelError> {
        let operand = self.operand(index)?;
        if !T::accepts(operand.ty) {
            return Err(ModelError::TypeMismatch {
                operand: index,
                expected: T::EXPECTED,
                found: operand.ty,
            });
        }
        let bytes = self.operand_bytes(index)?;
        T::from_bytes(bytes)
    }

    /// Typed extraction addressed by operation input slot.
    pub fn operation_input_value<T: OperandValue>(
        &self,
        operation: usize,
        slot: usize,
    ) -> Result<T, ModelError> {
        let index = self.operation_input(operation, slot)?;
        self.value_of(index)
    }

    /// True when the operand at the given operation input slot has the type.
    pub fn input_has_type(
        &self,
        operation: usize,
        slot: usize,
        ty: OperandType,
    ) -> Result<bool, ModelError> {
        let index = self.operation_input(operation, slot)?;
        Ok(self.operand(index)?.ty == ty)
    }

    /// True when the operand at the given operation output slot has the type.
    pub fn output_has_type(
        &self,
        operation: usize,
        slot: usize,
        ty: OperandType,
    ) -> Result<bool, ModelError> {
        let index = self.operation_output(operation, slot)?;
        Ok(self.operand(index)?.ty == ty)
    }

    /// Dimensions of the operand at an operation input slot.
    pub fn input_dimensions(&self, operation: usize, slot: usize) -> Result<&[u32], ModelError> {
        let index = self.operation_input(operation, slot)?;
        Ok(&self.operand(index)?.dimensions)
    }
}

/// Incremental [`Model`] construction, used by the service layer and tests.
#[derive(Default)]
pub struct ModelBuilder {
    operands: Vec<Operand>,
    operations: Vec<Operation>,
    inputs: Vec<u32>,
    outputs: Vec<u32>,
}

impl ModelBuilder {
    /// Appends an operand and returns its table index.
    pub fn operand(&mut self, operand: Operand) -> u32 {
        self.operands.push(operand);
        (self.operands.len() - 1) as u32
    }

    /// Appends a constant operand holding the given payload.
    pub fn constant(&mut self, ty: OperandType, dimensions: Vec<u32>, bytes: Vec<u8>) -> u32 {
        self.operand(Operand {
            ty,
            dimensions,
            lifetime: Lifetime::ConstantCopy,
            scale: 0.0,
            zero_point: 0,
            channel_quant: None,
            value: Some(bytes),
        })
    }

    /// Appends an operation entry.
    pub fn operation(&mut self, code: OperationCode, inputs: Vec<u32>, outputs: Vec<u32>) {
        self.operations.push(Operation::new(code, inputs, outputs));
    }

    /// Declares the model's ordered input operand indices.
    pub fn inputs(&mut self, indexes: Vec<u32>) {
        self.inputs = indexes;
    }

    /// Declares the model's ordered output operand indices.
    pub fn outputs(&mut self, indexes: Vec<u32>) {
        self.outputs = indexes;
    }

    /// Validates and finishes the model.
    pub fn build(self) -> Result<Model, ModelError> {
        Model::new(self.operands, self.operations, self.inputs, self.outputs)
    }
}

/// A scalar or vector value extractable from a constant operand.
pub trait OperandValue: Sized {
    /// Name used in [`ModelError::TypeMismatch`] reports.
    const EXPECTED: &'static str;

    /// Whether an operand of the given declared type can produce `Self`.
    fn accepts(ty: OperandType) -> bool;

    /// Decodes the payload bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError>;
}

fn chunks<const N: usize>(bytes: &[u8]) -> impl Iterator<Item = [u8; N]> + '_ {
    bytes.chunks_exact(N).map(|c| {
        let mut buf = [0u8; N];
        buf.copy_from_slice(c);
        buf
    })
}

impl OperandValue for i32 {
    const EXPECTED: &'static str = "Int32";
    fn accepts(ty: OperandType) -> bool {
        ty == OperandType::Int32
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(chunks::<4>(bytes).map(i32::from_ne_bytes).next().unwrap_or(0))
    }
}

impl OperandValue for u32 {
    const EXPECTED: &'static str = "Uint32";
    fn accepts(ty: OperandType) -> bool {
        // Several NNAPI parameters are declared INT32 but documented
        // non-negative; accept both scalar integer types.
        matches!(ty, OperandType::Uint32 | OperandType::Int32)
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(chunks::<4>(bytes).map(u32::from_ne_bytes).next().unwrap_or(0))
    }
}

impl OperandValue for f32 {
    const EXPECTED: &'static str = "Float32";
    fn accepts(ty: OperandType) -> bool {
        ty == OperandType::Float32
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(chunks::<4>(bytes).map(f32::from_ne_bytes).next().unwrap_or(0.0))
    }
}

impl OperandValue for f16 {
    const EXPECTED: &'static str = "Float16";
    fn accepts(ty: OperandType) -> bool {
        ty == OperandType::Float16
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(chunks::<2>(bytes)
            .map(|b| f16::from_bits(u16::from_ne_bytes(b)))
            .next()
            .unwrap_or(f16::ZERO))
    }
}

impl OperandValue for bool {
    const EXPECTED: &'static str = "Bool";
    fn accepts(ty: OperandType) -> bool {
        ty == OperandType::Bool
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(bytes.first().copied().unwrap_or(0) != 0)
    }
}

impl OperandValue for Vec<i32> {
    const EXPECTED: &'static str = "TensorInt32";
    fn accepts(ty: OperandType) -> bool {
        ty == OperandType::TensorInt32
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(chunks::<4>(bytes).map(i32::from_ne_bytes).collect())
    }
}

impl OperandValue for Vec<f32> {
    const EXPECTED: &'static str = "TensorFloat32";
    fn accepts(ty: OperandType) -> bool {
        ty == OperandType::TensorFloat32
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(chunks::<4>(bytes).map(f32::from_ne_bytes).collect())
    }
}

impl OperandValue for Vec<f16> {
    const EXPECTED: &'static str = "TensorFloat16";
    fn accepts(ty: OperandType) -> bool {
        ty == OperandType::TensorFloat16
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(chunks::<2>(bytes)
            .map(|b| f16::from_bits(u16::from_ne_bytes(b)))
            .collect())
    }
}

impl OperandValue for Vec<u8> {
    const EXPECTED: &'static str = "TensorQuant8Asymm | TensorBool8";
    fn accepts(ty: OperandType) -> bool {
        matches!(
            ty,
            OperandType::TensorQuant8Asymm
                | OperandType::TensorQuant8Symm
                | OperandType::TensorBool8
        )
    }
    fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32_scalar(v: i32) -> Operand {
        Operand {
            ty: OperandType::Int32,
            dimensions: vec![],
            lifetime: Lifetime::ConstantCopy,
            scale: 0.0,
            zero_point: 0,
            channel_quant: None,
            value: Some(v.to_ne_bytes().to_vec()),
        }
    }

    #[test]
    fn scalar_extraction() {
        let mut b = Model::builder();
        let idx = b.operand(i32_scalar(-3));
        let model = b.build().unwrap();
        assert_eq!(model.value_of::<i32>(idx).unwrap(), -3);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let mut b = Model::builder();
        let idx = b.operand(i32_scalar(7));
        let model = b.build().unwrap();
        let err = model.value_of::<f32>(idx).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));
        assert!(err.to_string().contains("Float32"));
    }

    #[test]
    fn vector_extraction() {
        let mut b = Model::builder();
        let bytes: Vec<u8> = [1i32, -2, 3]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let idx = b.constant(OperandType::TensorInt32, vec![3], bytes);
        let model = b.build().unwrap();
        assert_eq!(model.value_of::<Vec<i32>>(idx).unwrap(), vec![1, -2, 3]);
    }

    #[test]
    fn non_constant_extraction_fails() {
        let mut b = Model::builder();
        let idx = b.operand(Operand::tensor(
            OperandType::TensorFloat32,
            vec![2, 2],
            Lifetime::TemporaryVariable,
        ));
        let model = b.build().unwrap();
        assert!(matches!(
            model.value_of::<Vec<f32>>(idx),
            Err(ModelError::NotConstant { .. })
        ));
    }

    #[test]
    fn operand_out_of_range() {
        let model = Model::builder().build().unwrap();
        assert!(matches!(
            model.operand(5),
            Err(ModelError::OperandOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn operation_slot_resolution() {
        let mut b = Model::builder();
        let a = b.operand(Operand::tensor(
            OperandType::TensorFloat32,
            vec![2],
            Lifetime::SubgraphInput,
        ));
        let out = b.operand(Operand::tensor(
            OperandType::TensorFloat32,
            vec![2],
            Lifetime::SubgraphOutput,
        ));
        b.operation(OperationCode::Relu, vec![a], vec![out]);
        b.inputs(vec![a]);
        b.outputs(vec![out]);
        let model = b.build().unwrap();

        assert_eq!(model.operation_input(0, 0).unwrap(), a);
        assert_eq!(model.operation_output(0, 0).unwrap(), out);
        assert!(matches!(
            model.operation_input(0, 3),
            Err(ModelError::SlotOutOfRange { .. })
        ));
    }

    #[test]
    fn bad_operand_reference_rejected_at_build() {
        let mut b = Model::builder();
        b.operation(OperationCode::Relu, vec![9], vec![10]);
        assert!(matches!(
            b.build(),
            Err(ModelError::BadOperandReference { index: 9, .. })
        ));
    }

    #[test]
    fn payload_size_checked_at_build() {
        let mut b = Model::builder();
        b.constant(OperandType::TensorFloat32, vec![4], vec![0u8; 7]);
        assert!(matches!(
            b.build(),
            Err(ModelError::PayloadSizeMismatch { .. })
        ));
    }
}
