//! Unary math and activation operators.

use nngc_graph::{BinaryOp, Handle, Node, NodeKind, UnaryOp};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::element_type_of;

fn simple(ctx: &mut OpCtx, op: UnaryOp) -> Result<Handle<Node>, TranslateError> {
    let input = ctx.float_input(0)?;
    ctx.unary(op, input)
}

pub(crate) struct Abs;
impl OperationBuilder for Abs {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Abs)
    }
}

pub(crate) struct Exp;
impl OperationBuilder for Exp {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Exp)
    }
}

pub(crate) struct Floor;
impl OperationBuilder for Floor {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Floor)
    }
}

pub(crate) struct Log;
impl OperationBuilder for Log {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Log)
    }
}

pub(crate) struct Neg;
impl OperationBuilder for Neg {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Neg)
    }
}

pub(crate) struct Sin;
impl OperationBuilder for Sin {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Sin)
    }
}

pub(crate) struct Sqrt;
impl OperationBuilder for Sqrt {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Sqrt)
    }
}

/// `1 / sqrt(x)`.
pub(crate) struct Rsqrt;
impl OperationBuilder for Rsqrt {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let root = simple(ctx, UnaryOp::Sqrt)?;
        let one = ctx.const_f32(1.0);
        ctx.binary(BinaryOp::Div, one, root)
    }
}

/// Elementwise conversion to the output operand's element type.
pub(crate) struct Cast;
impl OperationBuilder for Cast {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.input_node(0)?;
        let to = element_type_of(ctx.output_operand(0)?.ty);
        ctx.convert(input, to)
    }
}

pub(crate) struct Relu;
impl OperationBuilder for Relu {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Relu)
    }
}

pub(crate) struct Relu1;
impl OperationBuilder for Relu1 {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        ctx.clamp(input, -1.0, 1.0)
    }
}

pub(crate) struct Relu6;
impl OperationBuilder for Relu6 {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        ctx.clamp(input, 0.0, 6.0)
    }
}

pub(crate) struct Logistic;
impl OperationBuilder for Logistic {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Sigmoid)
    }
}

pub(crate) struct Tanh;
impl OperationBuilder for Tanh {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        simple(ctx, UnaryOp::Tanh)
    }
}

/// `x * relu6(x + 3) / 6`.
pub(crate) struct HardSwish;
impl OperationBuilder for HardSwish {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        let three = ctx.const_f32(3.0);
        let shifted = ctx.binary(BinaryOp::Add, input, three)?;
        let gated = ctx.clamp(shifted, 0.0, 6.0)?;
        let scaled = ctx.binary(BinaryOp::Mul, input, gated)?;
        let sixth = ctx.const_f32(1.0 / 6.0);
        ctx.binary(BinaryOp::Mul, scaled, sixth)
    }
}

pub(crate) struct Elu;
impl OperationBuilder for Elu {
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        let alpha = ctx.parse_or::<f32>(1, 1.0)?;
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::Elu { alpha },
            inputs: vec![input],
            ty: ctx.node_type(input),
            shape: ctx.node_shape(input),
            name: None,
        })?)
    }
}
