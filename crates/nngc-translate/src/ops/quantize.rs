//! Quantize/dequantize operators.
//!
//! Both are expressed through the shared scale/zero-point arithmetic: the
//! QUANTIZE output path reuses the default connect's requantization, and
//! DEQUANTIZE rides the float-input resolution.

use nngc_graph::{ElementType, Handle, Node};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::element_type_of;

pub(crate) struct Quantize;
impl OperationBuilder for Quantize {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        let out = ctx.output_operand(0).map_err(|e| e.to_string())?;
        if !out.ty.is_quantized() {
            return Err(format!("output must be a quantized tensor, found {}", out.ty));
        }
        Ok(())
    }

    /// The float value itself; the connect default turns it into the
    /// output operand's storage type via scale and zero point.
    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        ctx.convert(input, ElementType::F32)
    }
}

pub(crate) struct Dequantize;
impl OperationBuilder for Dequantize {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        let input = ctx.input_operand(0).map_err(|e| e.to_string())?;
        if !input.ty.is_quantized() {
            return Err(format!("input must be a quantized tensor, found {}", input.ty));
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let real = ctx.float_input(0)?;
        // FLOAT16 models want the dequantized values as halves.
        let to = element_type_of(ctx.output_operand(0)?.ty);
        ctx.convert(real, to)
    }
}
