//! Top-k selection along the last axis.

use nngc_graph::{ElementType, Handle, Node, NodeKind, Shape, TopKOutput};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;
use crate::primitives::element_type_of;

/// Produces both outputs — values at slot 0, indices at slot 1 — so it
/// overrides the single-result connect.
pub(crate) struct TopkV2;

impl TopkV2 {
    fn top_output(
        &self,
        ctx: &mut OpCtx,
        input: Handle<Node>,
        k: usize,
        axis: usize,
        output: TopKOutput,
    ) -> Result<Handle<Node>, TranslateError> {
        let mut dims = ctx.graph.shape(input).dims().to_vec();
        dims[axis] = k;
        let ty = match output {
            TopKOutput::Values => ctx.node_type(input),
            TopKOutput::Indices => ElementType::I32,
        };
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::TopK {
                k,
                axis,
                largest: true,
                output,
            },
            inputs: vec![input],
            ty,
            shape: Shape(dims),
            name: None,
        })?)
    }
}

impl OperationBuilder for TopkV2 {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        let k = ctx.parse::<i32>(1).map_err(|e| e.to_string())?;
        if k < 1 {
            return Err(format!("k must be at least 1, found {k}"));
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        let k = ctx.parse::<i32>(1)? as usize;
        let axis = ctx.graph.shape(input).rank() - 1;
        self.top_output(ctx, input, k, axis, TopKOutput::Values)
    }

    fn connect(&self, ctx: &mut OpCtx) -> Result<(), TranslateError> {
        let input = ctx.float_input(0)?;
        let k = ctx.parse::<i32>(1)? as usize;
        let axis = ctx.graph.shape(input).rank() - 1;

        let values = self.top_output(ctx, input, k, axis, TopKOutput::Values)?;
        let values = if ctx.output_operand(0)?.ty.is_quantized() {
            ctx.requantize_for_output(values, 0)?
        } else {
            let to = element_type_of(ctx.output_operand(0)?.ty);
            ctx.convert(values, to)?
        };
        ctx.record_output(0, values)?;

        let indices = self.top_output(ctx, input, k, axis, TopKOutput::Indices)?;
        let to = element_type_of(ctx.output_operand(1)?.ty);
        let indices = ctx.convert(indices, to)?;
        ctx.record_output(1, indices)
    }
}
