//! Simple recurrences, unrolled to matrix arithmetic.
//!
//! The sequence form requires a statically known sequence length: each
//! timestep becomes its own slice/cell/concat group in the graph.

use nngc_graph::{BinaryOp, Handle, Node, NodeKind, Shape};

use crate::builder::{OpCtx, OperationBuilder};
use crate::error::TranslateError;

/// `a . b^T` for two rank-2 operands.
fn matmul_t(
    ctx: &mut OpCtx,
    a: Handle<Node>,
    b: Handle<Node>,
) -> Result<Handle<Node>, TranslateError> {
    let rows = ctx.graph.shape(a).dims()[0];
    let units = ctx.graph.shape(b).dims()[0];
    let ty = ctx.node_type(a);
    Ok(ctx.graph.add_node(Node {
        kind: NodeKind::MatMul {
            transpose_a: false,
            transpose_b: true,
        },
        inputs: vec![a, b],
        ty,
        shape: Shape(vec![rows, units]),
        name: None,
    })?)
}

/// One recurrence step: `activation(x . W^T + h . R^T + bias)`.
fn rnn_cell(
    ctx: &mut OpCtx,
    x: Handle<Node>,
    weights: Handle<Node>,
    recurrent: Handle<Node>,
    bias: Handle<Node>,
    hidden: Handle<Node>,
    activation: i32,
) -> Result<Handle<Node>, TranslateError> {
    let from_input = matmul_t(ctx, x, weights)?;
    let from_state = matmul_t(ctx, hidden, recurrent)?;
    let sum = ctx.binary(BinaryOp::Add, from_input, from_state)?;
    let sum = ctx.binary(BinaryOp::Add, sum, bias)?;
    ctx.apply_activation(sum, activation)
}

fn validate_cell_operands(ctx: &OpCtx) -> Result<(), String> {
    for (slot, expected) in [(1, 2), (2, 2), (3, 1), (4, 2)] {
        let rank = ctx.input_rank(slot).map_err(|e| e.to_string())?;
        if rank != expected {
            return Err(format!(
                "input {slot}: expected rank {expected}, found rank {rank}"
            ));
        }
    }
    Ok(())
}

/// Single-step RNN. Output slot 0 is the new hidden state and slot 1 the
/// cell output; both carry the same value.
pub(crate) struct Rnn;
impl OperationBuilder for Rnn {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        validate_cell_operands(ctx)
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let x = ctx.float_input(0)?;
        let weights = ctx.float_input(1)?;
        let recurrent = ctx.float_input(2)?;
        let bias = ctx.float_input(3)?;
        let hidden = ctx.float_input(4)?;
        let activation = ctx.parse::<i32>(5)?;
        rnn_cell(ctx, x, weights, recurrent, bias, hidden, activation)
    }

    fn connect(&self, ctx: &mut OpCtx) -> Result<(), TranslateError> {
        let out = self.create_node_for_plugin(ctx)?;
        for slot in 0..ctx.output_count() {
            let node = ctx.requantize_for_output(out, slot)?;
            ctx.record_output(slot, node)?;
        }
        Ok(())
    }
}

/// Unrolled sequence RNN: slices each timestep, threads the hidden state
/// through the cell, and concatenates the per-step outputs.
pub(crate) struct UnidirectionalSequenceRnn;
impl OperationBuilder for UnidirectionalSequenceRnn {
    fn validate(&self, ctx: &OpCtx) -> Result<(), String> {
        validate_cell_operands(ctx)?;
        let rank = ctx.input_rank(0).map_err(|e| e.to_string())?;
        if rank != 3 {
            return Err(format!("sequence input must be rank 3, found rank {rank}"));
        }
        let dims = ctx.input_dims(0).map_err(|e| e.to_string())?;
        if dims.iter().any(|&d| d == 0) {
            return Err("sequence length must be statically known".into());
        }
        Ok(())
    }

    fn create_node(&self, ctx: &mut OpCtx) -> Result<Handle<Node>, TranslateError> {
        let input = ctx.float_input(0)?;
        let weights = ctx.float_input(1)?;
        let recurrent = ctx.float_input(2)?;
        let bias = ctx.float_input(3)?;
        let mut hidden = ctx.float_input(4)?;
        let activation = ctx.parse::<i32>(5)?;
        let time_major = ctx.flag_or(6, false)?;

        let dims = ctx.graph.shape(input).dims().to_vec();
        let time_axis = if time_major { 0 } else { 1 };
        let steps = dims[time_axis];
        let (batch, input_size) = if time_major {
            (dims[1], dims[2])
        } else {
            (dims[0], dims[2])
        };
        let units = ctx.graph.shape(weights).dims()[0];

        let ty = ctx.node_type(input);
        let mut outputs = Vec::with_capacity(steps);
        for step in 0..steps {
            let mut begin = vec![0; 3];
            begin[time_axis] = step;
            let mut size = dims.clone();
            size[time_axis] = 1;
            let slice = ctx.graph.add_node(Node {
                kind: NodeKind::Slice {
                    begin,
                    size: size.clone(),
                },
                inputs: vec![input],
                ty,
                shape: Shape(size),
                name: None,
            })?;
            let x = ctx.reshape(slice, Shape(vec![batch, input_size]))?;
            hidden = rnn_cell(ctx, x, weights, recurrent, bias, hidden, activation)?;

            let mut step_dims = vec![batch, units];
            step_dims.insert(time_axis, 1);
            outputs.push(ctx.reshape(hidden, Shape(step_dims))?);
        }

        let mut out_dims = vec![batch, units];
        out_dims.insert(time_axis, steps);
        Ok(ctx.graph.add_node(Node {
            kind: NodeKind::Concat { axis: time_axis },
            inputs: outputs,
            ty,
            shape: Shape(out_dims),
            name: None,
        })?)
    }

    fn connect(&self, ctx: &mut OpCtx) -> Result<(), TranslateError> {
        let concat = self.create_node_for_plugin(ctx)?;
        let last_step = ctx.graph.node(concat).inputs.last().copied();
        let sequence = ctx.requantize_for_output(concat, 0)?;
        ctx.record_output(0, sequence)?;
        // The newer signature also returns the final hidden state, which is
        // the cell value feeding the last per-step reshape.
        if ctx.output_count() > 1 {
            if let Some(step) = last_step {
                let final_hidden = ctx.graph.node(step).inputs[0];
                let final_hidden = ctx.requantize_for_output(final_hidden, 1)?;
                ctx.record_output(1, final_hidden)?;
            }
        }
        Ok(())
    }
}
