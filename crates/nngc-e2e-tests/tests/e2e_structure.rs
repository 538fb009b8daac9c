mod common;

use nngc_graph::{ElementType, NodeKind, TopKOutput};
use nngc_model::{Lifetime, Model, Operand, OperandType, OperationCode};

/// SPLIT registers one node per output slot.
#[test]
fn split_registers_every_output() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[6]);
    let axis = common::scalar_i32(&mut b, 0);
    let parts = common::scalar_i32(&mut b, 3);
    let outs: Vec<u32> = (0..3).map(|_| common::output(&mut b, &[2])).collect();
    b.operation(OperationCode::Split, vec![x, axis, parts], outs.clone());
    b.inputs(vec![x]);
    b.outputs(outs);

    let graph = common::translate(b);
    assert_eq!(graph.results().len(), 3);
    for (i, &result) in graph.results().iter().enumerate() {
        match graph.node(result).kind {
            NodeKind::Split { axis, parts, index } => {
                assert_eq!(axis, 0);
                assert_eq!(parts, 3);
                assert_eq!(index, i);
            }
            ref other => panic!("expected a split slice, got {other:?}"),
        }
        assert_eq!(graph.shape(result).dims(), &[2]);
    }
}

/// TOPK_V2 registers values at slot 0 and indices at slot 1.
#[test]
fn topk_registers_values_and_indices() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 6]);
    let k = common::scalar_i32(&mut b, 2);
    let values = common::output(&mut b, &[2, 2]);
    let indices = b.operand(Operand::tensor(
        OperandType::TensorInt32,
        vec![2, 2],
        Lifetime::SubgraphOutput,
    ));
    b.operation(OperationCode::TopkV2, vec![x, k], vec![values, indices]);
    b.inputs(vec![x]);
    b.outputs(vec![values, indices]);

    let graph = common::translate(b);
    assert_eq!(graph.results().len(), 2);
    let value_node = common::result_node(&graph, 0);
    assert!(matches!(
        value_node.kind,
        NodeKind::TopK {
            k: 2,
            axis: 1,
            output: TopKOutput::Values,
            ..
        }
    ));
    assert_eq!(value_node.ty, ElementType::F32);
    let index_node = common::result_node(&graph, 1);
    assert_eq!(index_node.ty, ElementType::I32);
    assert_eq!(index_node.shape.dims(), &[2, 2]);
}

/// RESHAPE resolves a single -1 wildcard from the element count.
#[test]
fn reshape_resolves_wildcard() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 3, 4]);
    let spec = common::const_i32s(&mut b, &[2], &[6, -1]);
    let out = common::output(&mut b, &[6, 4]);
    b.operation(OperationCode::Reshape, vec![x, spec], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[6, 4]);
}

#[test]
fn concat_sums_the_axis() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 3]);
    let y = common::input(&mut b, &[2, 5]);
    let axis = common::scalar_i32(&mut b, 1);
    let out = common::output(&mut b, &[2, 8]);
    b.operation(OperationCode::Concatenation, vec![x, y, axis], vec![out]);
    b.inputs(vec![x, y]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    assert!(matches!(result.kind, NodeKind::Concat { axis: 1 }));
    assert_eq!(result.shape.dims(), &[2, 8]);
}

/// TRANSPOSE with no permutation reverses the axes.
#[test]
fn transpose_defaults_to_reversal() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 3, 4]);
    let out = common::output(&mut b, &[4, 3, 2]);
    b.operation(OperationCode::Transpose, vec![x], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    match &result.kind {
        NodeKind::Transpose { perm } => assert_eq!(perm, &[2, 1, 0]),
        other => panic!("expected a transpose, got {other:?}"),
    }
    assert_eq!(result.shape.dims(), &[4, 3, 2]);
}

#[test]
fn strided_slice_shrinks_masked_axes() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[4, 6]);
    let begin = common::const_i32s(&mut b, &[2], &[1, 0]);
    let end = common::const_i32s(&mut b, &[2], &[2, 6]);
    let strides = common::const_i32s(&mut b, &[2], &[1, 2]);
    let begin_mask = common::scalar_i32(&mut b, 0);
    let end_mask = common::scalar_i32(&mut b, 0);
    // Shrink axis 0: the output drops to rank 1.
    let shrink = common::scalar_i32(&mut b, 1);
    let out = common::output(&mut b, &[3]);
    b.operation(
        OperationCode::StridedSlice,
        vec![x, begin, end, strides, begin_mask, end_mask, shrink],
        vec![out],
    );
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[3]);
}

#[test]
fn gather_splices_index_shape() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[3, 4, 5]);
    let axis = common::scalar_i32(&mut b, 1);
    let indices = common::const_i32s(&mut b, &[2], &[0, 3]);
    let out = common::output(&mut b, &[3, 2, 5]);
    b.operation(OperationCode::Gather, vec![x, axis, indices], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[3, 2, 5]);
}

/// CHANNEL_SHUFFLE lowers to reshape/transpose/reshape with the original
/// shape restored.
#[test]
fn channel_shuffle_restores_shape() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[1, 8, 4]);
    let groups = common::scalar_i32(&mut b, 4);
    let axis = common::scalar_i32(&mut b, 1);
    let out = common::output(&mut b, &[1, 8, 4]);
    b.operation(OperationCode::ChannelShuffle, vec![x, groups, axis], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    assert!(matches!(result.kind, NodeKind::Reshape));
    assert_eq!(result.shape.dims(), &[1, 8, 4]);
    assert_eq!(
        common::nodes_matching(&graph, |k| matches!(k, NodeKind::Transpose { .. })).len(),
        1
    );
}

/// The sequence RNN unrolls to one cell per timestep.
#[test]
fn sequence_rnn_unrolls_timesteps() {
    let mut b = Model::builder();
    // Batch-major: [batch=2, seq=3, input=4], 5 units.
    let x = common::input(&mut b, &[2, 3, 4]);
    let weights = common::const_f32s(&mut b, &[5, 4], &[0.1; 20]);
    let recurrent = common::const_f32s(&mut b, &[5, 5], &[0.1; 25]);
    let bias = common::const_f32s(&mut b, &[5], &[0.0; 5]);
    let hidden = common::const_f32s(&mut b, &[2, 5], &[0.0; 10]);
    let act = common::scalar_i32(&mut b, 1);
    let time_major = common::scalar_i32(&mut b, 0);
    let out = common::output(&mut b, &[2, 3, 5]);
    b.operation(
        OperationCode::UnidirectionalSequenceRnn,
        vec![x, weights, recurrent, bias, hidden, act, time_major],
        vec![out],
    );
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    // Two matrix products per timestep.
    let matmuls = common::nodes_matching(&graph, |k| matches!(k, NodeKind::MatMul { .. }));
    assert_eq!(matmuls.len(), 6);
    let result = common::result_node(&graph, 0);
    assert!(matches!(result.kind, NodeKind::Concat { axis: 1 }));
    assert_eq!(result.shape.dims(), &[2, 3, 5]);
}

/// The single-step RNN registers the same value at both output slots.
#[test]
fn rnn_registers_state_and_output() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 4]);
    let weights = common::const_f32s(&mut b, &[5, 4], &[0.1; 20]);
    let recurrent = common::const_f32s(&mut b, &[5, 5], &[0.1; 25]);
    let bias = common::const_f32s(&mut b, &[5], &[0.0; 5]);
    let hidden = common::const_f32s(&mut b, &[2, 5], &[0.0; 10]);
    let act = common::scalar_i32(&mut b, 1);
    let state_out = common::output(&mut b, &[2, 5]);
    let out = common::output(&mut b, &[2, 5]);
    b.operation(
        OperationCode::Rnn,
        vec![x, weights, recurrent, bias, hidden, act],
        vec![state_out, out],
    );
    b.inputs(vec![x]);
    b.outputs(vec![state_out, out]);

    let graph = common::translate(b);
    assert_eq!(graph.results().len(), 2);
    assert_eq!(graph.results()[0], graph.results()[1]);
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[2, 5]);
}
