mod common;

use nngc_graph::{NodeKind, ReduceOp, TopKOutput};
use nngc_model::{Model, OperandType, OperationCode};

fn reduce_model(keep: bool) -> Model {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 3, 4]);
    let axes = common::const_i32s(&mut b, &[1], &[1]);
    let keep_dims = b.constant(OperandType::Bool, vec![], vec![u8::from(keep)]);
    let out_dims: &[u32] = if keep { &[2, 1, 4] } else { &[2, 4] };
    let out = common::output(&mut b, out_dims);
    b.operation(OperationCode::ReduceSum, vec![x, axes, keep_dims], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);
    common::build(b)
}

/// keep_dims=true preserves rank with reduced axes at size 1.
#[test]
fn keep_dims_preserves_rank() {
    let graph =
        nngc_translate::translate_model(&reduce_model(true), nngc_translate::PluginTarget::Cpu)
            .unwrap();
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[2, 1, 4]);
}

/// keep_dims=false removes the reduced axes.
#[test]
fn keep_dims_false_drops_axes() {
    let graph =
        nngc_translate::translate_model(&reduce_model(false), nngc_translate::PluginTarget::Cpu)
            .unwrap();
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[2, 4]);
}

/// MEAN's keep_dims arrives as an INT32 that is true when strictly positive.
#[test]
fn mean_keep_dims_from_positive_int() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 3, 4]);
    let axes = common::const_i32s(&mut b, &[2], &[0, 2]);
    let keep = common::scalar_i32(&mut b, 1);
    let out = common::output(&mut b, &[1, 3, 1]);
    b.operation(OperationCode::Mean, vec![x, axes, keep], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    assert_eq!(result.shape.dims(), &[1, 3, 1]);
    assert!(matches!(
        result.kind,
        NodeKind::Reduce {
            op: ReduceOp::Mean,
            keep_dims: true,
            ..
        }
    ));
}

/// An axis of -1 on a rank-4 tensor resolves to axis 3.
#[test]
fn negative_axis_resolves_against_rank() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[1, 2, 3, 4]);
    let axes = common::const_i32s(&mut b, &[1], &[-1]);
    let keep = b.constant(OperandType::Bool, vec![], vec![1]);
    let out = common::output(&mut b, &[1, 2, 3, 1]);
    b.operation(OperationCode::ReduceMax, vec![x, axes, keep], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    match &result.kind {
        NodeKind::Reduce { axes, .. } => assert_eq!(axes, &[3]),
        other => panic!("expected a reduction, got {other:?}"),
    }
    assert_eq!(result.shape.dims(), &[1, 2, 3, 1]);
}

/// ARGMAX lowers to a k=1 top-k index selection with the axis squeezed.
#[test]
fn argmax_drops_the_selection_axis() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 5]);
    let axis = common::scalar_i32(&mut b, -1);
    let out = b.operand(nngc_model::Operand::tensor(
        OperandType::TensorInt32,
        vec![2],
        nngc_model::Lifetime::SubgraphOutput,
    ));
    b.operation(OperationCode::ArgMax, vec![x, axis], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let topk = common::nodes_matching(&graph, |k| {
        matches!(
            k,
            NodeKind::TopK {
                k: 1,
                axis: 1,
                largest: true,
                output: TopKOutput::Indices,
            }
        )
    });
    assert_eq!(topk.len(), 1);
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[2]);
}
