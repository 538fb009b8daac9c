mod common;

use nngc_graph::{BinaryOp, NodeKind, ReduceOp, UnaryOp};
use nngc_model::{Model, ModelBuilder, OperationCode};
use nngc_translate::PluginTarget;

fn softmax_model() -> ModelBuilder {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 8]);
    let beta = common::scalar_f32(&mut b, 1.0);
    let out = common::output(&mut b, &[2, 8]);
    b.operation(OperationCode::Softmax, vec![x, beta], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);
    b
}

/// The portable lowering subtracts the row maximum before exponentiating.
#[test]
fn softmax_cpu_is_max_stabilized() {
    let graph = common::translate_for(softmax_model(), PluginTarget::Cpu);
    let maxes = common::nodes_matching(&graph, |k| {
        matches!(k, NodeKind::Reduce { op: ReduceOp::Max, .. })
    });
    assert_eq!(maxes.len(), 1);
    assert!(matches!(
        common::result_node(&graph, 0).kind,
        NodeKind::Binary(BinaryOp::Div)
    ));
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[2, 8]);
}

/// The VPU lowering goes straight to exp/sum.
#[test]
fn softmax_vpu_skips_stabilization() {
    let graph = common::translate_for(softmax_model(), PluginTarget::Vpu);
    assert!(common::nodes_matching(&graph, |k| {
        matches!(k, NodeKind::Reduce { op: ReduceOp::Max, .. })
    })
    .is_empty());
    assert!(matches!(
        common::result_node(&graph, 0).kind,
        NodeKind::Binary(BinaryOp::Div)
    ));
}

/// Softmax with an explicit axis normalizes a negative value against rank.
#[test]
fn softmax_negative_axis() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[1, 2, 3, 4]);
    let beta = common::scalar_f32(&mut b, 1.0);
    let axis = common::scalar_i32(&mut b, -1);
    let out = common::output(&mut b, &[1, 2, 3, 4]);
    b.operation(OperationCode::Softmax, vec![x, beta, axis], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let sums = common::nodes_matching(&graph, |k| {
        matches!(k, NodeKind::Reduce { op: ReduceOp::Sum, axes, .. } if axes == &[3])
    });
    assert_eq!(sums.len(), 1);
}

#[test]
fn log_softmax_subtracts_the_log_sum() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 8]);
    let beta = common::scalar_f32(&mut b, 2.0);
    let axis = common::scalar_i32(&mut b, -1);
    let out = common::output(&mut b, &[2, 8]);
    b.operation(OperationCode::LogSoftmax, vec![x, beta, axis], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    assert_eq!(
        common::nodes_matching(&graph, |k| matches!(k, NodeKind::Unary(UnaryOp::Log))).len(),
        1
    );
    assert!(matches!(
        common::result_node(&graph, 0).kind,
        NodeKind::Binary(BinaryOp::Sub)
    ));
}

/// The epsilon lands inside the MVN square root, so a zero-variance slice
/// divides by `sqrt(eps)` instead of zero.
#[test]
fn instance_norm_keeps_epsilon_inside_sqrt() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[1, 4, 4, 2]);
    let gamma = common::scalar_f32(&mut b, 1.5);
    let beta = common::scalar_f32(&mut b, 0.5);
    let eps = common::scalar_f32(&mut b, 1e-4);
    let layout = common::scalar_bool(&mut b, false);
    let out = common::output(&mut b, &[1, 4, 4, 2]);
    b.operation(
        OperationCode::InstanceNormalization,
        vec![x, gamma, beta, eps, layout],
        vec![out],
    );
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let mvns = common::nodes_matching(&graph, |k| {
        matches!(k, NodeKind::Mvn { axes, eps } if axes == &[2, 3] && *eps == 1e-4)
    });
    assert_eq!(mvns.len(), 1);
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[1, 4, 4, 2]);
}

/// L2 normalization floors the squared sum before the root.
#[test]
fn l2_normalization_floors_the_sum() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[2, 6]);
    let out = common::output(&mut b, &[2, 6]);
    b.operation(OperationCode::L2Normalization, vec![x], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    assert_eq!(
        common::nodes_matching(&graph, |k| matches!(k, NodeKind::Binary(BinaryOp::Maximum)))
            .len(),
        1
    );
    assert!(matches!(
        common::result_node(&graph, 0).kind,
        NodeKind::Binary(BinaryOp::Div)
    ));
    assert_eq!(common::result_node(&graph, 0).shape.dims(), &[2, 6]);
}
