mod common;

use nngc_graph::{BinaryOp, ElementType, NodeKind};
use nngc_model::{Lifetime, Model, OperationCode};

/// DEQUANTIZE expands to `(stored - zero_point) * scale` in f32.
#[test]
fn dequantize_expands_to_scale_arithmetic() {
    let mut b = Model::builder();
    let x = common::quant_tensor(&mut b, &[4], Lifetime::SubgraphInput, 0.5, 128);
    let out = common::output(&mut b, &[4]);
    b.operation(OperationCode::Dequantize, vec![x], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    assert_eq!(result.ty, ElementType::F32);
    // Storage convert, zero-point subtract, scale multiply.
    assert!(!common::nodes_matching(&graph, |k| matches!(k, NodeKind::Convert)).is_empty());
    assert_eq!(
        common::nodes_matching(&graph, |k| matches!(k, NodeKind::Binary(BinaryOp::Sub))).len(),
        1
    );
    assert_eq!(
        common::nodes_matching(&graph, |k| matches!(k, NodeKind::Binary(BinaryOp::Mul))).len(),
        1
    );
}

/// QUANTIZE clamps into the storage range and converts to the storage type.
#[test]
fn quantize_produces_storage_type() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[4]);
    let out = common::quant_tensor(&mut b, &[4], Lifetime::SubgraphOutput, 0.25, 0);
    b.operation(OperationCode::Quantize, vec![x], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    assert_eq!(result.ty, ElementType::U8);
    let clamps = common::nodes_matching(&graph, |k| {
        matches!(k, NodeKind::Clamp { min, max } if *min == 0.0 && *max == 255.0)
    });
    assert_eq!(clamps.len(), 1);
}

/// Arithmetic on quantized operands computes in f32 and requantizes into
/// the output operand's storage type.
#[test]
fn quantized_add_requantizes_output() {
    let mut b = Model::builder();
    let x = common::quant_tensor(&mut b, &[4], Lifetime::SubgraphInput, 0.5, 0);
    let y = common::quant_tensor(&mut b, &[4], Lifetime::SubgraphInput, 0.5, 0);
    let act = common::scalar_i32(&mut b, 0);
    let out = common::quant_tensor(&mut b, &[4], Lifetime::SubgraphOutput, 1.0, 0);
    b.operation(OperationCode::Add, vec![x, y, act], vec![out]);
    b.inputs(vec![x, y]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    assert_eq!(result.ty, ElementType::U8);
    // Two input dequantize multiplies plus the arithmetic itself.
    let adds = common::nodes_matching(&graph, |k| matches!(k, NodeKind::Binary(BinaryOp::Add)));
    assert_eq!(adds.len(), 1);
    let divs = common::nodes_matching(&graph, |k| matches!(k, NodeKind::Binary(BinaryOp::Div)));
    assert_eq!(divs.len(), 1);
}

/// Structural operators pass quantized storage through untouched.
#[test]
fn reshape_keeps_quantized_storage() {
    let mut b = Model::builder();
    let x = common::quant_tensor(&mut b, &[2, 6], Lifetime::SubgraphInput, 0.5, 3);
    let spec = common::const_i32s(&mut b, &[2], &[3, 4]);
    let out = common::quant_tensor(&mut b, &[3, 4], Lifetime::SubgraphOutput, 0.5, 3);
    b.operation(OperationCode::Reshape, vec![x, spec], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let graph = common::translate(b);
    let result = common::result_node(&graph, 0);
    assert_eq!(result.ty, ElementType::U8);
    assert_eq!(result.shape.dims(), &[3, 4]);
    // No dequantize round trip for a pure data movement.
    assert!(common::nodes_matching(&graph, |k| matches!(k, NodeKind::Binary(_))).is_empty());
}
