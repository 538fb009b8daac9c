mod common;

use nngc_model::{Model, OperationCode};
use nngc_translate::TranslateError;

/// An opcode with no registered builder fails with the opcode and operation
/// index in the error, not a crash or a silently skipped operation.
#[test]
fn unsupported_opcode_is_named() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[1, 4]);
    let out = common::output(&mut b, &[1, 4]);
    b.operation(OperationCode::LshProjection, vec![x], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let err = common::try_translate(b).unwrap_err();
    match &err {
        TranslateError::UnsupportedOperation { code, index } => {
            assert_eq!(*code, OperationCode::LshProjection);
            assert_eq!(*index, 0);
        }
        other => panic!("expected UnsupportedOperation, got {other}"),
    }
    assert!(err.to_string().contains("LshProjection"));
}

/// Builder validation failures carry the operator identity and reason.
#[test]
fn validation_failure_reports_the_operator() {
    let mut b = Model::builder();
    // Rank-2 input: convolution requires rank 4.
    let x = common::input(&mut b, &[8, 3]);
    let filter = common::const_f32s(&mut b, &[4, 3, 3, 3], &[0.0; 108]);
    let bias = common::const_f32s(&mut b, &[4], &[0.0; 4]);
    let scheme = common::scalar_i32(&mut b, 1);
    let stride_w = common::scalar_i32(&mut b, 1);
    let stride_h = common::scalar_i32(&mut b, 1);
    let act = common::scalar_i32(&mut b, 0);
    let out = common::output(&mut b, &[8, 3]);
    b.operation(
        OperationCode::Conv2d,
        vec![x, filter, bias, scheme, stride_w, stride_h, act],
        vec![out],
    );
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let err = common::try_translate(b).unwrap_err();
    match &err {
        TranslateError::ValidationRejected { code, reason, .. } => {
            assert_eq!(*code, OperationCode::Conv2d);
            assert!(reason.contains("rank"));
        }
        other => panic!("expected ValidationRejected, got {other}"),
    }
}

/// A parameter slot declared with the wrong scalar type fails extraction.
#[test]
fn parameter_type_mismatch_is_fatal() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[4]);
    let c = common::const_f32s(&mut b, &[4], &[1.0; 4]);
    // Activation must be INT32; hand it a float.
    let act = common::scalar_f32(&mut b, 1.0);
    let out = common::output(&mut b, &[4]);
    b.operation(OperationCode::Add, vec![x, c, act], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let err = common::try_translate(b).unwrap_err();
    assert!(matches!(
        err,
        TranslateError::Model(nngc_model::ModelError::TypeMismatch { .. })
    ));
}

/// An operation consuming an operand that no prior operation produced (and
/// that is not constant) is a dangling reference.
#[test]
fn dangling_reference_is_fatal() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[4]);
    let never_produced = common::temp(&mut b, &[4]);
    let out = common::output(&mut b, &[4]);
    b.operation(OperationCode::Relu, vec![never_produced], vec![out]);
    b.inputs(vec![x]);
    b.outputs(vec![out]);

    let err = common::try_translate(b).unwrap_err();
    match err {
        TranslateError::DanglingInput { operand } => assert_eq!(operand, never_produced),
        other => panic!("expected DanglingInput, got {other}"),
    }
}

/// Rejections raised during node construction also abort the pass.
#[test]
fn uneven_split_is_rejected() {
    let mut b = Model::builder();
    let x = common::input(&mut b, &[4]);
    let axis = common::scalar_i32(&mut b, 0);
    let parts = common::scalar_i32(&mut b, 3);
    let outs: Vec<u32> = (0..3).map(|_| common::output(&mut b, &[1])).collect();
    b.operation(OperationCode::Split, vec![x, axis, parts], outs.clone());
    b.inputs(vec![x]);
    b.outputs(outs);

    let err = common::try_translate(b).unwrap_err();
    match &err {
        TranslateError::ValidationRejected { code, .. } => {
            assert_eq!(*code, OperationCode::Split);
        }
        other => panic!("expected ValidationRejected, got {other}"),
    }
}
