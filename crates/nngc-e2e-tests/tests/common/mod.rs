use nngc_graph::{Graph, Handle, Node, NodeKind};
use nngc_model::{Lifetime, Model, ModelBuilder, Operand, OperandType, OperationCode};
use nngc_translate::{translate_model, PluginTarget, TranslateError};

/// Declares a float32 tensor operand with the given lifetime.
#[allow(dead_code)]
pub fn float_tensor(b: &mut ModelBuilder, dims: &[u32], lifetime: Lifetime) -> u32 {
    b.operand(Operand::tensor(
        OperandType::TensorFloat32,
        dims.to_vec(),
        lifetime,
    ))
}

/// A model input operand.
#[allow(dead_code)]
pub fn input(b: &mut ModelBuilder, dims: &[u32]) -> u32 {
    float_tensor(b, dims, Lifetime::SubgraphInput)
}

/// A model output operand.
#[allow(dead_code)]
pub fn output(b: &mut ModelBuilder, dims: &[u32]) -> u32 {
    float_tensor(b, dims, Lifetime::SubgraphOutput)
}

/// An intermediate operand produced and consumed inside the graph.
#[allow(dead_code)]
pub fn temp(b: &mut ModelBuilder, dims: &[u32]) -> u32 {
    float_tensor(b, dims, Lifetime::TemporaryVariable)
}

/// A quantized (u8, asymmetric) tensor operand.
#[allow(dead_code)]
pub fn quant_tensor(
    b: &mut ModelBuilder,
    dims: &[u32],
    lifetime: Lifetime,
    scale: f32,
    zero_point: i32,
) -> u32 {
    let mut operand = Operand::tensor(OperandType::TensorQuant8Asymm, dims.to_vec(), lifetime);
    operand.scale = scale;
    operand.zero_point = zero_point;
    b.operand(operand)
}

/// A float32 constant tensor.
#[allow(dead_code)]
pub fn const_f32s(b: &mut ModelBuilder, dims: &[u32], values: &[f32]) -> u32 {
    let bytes = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    b.constant(OperandType::TensorFloat32, dims.to_vec(), bytes)
}

/// An int32 constant tensor (axis lists, paddings, shapes).
#[allow(dead_code)]
pub fn const_i32s(b: &mut ModelBuilder, dims: &[u32], values: &[i32]) -> u32 {
    let bytes = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    b.constant(OperandType::TensorInt32, dims.to_vec(), bytes)
}

/// An int32 scalar parameter.
#[allow(dead_code)]
pub fn scalar_i32(b: &mut ModelBuilder, value: i32) -> u32 {
    b.constant(OperandType::Int32, vec![], value.to_ne_bytes().to_vec())
}

/// A float32 scalar parameter.
#[allow(dead_code)]
pub fn scalar_f32(b: &mut ModelBuilder, value: f32) -> u32 {
    b.constant(OperandType::Float32, vec![], value.to_ne_bytes().to_vec())
}

/// A boolean scalar parameter.
#[allow(dead_code)]
pub fn scalar_bool(b: &mut ModelBuilder, value: bool) -> u32 {
    b.constant(OperandType::Bool, vec![], vec![u8::from(value)])
}

/// Finishes the model, failing the test on an invalid table.
#[allow(dead_code)]
pub fn build(b: ModelBuilder) -> Model {
    b.build().expect("model construction failed")
}

/// Builds and translates for the CPU plugin, expecting success.
#[allow(dead_code)]
pub fn translate(b: ModelBuilder) -> Graph {
    translate_for(b, PluginTarget::Cpu)
}

/// Builds and translates for a specific plugin, expecting success.
#[allow(dead_code)]
pub fn translate_for(b: ModelBuilder, plugin: PluginTarget) -> Graph {
    let _ = env_logger::builder().is_test(true).try_init();
    let model = build(b);
    translate_model(&model, plugin).expect("translation failed")
}

/// Builds and translates, returning the error for failure tests.
#[allow(dead_code)]
pub fn try_translate(b: ModelBuilder) -> Result<Graph, TranslateError> {
    let _ = env_logger::builder().is_test(true).try_init();
    let model = build(b);
    translate_model(&model, PluginTarget::Cpu)
}

/// Handles of every node whose kind matches the predicate.
#[allow(dead_code)]
pub fn nodes_matching(
    graph: &Graph,
    pred: impl Fn(&NodeKind) -> bool,
) -> Vec<Handle<Node>> {
    graph
        .iter()
        .filter(|(_, node)| pred(&node.kind))
        .map(|(handle, _)| handle)
        .collect()
}

/// The node registered as result `index`.
#[allow(dead_code)]
pub fn result_node(graph: &Graph, index: usize) -> &Node {
    graph.node(graph.results()[index])
}

/// Appends a unary operation `code` from `from` to a fresh output operand.
#[allow(dead_code)]
pub fn unary_to_output(
    b: &mut ModelBuilder,
    code: OperationCode,
    from: u32,
    dims: &[u32],
) -> u32 {
    let out = output(b, dims);
    b.operation(code, vec![from], vec![out]);
    out
}
