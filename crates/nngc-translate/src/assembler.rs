//! Drives the translation pass.

use nngc_graph::{Graph, Shape};
use nngc_model::Model;

use crate::builder::{builder_for, OpCtx};
use crate::error::TranslateError;
use crate::plugin::PluginTarget;
use crate::primitives::element_type_of;
use crate::registry::NodeRegistry;

/// Translates one model into one graph in a single synchronous pass.
///
/// Construction registers the model's declared inputs as graph parameters;
/// [`translate`](GraphAssembler::translate) then walks the operation table
/// in declared order — the model format guarantees that order is
/// topologically valid, and no sorting or repair is attempted here — and
/// finally collects the declared outputs. `translate` consumes the
/// assembler, so a finished (or failed) pass cannot be re-run.
pub struct GraphAssembler<'m> {
    model: &'m Model,
    plugin: PluginTarget,
    registry: NodeRegistry,
    graph: Graph,
}

impl<'m> GraphAssembler<'m> {
    /// Loads model metadata and registers every declared input operand as a
    /// graph parameter, in declared order. Rank-3 inputs are promoted to
    /// rank 4 with a leading batch of 1.
    pub fn new(model: &'m Model, plugin: PluginTarget) -> Result<Self, TranslateError> {
        let mut graph = Graph::new();
        let mut registry = NodeRegistry::new(model.operand_count());

        for &index in model.input_indexes() {
            let operand = model.operand(index)?;
            let mut dims: Vec<usize> = operand.dimensions.iter().map(|&d| d as usize).collect();
            if dims.len() == 3 {
                log::debug!("input operand {index}: promoting rank-3 shape to 4-D");
                dims.insert(0, 1);
            }
            let param = graph.add_parameter(
                element_type_of(operand.ty),
                Shape(dims),
                Some(format!("input{index}")),
            );
            registry.record_output(index, param);
        }

        Ok(Self {
            model,
            plugin,
            registry,
            graph,
        })
    }

    /// Runs every operation through its builder and assembles the final
    /// graph. Any failure aborts the whole pass; there is no partial graph.
    pub fn translate(mut self) -> Result<Graph, TranslateError> {
        for index in 0..self.model.operations().len() {
            let code = self.model.operation_code(index)?;
            let builder = builder_for(code)
                .ok_or(TranslateError::UnsupportedOperation { code, index })?;

            let mut ctx = OpCtx {
                index,
                model: self.model,
                plugin: self.plugin,
                registry: &mut self.registry,
                graph: &mut self.graph,
            };
            if let Err(reason) = builder.validate(&ctx) {
                return Err(TranslateError::ValidationRejected {
                    code,
                    index,
                    reason,
                });
            }
            builder.connect(&mut ctx)?;
            log::trace!("operation {index} ({code}) connected");
        }

        for &output in self.model.output_indexes() {
            let node = self
                .registry
                .try_resolve(output)
                .ok_or(TranslateError::DanglingInput { operand: output })?;
            self.graph.mark_result(node)?;
        }

        log::debug!(
            "translation complete: {} node(s), {} parameter(s), {} result(s)",
            self.graph.node_count(),
            self.graph.parameters().len(),
            self.graph.results().len(),
        );
        Ok(self.graph)
    }
}

/// Convenience wrapper: assemble and translate in one call.
pub fn translate_model(model: &Model, plugin: PluginTarget) -> Result<Graph, TranslateError> {
    GraphAssembler::new(model, plugin)?.translate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nngc_graph::NodeKind;
    use nngc_model::{Lifetime, Model, Operand, OperandType, OperationCode};

    fn float_tensor(dims: &[u32], lifetime: Lifetime) -> Operand {
        Operand::tensor(OperandType::TensorFloat32, dims.to_vec(), lifetime)
    }

    #[test]
    fn unsupported_opcode_names_the_operator() {
        let mut b = Model::builder();
        let x = b.operand(float_tensor(&[1, 4], Lifetime::SubgraphInput));
        let out = b.operand(float_tensor(&[1, 4], Lifetime::SubgraphOutput));
        b.operation(OperationCode::Lstm, vec![x], vec![out]);
        b.inputs(vec![x]);
        b.outputs(vec![out]);
        let model = b.build().unwrap();

        let err = translate_model(&model, PluginTarget::Cpu).unwrap_err();
        match err {
            TranslateError::UnsupportedOperation { code, index } => {
                assert_eq!(code, OperationCode::Lstm);
                assert_eq!(index, 0);
            }
            other => panic!("expected UnsupportedOperation, got {other}"),
        }
        // The message names the opcode.
        let msg = TranslateError::UnsupportedOperation {
            code: OperationCode::Lstm,
            index: 0,
        }
        .to_string();
        assert!(msg.contains("Lstm"));
    }

    #[test]
    fn rank3_input_promoted_to_rank4() {
        let mut b = Model::builder();
        let x = b.operand(float_tensor(&[8, 8, 3], Lifetime::SubgraphInput));
        let out = b.operand(float_tensor(&[8, 8, 3], Lifetime::SubgraphOutput));
        b.operation(OperationCode::Relu, vec![x], vec![out]);
        b.inputs(vec![x]);
        b.outputs(vec![out]);
        let model = b.build().unwrap();

        let graph = translate_model(&model, PluginTarget::Cpu).unwrap();
        let param = graph.parameters()[0];
        assert_eq!(graph.shape(param).dims(), &[1, 8, 8, 3]);
    }

    #[test]
    fn results_follow_declared_output_order() {
        let mut b = Model::builder();
        let x = b.operand(float_tensor(&[4], Lifetime::SubgraphInput));
        let a = b.operand(float_tensor(&[4], Lifetime::SubgraphOutput));
        let c = b.operand(float_tensor(&[4], Lifetime::SubgraphOutput));
        b.operation(OperationCode::Relu, vec![x], vec![a]);
        b.operation(OperationCode::Abs, vec![x], vec![c]);
        b.inputs(vec![x]);
        // Declared order deliberately reverses creation order.
        b.outputs(vec![c, a]);
        let model = b.build().unwrap();

        let graph = translate_model(&model, PluginTarget::Cpu).unwrap();
        assert_eq!(graph.results().len(), 2);
        let first = graph.node(graph.results()[0]);
        let second = graph.node(graph.results()[1]);
        assert!(matches!(first.kind, NodeKind::Unary(nngc_graph::UnaryOp::Abs)));
        assert!(matches!(second.kind, NodeKind::Unary(nngc_graph::UnaryOp::Relu)));
    }

    #[test]
    fn dangling_model_output_is_fatal() {
        let mut b = Model::builder();
        let x = b.operand(float_tensor(&[4], Lifetime::SubgraphInput));
        let never_produced = b.operand(float_tensor(&[4], Lifetime::SubgraphOutput));
        b.inputs(vec![x]);
        b.outputs(vec![never_produced]);
        let model = b.build().unwrap();

        let err = translate_model(&model, PluginTarget::Cpu).unwrap_err();
        assert!(matches!(err, TranslateError::DanglingInput { .. }));
    }
}
