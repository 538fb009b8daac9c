//! Text dump of a graph for debugging.

use std::fmt::Write;

use crate::graph::Graph;
use crate::node::NodeKind;

fn kind_name(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Parameter => "Parameter".into(),
        NodeKind::Constant { data } => format!("Constant({} bytes)", data.len()),
        NodeKind::Binary(op) => format!("{op:?}"),
        NodeKind::Unary(op) => format!("{op:?}"),
        NodeKind::Clamp { min, max } => format!("Clamp({min}, {max})"),
        NodeKind::Elu { alpha } => format!("Elu({alpha})"),
        NodeKind::Prelu => "Prelu".into(),
        NodeKind::Convert => "Convert".into(),
        NodeKind::Transpose { perm } => format!("Transpose{perm:?}"),
        NodeKind::Reshape => "Reshape".into(),
        NodeKind::Concat { axis } => format!("Concat(axis={axis})"),
        NodeKind::Split { axis, parts, index } => {
            format!("Split(axis={axis}, {index}/{parts})")
        }
        NodeKind::Slice { .. } => "Slice".into(),
        NodeKind::StridedSlice { .. } => "StridedSlice".into(),
        NodeKind::Gather { axis } => format!("Gather(axis={axis})"),
        NodeKind::Tile { repeats } => format!("Tile{repeats:?}"),
        NodeKind::Pad { .. } => "Pad".into(),
        NodeKind::SpaceToDepth { block } => format!("SpaceToDepth({block})"),
        NodeKind::DepthToSpace { block } => format!("DepthToSpace({block})"),
        NodeKind::BatchToSpace { .. } => "BatchToSpace".into(),
        NodeKind::SpaceToBatch { .. } => "SpaceToBatch".into(),
        NodeKind::Convolution { groups, .. } if *groups > 1 => {
            format!("Convolution(groups={groups})")
        }
        NodeKind::Convolution { .. } => "Convolution".into(),
        NodeKind::ConvolutionBackprop { .. } => "ConvolutionBackprop".into(),
        NodeKind::MatMul { .. } => "MatMul".into(),
        NodeKind::AvgPool { .. } => "AvgPool".into(),
        NodeKind::MaxPool { .. } => "MaxPool".into(),
        NodeKind::Reduce { op, keep_dims, .. } => {
            format!("Reduce{op:?}(keep_dims={keep_dims})")
        }
        NodeKind::Mvn { eps, .. } => format!("Mvn(eps={eps})"),
        NodeKind::Lrn { size, .. } => format!("Lrn(size={size})"),
        NodeKind::TopK { k, output, .. } => format!("TopK(k={k}, {output:?})"),
        NodeKind::Select => "Select".into(),
        NodeKind::Interpolate { mode, sizes, .. } => {
            format!("Interpolate({mode:?}, {}x{})", sizes[0], sizes[1])
        }
    }
}

/// Renders the graph as text, one node per line, for logs and tests.
pub fn dump_graph(graph: &Graph) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Graph: {} node(s), {} parameter(s), {} result(s)",
        graph.node_count(),
        graph.parameters().len(),
        graph.results().len(),
    );
    for (handle, node) in graph.iter() {
        let _ = write!(
            out,
            "  [{}] {} : {} {}",
            handle.index(),
            kind_name(&node.kind),
            node.ty,
            node.shape,
        );
        if !node.inputs.is_empty() {
            let refs: Vec<String> = node
                .inputs
                .iter()
                .map(|h| format!("[{}]", h.index()))
                .collect();
            let _ = write!(out, " <- {}", refs.join(", "));
        }
        if let Some(name) = &node.name {
            let _ = write!(out, " \"{name}\"");
        }
        let _ = writeln!(out);
    }
    let params: Vec<String> = graph
        .parameters()
        .iter()
        .map(|h| format!("[{}]", h.index()))
        .collect();
    let results: Vec<String> = graph
        .results()
        .iter()
        .map(|h| format!("[{}]", h.index()))
        .collect();
    let _ = writeln!(out, "  parameters: {}", params.join(", "));
    let _ = writeln!(out, "  results: {}", results.join(", "));
    out
}
