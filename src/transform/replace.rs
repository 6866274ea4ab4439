//! Whole-subgraph copying and targeted tensor replacement
//!
//! Convenience drivers over [`Transformer`](super::Transformer):
//!
//! | Function | Effect |
//! |---|---|
//! | [`copy`] | Copy a subgraph view into a destination graph |
//! | [`copy_with_input_replacements`] | Copy, substituting mapped input tensors |
//! | [`graph_replace`] | Recompute target tensors as if mapped tensors had other values |
//!
//! [`graph_replace`] is the targeted-replacement algorithm: it isolates the
//! minimal operation set lying on a path from the replaced tensors to the
//! targets (following data and control edges both ways), copies exactly
//! that set with a substituting input handler, and maps each target
//! through the result. Targets untouched by any replacement pass through
//! unchanged.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{TransformError, TransformResult};
use crate::graph::{Graph, TensorId};
use crate::select::{get_walks_intersection_ops, ControlOutputs};
use crate::subgraph::SubgraphView;

use super::engine::Transformer;
use super::handlers::{keep_if_possible_handler, tensor_handler};
use super::result::ResultInfo;

/// Copy a subgraph view into a destination graph
///
/// Boundary inputs become placeholders; names are rebased from
/// `src_scope` to `dst_scope`. Copying onto the view's own graph is
/// allowed and duplicates the member operations.
pub fn copy(
    sgv: &SubgraphView,
    dst_graph: &Graph,
    dst_scope: &str,
    src_scope: &str,
    reuse_dst_scope: bool,
) -> TransformResult<(SubgraphView, ResultInfo)> {
    Transformer::new().call(sgv, dst_graph, dst_scope, src_scope, reuse_dst_scope)
}

/// Copy a subgraph view, substituting mapped boundary inputs
///
/// Boundary input tensors appearing as keys of `replacements` are replaced
/// by the mapped tensor (which must already live in the destination graph).
/// A replacement only happens for the view's boundary inputs; hidden inputs
/// and unmapped boundary inputs follow the keep-if-possible policy.
pub fn copy_with_input_replacements(
    sgv: &SubgraphView,
    replacements: &FxHashMap<TensorId, TensorId>,
    dst_graph: &Graph,
    dst_scope: &str,
    src_scope: &str,
    reuse_dst_scope: bool,
) -> TransformResult<(SubgraphView, ResultInfo)> {
    let mut transformer = Transformer::new();
    let external = replacements.clone();
    transformer.handlers.transform_external_input = tensor_handler(move |walk, t| {
        match external.get(&t) {
            Some(&replacement) => Ok(replacement),
            None => keep_if_possible_handler(walk, t),
        }
    });
    transformer.call(sgv, dst_graph, dst_scope, src_scope, reuse_dst_scope)
}

/// Recompute target tensors as if replaced tensors had other values
///
/// `replacements` maps original tensors to their stand-ins; `target_ts`
/// names the tensors whose recomputed counterparts are wanted. Only the
/// operations lying on a path from a replaced tensor to a target are
/// copied. Returns the recomputed counterpart of each target, in order;
/// targets with no dependency on any replaced tensor come back unchanged.
///
/// Fails with [`TransformError::DisconnectedRewrite`] when no target
/// depends on any replaced tensor, before any mutation of the graph.
pub fn graph_replace(
    graph: &Graph,
    target_ts: &[TensorId],
    replacements: &FxHashMap<TensorId, TensorId>,
    dst_scope: &str,
    src_scope: &str,
    reuse_dst_scope: bool,
) -> TransformResult<Vec<TensorId>> {
    for &t in target_ts {
        if !graph.contains_tensor(t) {
            return Err(TransformError::UnknownTensor(t.to_string()));
        }
    }
    for (&from, &to) in replacements {
        if !graph.contains_tensor(from) {
            return Err(TransformError::UnknownTensor(from.to_string()));
        }
        if !graph.contains_tensor(to) {
            return Err(TransformError::InvalidDestination(format!(
                "replacement tensor {} does not exist in the graph",
                to
            )));
        }
    }

    let replaced_ts: Vec<TensorId> = replacements.keys().copied().collect();
    let control_outputs = ControlOutputs::new(graph);
    let ops = get_walks_intersection_ops(graph, &replaced_ts, target_ts, Some(&control_outputs));
    if ops.is_empty() {
        return Err(TransformError::DisconnectedRewrite);
    }
    debug!(ops = ops.len(), targets = target_ts.len(), "graph_replace rewrite region");

    let sgv = SubgraphView::make_view(graph, ops)?;
    let (_, info) = copy_with_input_replacements(
        &sgv,
        replacements,
        graph,
        dst_scope,
        src_scope,
        reuse_dst_scope,
    )?;

    // targets outside the rewrite region fall through unchanged
    Ok(target_ts
        .iter()
        .map(|&t| info.transformed_tensor(t).unwrap_or(t))
        .collect())
}
