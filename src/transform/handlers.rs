//! Replaceable transformation policies
//!
//! A [`TransformHandlers`] record bundles the extension points of the
//! engine, one boxed function per situation. The defaults implement a
//! plain subgraph copy: operations are deep-cloned, boundary inputs become
//! placeholders, hidden inputs are kept when editing the same graph, and
//! collection membership follows the scope-renaming rule. Callers replace
//! individual entries to customize a [`Transformer`](super::Transformer);
//! see [`copy_with_input_replacements`](super::copy_with_input_replacements)
//! for the canonical example.

use crate::error::TransformResult;
use crate::graph::{Element, OpId, OpSpec, TensorId};

use super::engine::Walk;

/// Policy decision for one control-only input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLink {
    /// Attach the given operation as the control input
    Keep(OpId),
    /// Drop the control edge
    Drop,
    /// Resolve the edge from the translation table after the traversal
    ///
    /// Control edges may close cycles, so they are never followed as a
    /// translation dependency; deferring re-links them once (and if) the
    /// referenced operation has been translated.
    Defer,
}

/// Handler translating one operation
pub type OpHandlerFn = Box<dyn Fn(&mut Walk<'_>, OpId) -> TransformResult<OpId>>;
/// Handler translating one boundary or hidden input tensor
pub type TensorHandlerFn = Box<dyn Fn(&mut Walk<'_>, TensorId) -> TransformResult<TensorId>>;
/// Handler deciding the fate of one control-only input
pub type ControlHandlerFn = Box<dyn Fn(&mut Walk<'_>, OpId) -> TransformResult<ControlLink>>;
/// Handler translating an optional auxiliary op link (provenance backlink)
pub type OpLinkHandlerFn = Box<dyn Fn(&mut Walk<'_>, OpId) -> TransformResult<Option<OpId>>>;
/// Handler propagating collection membership to a translated element
pub type CollectionsHandlerFn =
    Box<dyn Fn(&mut Walk<'_>, Element, Element) -> TransformResult<()>>;

/// Box a tensor handler closure
///
/// Plain helper that pins down the higher-ranked signature, so closures
/// capturing state (replacement maps, counters) coerce cleanly.
pub fn tensor_handler(
    f: impl for<'w> Fn(&mut Walk<'w>, TensorId) -> TransformResult<TensorId> + 'static,
) -> TensorHandlerFn {
    Box::new(f)
}

/// Box an operation handler closure
pub fn op_handler(
    f: impl for<'w> Fn(&mut Walk<'w>, OpId) -> TransformResult<OpId> + 'static,
) -> OpHandlerFn {
    Box::new(f)
}

/// The replaceable policies of one [`Transformer`](super::Transformer)
///
/// | Handler | Default |
/// |---|---|
/// | `transform_op` | [`copy_op_handler`] |
/// | `transform_external_input` | [`replace_with_placeholder_handler`] |
/// | `transform_hidden_input` | [`keep_if_possible_handler`] |
/// | `transform_control_input` | [`defer_control_input_handler`] (keep-if-possible) |
/// | `transform_original_op` | [`transform_op_if_inside_handler`] (keep-if-possible) |
/// | `assign_collections` | [`assign_renamed_collections_handler`] |
pub struct TransformHandlers {
    /// Translates a member operation into the destination graph
    pub transform_op: OpHandlerFn,
    /// Translates a declared boundary input tensor
    pub transform_external_input: TensorHandlerFn,
    /// Translates a hidden (non-boundary, non-member) input tensor
    pub transform_hidden_input: TensorHandlerFn,
    /// Decides the fate of each control-only input
    pub transform_control_input: ControlHandlerFn,
    /// Translates the provenance backlink of a copied operation
    pub transform_original_op: OpLinkHandlerFn,
    /// Propagates collection membership to translated elements
    pub assign_collections: CollectionsHandlerFn,
}

impl Default for TransformHandlers {
    fn default() -> Self {
        fn control_default(walk: &mut Walk<'_>, op: OpId) -> TransformResult<ControlLink> {
            defer_control_input_handler(walk, op, true)
        }
        fn original_default(walk: &mut Walk<'_>, op: OpId) -> TransformResult<Option<OpId>> {
            transform_op_if_inside_handler(walk, op, true)
        }
        Self {
            transform_op: Box::new(copy_op_handler),
            transform_external_input: Box::new(replace_with_placeholder_handler),
            transform_hidden_input: Box::new(keep_if_possible_handler),
            transform_control_input: Box::new(control_default),
            transform_original_op: Box::new(original_default),
            assign_collections: Box::new(assign_renamed_collections_handler),
        }
    }
}

/// Materialize a placeholder standing in for a boundary input
///
/// The placeholder is created in the destination graph under the
/// destination scope, carrying the source tensor's type and shape. This is
/// what makes a copied subgraph independently invocable.
pub fn replace_with_placeholder_handler(
    walk: &mut Walk<'_>,
    t: TensorId,
) -> TransformResult<TensorId> {
    let info = walk.ctx.src_graph.tensor_info(t);
    let scope = walk.ctx.dst_scope.clone();
    Ok(walk.ctx.dst_graph.make_placeholder(info, &scope))
}

/// Keep a tensor unchanged when editing in place, else fall back to a
/// placeholder
///
/// The default policy for hidden inputs: when source and destination are
/// the same graph there is no need for a stand-in.
pub fn keep_if_possible_handler(walk: &mut Walk<'_>, t: TensorId) -> TransformResult<TensorId> {
    if walk.ctx.same_graph() {
        Ok(t)
    } else {
        replace_with_placeholder_handler(walk, t)
    }
}

/// Default control-input policy
///
/// Member control inputs are deferred and re-linked from the translation
/// table after the traversal passes; non-member control inputs are kept
/// as-is when editing in place (and `keep_if_possible` holds), otherwise
/// dropped.
pub fn defer_control_input_handler(
    walk: &mut Walk<'_>,
    op: OpId,
    keep_if_possible: bool,
) -> TransformResult<ControlLink> {
    if walk.ctx.is_member(op) {
        Ok(ControlLink::Defer)
    } else if keep_if_possible && walk.ctx.same_graph() {
        Ok(ControlLink::Keep(op))
    } else {
        Ok(ControlLink::Drop)
    }
}

/// Translate an auxiliary op link only if it is inside the subgraph
///
/// Member links are translated (recursively, through the memo table);
/// non-member links are kept unchanged when editing in place (and
/// `keep_if_possible` holds), otherwise dropped. A stale cross-graph
/// provenance reference is worse than none.
pub fn transform_op_if_inside_handler(
    walk: &mut Walk<'_>,
    op: OpId,
    keep_if_possible: bool,
) -> TransformResult<Option<OpId>> {
    if walk.ctx.is_member(op) {
        Ok(Some(walk.transform_op(op)?))
    } else if keep_if_possible && walk.ctx.same_graph() {
        Ok(Some(op))
    } else {
        Ok(None)
    }
}

/// Add the translated element to the renamed counterparts of the original
/// element's collections
///
/// Each collection name goes through the same scope-renaming rule as
/// operation names, so membership in `losses` under destination scope
/// `b/` lands in `b/losses`.
pub fn assign_renamed_collections_handler(
    walk: &mut Walk<'_>,
    elem: Element,
    translated: Element,
) -> TransformResult<()> {
    for name in walk.ctx.src_graph.collections_of(elem) {
        let renamed = walk.new_name(&name)?;
        walk.ctx.dst_graph.add_to_collection(&renamed, translated);
    }
    Ok(())
}

/// Deep-copy one operation into the destination graph
///
/// Recursively translates data inputs, applies the control-input and
/// original-op policies, clones the static definition, renames per scope,
/// and creates the copy with per-slot shape metadata carried over. The
/// destination graph uniquifies the new name.
pub fn copy_op_handler(walk: &mut Walk<'_>, op: OpId) -> TransformResult<OpId> {
    let src = walk.ctx.src_graph.clone();
    let handlers = walk.handlers;

    let mut control_inputs = Vec::new();
    for ci in src.op_control_inputs(op) {
        match (handlers.transform_control_input)(walk, ci)? {
            ControlLink::Keep(ci_new) => control_inputs.push(ci_new),
            ControlLink::Drop => {}
            ControlLink::Defer => walk.defer_control(op, ci),
        }
    }

    let original_op = match src.op_original(op) {
        Some(orig) => (handlers.transform_original_op)(walk, orig)?,
        None => None,
    };

    let mut inputs = Vec::new();
    for t in src.op_inputs(op) {
        inputs.push(walk.transform_tensor(t)?);
    }

    let name = walk.new_name(&src.op_name(op))?;
    let outputs = src
        .op_outputs(op)
        .iter()
        .map(|&t| src.tensor_info(t))
        .collect();

    let spec = OpSpec {
        name,
        op_type: src.op_type(op),
        inputs,
        control_inputs,
        attrs: src.op_attrs(op),
        outputs,
        original_op,
        device: src.op_device(op),
    };
    Ok(walk.ctx.dst_graph.create_op(spec))
}

/// Transform an operation in place
///
/// The degenerate no-copy mode: the operation's inputs are retranslated
/// and every changed input edge is rerouted on the live graph. No new
/// operation is created. With `detach_outputs`, consumers of the
/// operation's outputs are first rerouted to fresh placeholders, leaving
/// the outputs free for the caller to reconnect.
///
/// Only meaningful when source and destination are the same graph.
pub fn transform_op_in_place(
    walk: &mut Walk<'_>,
    op: OpId,
    detach_outputs: bool,
) -> TransformResult<OpId> {
    let graph = walk.ctx.dst_graph.clone();

    let old_inputs = walk.ctx.src_graph.op_inputs(op);
    let mut new_inputs = Vec::with_capacity(old_inputs.len());
    for &t in &old_inputs {
        new_inputs.push(walk.transform_tensor(t)?);
    }
    // every consumer of a changed input tensor is redirected, not just `op`
    for (&old, &new) in old_inputs.iter().zip(&new_inputs) {
        if old != new {
            graph.reroute_consumers(old, new);
        }
    }

    if detach_outputs {
        let scope = walk.ctx.dst_scope.clone();
        for t in walk.ctx.src_graph.op_outputs(op) {
            if graph.consumers(t).is_empty() {
                continue;
            }
            let info = graph.tensor_info(t);
            let stand_in = graph.make_placeholder(info, &scope);
            graph.reroute_consumers(t, stand_in);
        }
    }

    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DType, Graph, OpSpec, TensorId, PLACEHOLDER_OP};
    use crate::subgraph::SubgraphView;
    use crate::transform::Transformer;

    /// p -> x -> out, q available as a replacement for p:0
    fn make_test_graph() -> (Graph, OpId, OpId, OpId) {
        let g = Graph::new();
        let p = g.create_op(OpSpec::new("p", "Source").outputs_of(1, DType::F32));
        let q = g.create_op(OpSpec::new("q", "Source").outputs_of(1, DType::F32));
        let x = g.create_op(
            OpSpec::new("x", "Relu")
                .input(TensorId::new(p, 0))
                .outputs_of(1, DType::F32),
        );
        (g, p, q, x)
    }

    #[test]
    fn test_in_place_rewires_changed_inputs() {
        let (g, p, q, x) = make_test_graph();
        let sgv = SubgraphView::make_view(&g, [x]).unwrap();

        let mut tr = Transformer::new();
        let replacement = TensorId::new(q, 0);
        tr.handlers.transform_external_input =
            tensor_handler(move |_walk, _t| Ok(replacement));
        tr.handlers.transform_op = op_handler(|walk, op| transform_op_in_place(walk, op, false));

        let (_, info) = tr.call(&sgv, &g, "", "", true).unwrap();

        // no copy was made; x now consumes q:0 instead of p:0
        assert_eq!(info.transformed_op(x), Some(x));
        assert_eq!(g.op_inputs(x).as_slice(), &[TensorId::new(q, 0)]);
        assert!(g.consumers(TensorId::new(p, 0)).is_empty());
    }

    #[test]
    fn test_in_place_reroute_covers_all_consumers() {
        let (g, p, q, x) = make_test_graph();
        let other = g.create_op(
            OpSpec::new("other", "Abs")
                .input(TensorId::new(p, 0))
                .outputs_of(1, DType::F32),
        );
        let sgv = SubgraphView::make_view(&g, [x]).unwrap();

        let mut tr = Transformer::new();
        let replacement = TensorId::new(q, 0);
        tr.handlers.transform_external_input =
            tensor_handler(move |_walk, _t| Ok(replacement));
        tr.handlers.transform_op = op_handler(|walk, op| transform_op_in_place(walk, op, false));
        tr.call(&sgv, &g, "", "", true).unwrap();

        // rerouting a changed input moves every consumer of the old tensor,
        // including ops outside the transformed view
        assert_eq!(g.op_inputs(other).as_slice(), &[TensorId::new(q, 0)]);
        assert!(g.consumers(TensorId::new(p, 0)).is_empty());
    }

    #[test]
    fn test_in_place_detach_outputs() {
        let (g, _p, _q, x) = make_test_graph();
        let out = g.create_op(
            OpSpec::new("out", "Abs")
                .input(TensorId::new(x, 0))
                .outputs_of(1, DType::F32),
        );
        let sgv = SubgraphView::make_view(&g, [x]).unwrap();

        let mut tr = Transformer::new();
        tr.handlers.transform_op = op_handler(|walk, op| transform_op_in_place(walk, op, true));
        tr.call(&sgv, &g, "", "", true).unwrap();

        // out now consumes a placeholder instead of x:0
        assert!(g.consumers(TensorId::new(x, 0)).is_empty());
        let new_input = g.op_inputs(out)[0];
        assert_eq!(g.op_type(new_input.op), PLACEHOLDER_OP);
    }

    #[test]
    fn test_keep_if_possible_cross_graph_makes_placeholder() {
        let (g, _p, _q, x) = make_test_graph();
        let dst = Graph::new();
        let sgv = SubgraphView::make_view(&g, [x]).unwrap();

        // hidden-input fallback applies to boundary inputs here too
        let mut tr = Transformer::new();
        tr.handlers.transform_external_input = Box::new(keep_if_possible_handler);
        let (sgv_, _) = tr.call(&sgv, &dst, "", "", true).unwrap();

        assert_eq!(sgv_.inputs().len(), 1);
        assert_eq!(dst.op_type(sgv_.inputs()[0].op), PLACEHOLDER_OP);
    }
}
