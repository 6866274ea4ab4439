//! Per-call transformation state
//!
//! A [`TransformContext`] lives for exactly one
//! [`Transformer::call`](super::Transformer::call): created at entry,
//! packaged into a [`ResultInfo`](super::ResultInfo) at exit, never reused.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::graph::{Graph, OpId, TensorId};
use crate::subgraph::SubgraphView;

/// Mutable state of one transformation call
///
/// Holds the two translation tables (original → transformed, filled
/// monotonically; an element is translated at most once per call), the
/// finalized scope prefixes, and the source/destination graph handles.
/// Handlers receive it through [`Walk`](super::Walk).
pub struct TransformContext {
    /// Graph the subgraph view is carved out of
    pub src_graph: Graph,
    /// Graph receiving the transformed operations
    pub dst_graph: Graph,
    /// Finalized source scope prefix (empty means the whole graph)
    pub src_scope: String,
    /// Finalized destination scope prefix
    pub dst_scope: String,
    /// The originating subgraph view
    pub sgv: SubgraphView,
    /// Operation translation table, in translation order
    pub transformed_ops: IndexMap<OpId, OpId>,
    /// Tensor translation table, in translation order
    pub transformed_ts: IndexMap<TensorId, TensorId>,
    pub(crate) sgv_inputs: FxHashSet<TensorId>,
    pub(crate) member_ops: FxHashSet<OpId>,
    /// Deferred control links: (source op, source control input)
    pub(crate) pending_control: Vec<(OpId, OpId)>,
}

impl TransformContext {
    pub(crate) fn new(
        sgv: SubgraphView,
        dst_graph: Graph,
        src_scope: String,
        dst_scope: String,
    ) -> Self {
        let sgv_inputs = sgv.inputs().iter().copied().collect();
        let member_ops = sgv.ops().collect();
        let src_graph = sgv.graph().clone();
        Self {
            src_graph,
            dst_graph,
            src_scope,
            dst_scope,
            sgv,
            transformed_ops: IndexMap::new(),
            transformed_ts: IndexMap::new(),
            sgv_inputs,
            member_ops,
            pending_control: Vec::new(),
        }
    }

    /// Whether source and destination are the same graph (in-place editing)
    pub fn same_graph(&self) -> bool {
        Graph::same_graph(&self.src_graph, &self.dst_graph)
    }

    /// Whether the operation is a member of the subgraph being transformed
    pub fn is_member(&self, op: OpId) -> bool {
        self.member_ops.contains(&op)
    }

    /// Whether the tensor is one of the view's declared boundary inputs
    pub fn is_boundary_input(&self, t: TensorId) -> bool {
        self.sgv_inputs.contains(&t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DType, OpSpec, TensorId};

    #[test]
    fn test_context_membership() {
        let g = Graph::new();
        let x = g.create_op(OpSpec::new("x", "Source").outputs_of(1, DType::F32));
        let y = g.create_op(
            OpSpec::new("y", "Relu")
                .input(TensorId::new(x, 0))
                .outputs_of(1, DType::F32),
        );

        let sgv = SubgraphView::make_view(&g, [y]).unwrap();
        let ctx = TransformContext::new(sgv, g.clone(), String::new(), "b/".to_string());

        assert!(ctx.same_graph());
        assert!(ctx.is_member(y));
        assert!(!ctx.is_member(x));
        assert!(ctx.is_boundary_input(TensorId::new(x, 0)));
        assert!(!ctx.is_boundary_input(TensorId::new(y, 0)));
    }
}
