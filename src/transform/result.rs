//! Result mapping of a completed transformation
//!
//! [`ResultInfo`] snapshots the translation tables of one
//! [`Transformer::call`](super::Transformer::call) and answers the
//! bidirectional question: what did a given element become, and where did
//! a given element come from. [`ElemTree`] lifts those lookups over
//! nested element structures while preserving their shape.

use std::fmt;

use indexmap::IndexMap;

use crate::graph::{Element, Graph, OpId, TensorId};

use super::context::TransformContext;

/// Immutable mapping between a source subgraph and its transformed image
///
/// Forward lookups ([`transformed_op`](Self::transformed_op) and friends)
/// resolve source elements to their destination counterparts; `original_*`
/// lookups invert them. Elements the traversal never translated resolve to
/// `None`.
#[derive(Debug)]
pub struct ResultInfo {
    src_graph: Graph,
    dst_graph: Graph,
    src_scope: String,
    dst_scope: String,
    transformed_ops: IndexMap<OpId, OpId>,
    transformed_ts: IndexMap<TensorId, TensorId>,
}

impl ResultInfo {
    pub(crate) fn new(ctx: TransformContext) -> Self {
        Self {
            src_graph: ctx.src_graph,
            dst_graph: ctx.dst_graph,
            src_scope: ctx.src_scope,
            dst_scope: ctx.dst_scope,
            transformed_ops: ctx.transformed_ops,
            transformed_ts: ctx.transformed_ts,
        }
    }

    /// The graph the source subgraph lives in
    pub fn src_graph(&self) -> &Graph {
        &self.src_graph
    }

    /// The graph holding the transformed operations
    pub fn dst_graph(&self) -> &Graph {
        &self.dst_graph
    }

    /// The finalized source scope of the call
    pub fn src_scope(&self) -> &str {
        &self.src_scope
    }

    /// The finalized destination scope of the call
    ///
    /// When the call uniquified the requested scope, this is the scope
    /// actually used.
    pub fn dst_scope(&self) -> &str {
        &self.dst_scope
    }

    /// All (source, transformed) operation pairs, in translation order
    pub fn op_mapping(&self) -> impl Iterator<Item = (&OpId, &OpId)> {
        self.transformed_ops.iter()
    }

    /// All (source, transformed) tensor pairs, in translation order
    pub fn tensor_mapping(&self) -> impl Iterator<Item = (&TensorId, &TensorId)> {
        self.transformed_ts.iter()
    }

    // ========================================================================
    // Forward lookups: source element -> transformed element
    // ========================================================================

    /// The transformed counterpart of a source operation
    pub fn transformed_op(&self, op: OpId) -> Option<OpId> {
        self.transformed_ops.get(&op).copied()
    }

    /// The transformed counterpart of a source tensor
    pub fn transformed_tensor(&self, t: TensorId) -> Option<TensorId> {
        self.transformed_ts.get(&t).copied()
    }

    /// The transformed counterpart of a source element
    pub fn transformed(&self, elem: Element) -> Option<Element> {
        match elem {
            Element::Op(op) => self.transformed_op(op).map(Element::Op),
            Element::Tensor(t) => self.transformed_tensor(t).map(Element::Tensor),
        }
    }

    /// Look up the transformed counterpart of a source operation by name
    pub fn transformed_op_by_name(&self, name: &str) -> Option<OpId> {
        self.transformed_op(self.src_graph.find_op(name)?)
    }

    /// Look up the transformed counterpart of a source tensor by name
    ///
    /// Tensor names use the `op:slot` form.
    pub fn transformed_tensor_by_name(&self, name: &str) -> Option<TensorId> {
        self.transformed_tensor(parse_tensor_name(&self.src_graph, name)?)
    }

    // ========================================================================
    // Backward lookups: transformed element -> source element
    // ========================================================================

    /// The source operation a transformed operation came from
    ///
    /// Linear scan over the mapping; the first matching pair wins.
    pub fn original_op(&self, op: OpId) -> Option<OpId> {
        self.transformed_ops
            .iter()
            .find(|&(_, &dst)| dst == op)
            .map(|(&src, _)| src)
    }

    /// The source tensor a transformed tensor came from
    pub fn original_tensor(&self, t: TensorId) -> Option<TensorId> {
        self.transformed_ts
            .iter()
            .find(|&(_, &dst)| dst == t)
            .map(|(&src, _)| src)
    }

    /// The source element a transformed element came from
    pub fn original(&self, elem: Element) -> Option<Element> {
        match elem {
            Element::Op(op) => self.original_op(op).map(Element::Op),
            Element::Tensor(t) => self.original_tensor(t).map(Element::Tensor),
        }
    }

    /// Look up the source of a transformed operation by name
    pub fn original_op_by_name(&self, name: &str) -> Option<OpId> {
        self.original_op(self.dst_graph.find_op(name)?)
    }

    /// Look up the source of a transformed tensor by name
    pub fn original_tensor_by_name(&self, name: &str) -> Option<TensorId> {
        self.original_tensor(parse_tensor_name(&self.dst_graph, name)?)
    }

    // ========================================================================
    // Structured lookups
    // ========================================================================

    /// Map a nested element structure forward, preserving its shape
    ///
    /// Leaves without a translation become [`ElemTree::None`].
    pub fn transformed_tree(&self, tree: &ElemTree) -> ElemTree {
        tree.map(&mut |elem| self.transformed(elem))
    }

    /// Map a nested element structure backward, preserving its shape
    pub fn original_tree(&self, tree: &ElemTree) -> ElemTree {
        tree.map(&mut |elem| self.original(elem))
    }
}

impl fmt::Display for ResultInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let place = if Graph::same_graph(&self.src_graph, &self.dst_graph) {
            "in-place"
        } else {
            "cross-graph"
        };
        write!(
            f,
            "transform {place}: {} ops, {} tensors, scope {:?} -> {:?}",
            self.transformed_ops.len(),
            self.transformed_ts.len(),
            self.src_scope,
            self.dst_scope
        )
    }
}

/// A possibly nested structure of graph elements
///
/// Mirrors the shape of caller-side data (flat slices, nested lists) so a
/// whole structure can be mapped through a [`ResultInfo`] in one call
/// without flattening it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElemTree {
    /// An absent or untranslated leaf
    None,
    /// A single element
    Leaf(Element),
    /// An ordered list of subtrees
    List(Vec<ElemTree>),
}

impl ElemTree {
    /// Build a flat list tree from elements
    pub fn from_elements(elems: impl IntoIterator<Item = Element>) -> Self {
        ElemTree::List(elems.into_iter().map(ElemTree::Leaf).collect())
    }

    /// Apply `f` to every leaf, keeping the nesting structure intact
    pub fn map(&self, f: &mut impl FnMut(Element) -> Option<Element>) -> ElemTree {
        match self {
            ElemTree::None => ElemTree::None,
            ElemTree::Leaf(elem) => match f(*elem) {
                Some(mapped) => ElemTree::Leaf(mapped),
                None => ElemTree::None,
            },
            ElemTree::List(items) => {
                ElemTree::List(items.iter().map(|item| item.map(f)).collect())
            }
        }
    }
}

fn parse_tensor_name(graph: &Graph, name: &str) -> Option<TensorId> {
    let (op_name, slot) = name.rsplit_once(':')?;
    let slot: u32 = slot.parse().ok()?;
    let op = graph.find_op(op_name)?;
    let t = TensorId::new(op, slot);
    graph.contains_tensor(t).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DType, OpSpec};
    use crate::subgraph::SubgraphView;
    use crate::transform::Transformer;

    fn copied_pair() -> (Graph, Graph, ResultInfo) {
        let g = Graph::new();
        let x = g.create_op(OpSpec::new("a/x", "Source").outputs_of(1, DType::F32));
        let y = g.create_op(
            OpSpec::new("a/y", "Relu")
                .input(TensorId::new(x, 0))
                .outputs_of(1, DType::F32),
        );
        let sgv = SubgraphView::make_view(&g, [x, y]).unwrap();
        let dst = Graph::new();
        let (_, info) = Transformer::new().call(&sgv, &dst, "b", "a", true).unwrap();
        (g, dst, info)
    }

    #[test]
    fn test_lookups_roundtrip() {
        let (g, dst, info) = copied_pair();
        let y = g.find_op("a/y").unwrap();

        let y_copy = info.transformed_op(y).unwrap();
        assert_eq!(dst.op_name(y_copy), "b/y");
        assert_eq!(info.original_op(y_copy), Some(y));

        let t = TensorId::new(y, 0);
        let t_copy = info.transformed_tensor(t).unwrap();
        assert_eq!(info.original_tensor(t_copy), Some(t));
    }

    #[test]
    fn test_lookups_by_name() {
        let (_g, dst, info) = copied_pair();

        let y_copy = info.transformed_op_by_name("a/y").unwrap();
        assert_eq!(dst.op_name(y_copy), "b/y");
        assert_eq!(
            info.original_op_by_name("b/y"),
            info.src_graph().find_op("a/y")
        );

        let t_copy = info.transformed_tensor_by_name("a/y:0").unwrap();
        assert_eq!(dst.tensor_name(t_copy), "b/y:0");
        assert!(info.transformed_tensor_by_name("a/y:7").is_none());
        assert!(info.transformed_op_by_name("nope").is_none());
    }

    #[test]
    fn test_untranslated_resolves_to_none() {
        let (g, _dst, info) = copied_pair();
        let stranger = g.create_op(OpSpec::new("stranger", "Noop"));
        assert_eq!(info.transformed_op(stranger), None);
        assert_eq!(info.transformed(Element::Op(stranger)), None);
    }

    #[test]
    fn test_tree_mapping_preserves_shape() {
        let (g, _dst, info) = copied_pair();
        let x = g.find_op("a/x").unwrap();
        let stranger = g.create_op(OpSpec::new("stranger", "Noop"));

        let tree = ElemTree::List(vec![
            ElemTree::Leaf(Element::Op(x)),
            ElemTree::List(vec![
                ElemTree::Leaf(Element::Tensor(TensorId::new(x, 0))),
                ElemTree::Leaf(Element::Op(stranger)),
            ]),
            ElemTree::None,
        ]);

        let mapped = info.transformed_tree(&tree);
        let ElemTree::List(items) = &mapped else {
            panic!("shape not preserved")
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], ElemTree::Leaf(Element::Op(_))));
        let ElemTree::List(inner) = &items[1] else {
            panic!("nested shape not preserved")
        };
        assert!(matches!(inner[0], ElemTree::Leaf(Element::Tensor(_))));
        // untranslated leaf degrades to None in place
        assert_eq!(inner[1], ElemTree::None);
        assert_eq!(items[2], ElemTree::None);
    }

    #[test]
    fn test_display_summary() {
        let (_g, _dst, info) = copied_pair();
        let summary = info.to_string();
        assert!(summary.contains("cross-graph"));
        assert!(summary.contains("2 ops"));
    }

    #[test]
    fn test_debug_formatting() {
        let (_g, _dst, info) = copied_pair();
        // Result types containing ResultInfo must be debug-printable,
        // unwrap_err in tests depends on it
        let debugged = format!("{info:?}");
        assert!(debugged.contains("ResultInfo"));
    }
}
