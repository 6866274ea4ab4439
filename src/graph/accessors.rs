//! Read-side graph API
//!
//! All accessors take an id and return owned data, so no borrow of the
//! underlying storage outlives a call. Ids must come from this graph;
//! passing an id minted by another graph aliases an unrelated operation.

use smallvec::SmallVec;

use indexmap::IndexMap;

use super::core::Graph;
use super::elements::{AttrValue, Element, OpId, Operation, TensorId, TensorInfo};

impl Graph {
    // ========================================================================
    // Op accessors
    // ========================================================================

    /// Number of operations in the graph
    pub fn op_count(&self) -> usize {
        self.inner.borrow().ops.len()
    }

    /// All operation ids, in creation order
    pub fn ops(&self) -> Vec<OpId> {
        (0..self.op_count() as u32).map(OpId).collect()
    }

    /// Whether the id resolves in this graph
    pub fn contains_op(&self, op: OpId) -> bool {
        op.index() < self.op_count()
    }

    fn with_op<R>(&self, op: OpId, f: impl FnOnce(&Operation) -> R) -> R {
        let inner = self.inner.borrow();
        f(&inner.ops[op.index()])
    }

    /// Name of an operation
    pub fn op_name(&self, op: OpId) -> String {
        self.with_op(op, |o| o.name.clone())
    }

    /// Type string of an operation
    pub fn op_type(&self, op: OpId) -> String {
        self.with_op(op, |o| o.op_type.clone())
    }

    /// Device placement of an operation, if set
    pub fn op_device(&self, op: OpId) -> Option<String> {
        self.with_op(op, |o| o.device.clone())
    }

    /// Ordered data inputs of an operation
    pub fn op_inputs(&self, op: OpId) -> SmallVec<[TensorId; 4]> {
        self.with_op(op, |o| o.inputs.clone())
    }

    /// Control-only predecessor operations
    pub fn op_control_inputs(&self, op: OpId) -> SmallVec<[OpId; 2]> {
        self.with_op(op, |o| o.control_inputs.clone())
    }

    /// Number of output slots of an operation
    pub fn op_output_count(&self, op: OpId) -> usize {
        self.with_op(op, |o| o.outputs.len())
    }

    /// All output tensors of an operation, in slot order
    pub fn op_outputs(&self, op: OpId) -> SmallVec<[TensorId; 4]> {
        (0..self.op_output_count(op) as u32)
            .map(|slot| TensorId::new(op, slot))
            .collect()
    }

    /// Clone of an operation's attribute map
    pub fn op_attrs(&self, op: OpId) -> IndexMap<String, AttrValue> {
        self.with_op(op, |o| o.attrs.clone())
    }

    /// A single attribute of an operation
    pub fn op_attr(&self, op: OpId, key: &str) -> Option<AttrValue> {
        self.with_op(op, |o| o.attrs.get(key).cloned())
    }

    /// Provenance backlink of an operation, if any
    pub fn op_original(&self, op: OpId) -> Option<OpId> {
        self.with_op(op, |o| o.original_op)
    }

    /// Look up an operation by exact name
    pub fn find_op(&self, name: &str) -> Option<OpId> {
        self.inner.borrow().op_by_name.get(name).copied()
    }

    // ========================================================================
    // Tensor accessors
    // ========================================================================

    /// Whether the tensor id resolves in this graph
    pub fn contains_tensor(&self, t: TensorId) -> bool {
        self.contains_op(t.op) && (t.slot as usize) < self.op_output_count(t.op)
    }

    /// Static metadata of a tensor
    pub fn tensor_info(&self, t: TensorId) -> TensorInfo {
        self.with_op(t.op, |o| o.outputs[t.slot as usize].clone())
    }

    /// Canonical tensor name: `producer_name:slot`
    pub fn tensor_name(&self, t: TensorId) -> String {
        format!("{}:{}", self.op_name(t.op), t.slot)
    }

    /// Operations consuming a tensor, in edge-creation order
    pub fn consumers(&self, t: TensorId) -> SmallVec<[OpId; 4]> {
        self.inner
            .borrow()
            .consumers
            .get(&t)
            .cloned()
            .unwrap_or_default()
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Names of all collections containing the element
    pub fn collections_of(&self, elem: Element) -> Vec<String> {
        let inner = self.inner.borrow();
        inner
            .collections
            .iter()
            .filter(|(_, members)| members.contains(&elem))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Members of a named collection, empty if absent
    pub fn collection(&self, name: &str) -> Vec<Element> {
        self.inner
            .borrow()
            .collections
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// All collection names, in creation order
    pub fn collection_names(&self) -> Vec<String> {
        self.inner.borrow().collections.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{AttrValue, DType, Element, Graph, OpSpec, TensorId, TensorInfo};

    fn make_test_graph() -> (Graph, crate::graph::OpId, crate::graph::OpId) {
        let g = Graph::new();
        let x = g.create_op(
            OpSpec::new("x", "Source").output(TensorInfo::new(DType::F32, &[2, 3])),
        );
        let relu = g.create_op(
            OpSpec::new("relu", "Relu")
                .input(TensorId::new(x, 0))
                .attr("alpha", AttrValue::Float(0.0))
                .outputs_of(1, DType::F32),
        );
        (g, x, relu)
    }

    #[test]
    fn test_op_accessors() {
        let (g, x, relu) = make_test_graph();

        assert_eq!(g.op_count(), 2);
        assert_eq!(g.op_name(relu), "relu");
        assert_eq!(g.op_type(relu), "Relu");
        assert_eq!(g.op_inputs(relu).as_slice(), &[TensorId::new(x, 0)]);
        assert_eq!(g.op_attr(relu, "alpha"), Some(AttrValue::Float(0.0)));
        assert_eq!(g.find_op("relu"), Some(relu));
        assert_eq!(g.find_op("missing"), None);
    }

    #[test]
    fn test_tensor_accessors() {
        let (g, x, relu) = make_test_graph();
        let t = TensorId::new(x, 0);

        assert!(g.contains_tensor(t));
        assert!(!g.contains_tensor(TensorId::new(x, 1)));
        assert_eq!(g.tensor_name(t), "x:0");
        assert_eq!(g.tensor_info(t), TensorInfo::new(DType::F32, &[2, 3]));
        assert_eq!(g.consumers(t).as_slice(), &[relu]);
        assert!(g.consumers(TensorId::new(relu, 0)).is_empty());
    }

    #[test]
    fn test_collections_of() {
        let (g, x, _) = make_test_graph();
        g.add_to_collection("sources", Element::Op(x));
        g.add_to_collection("all", Element::Op(x));

        assert_eq!(g.collections_of(Element::Op(x)), vec!["sources", "all"]);
        assert_eq!(g.collection("sources"), vec![Element::Op(x)]);
        assert!(g.collection("missing").is_empty());
    }
}
