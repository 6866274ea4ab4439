//! Graph mutation operations
//!
//! Node creation, edge rewiring, and collection upkeep. Every mutation goes
//! through the graph's exclusive borrow, so the consumer index and name
//! registry stay consistent with the op arena.

use super::core::Graph;
use super::elements::{ControlList, Element, OpId, OpSpec, Operation, TensorId, TensorInfo};

/// Operation type of placeholders created by
/// [`Graph::make_placeholder`]
pub const PLACEHOLDER_OP: &str = "Placeholder";

impl Graph {
    // ========================================================================
    // Node creation
    // ========================================================================

    /// Create a new operation from a spec
    ///
    /// The requested name is uniquified within this graph. Duplicate control
    /// inputs are dropped; input tensors must belong to this graph.
    pub fn create_op(&self, spec: OpSpec) -> OpId {
        let mut inner = self.inner.borrow_mut();
        let name = inner.unique_name(&spec.name);
        let id = OpId(inner.ops.len() as u32);

        let mut control_inputs = ControlList::new();
        for ci in spec.control_inputs {
            if !control_inputs.contains(&ci) {
                control_inputs.push(ci);
            }
        }

        for &input in &spec.inputs {
            inner.consumers.entry(input).or_default().push(id);
        }

        inner.op_by_name.insert(name.clone(), id);
        inner.ops.push(Operation {
            name,
            op_type: spec.op_type,
            inputs: spec.inputs.into_iter().collect(),
            control_inputs,
            attrs: spec.attrs,
            outputs: spec.outputs,
            original_op: spec.original_op,
            device: spec.device,
        });
        id
    }

    /// Create a placeholder standing in for an externally supplied value
    ///
    /// The placeholder has no inputs and a single output carrying `info`.
    /// Its name is the scope-prefixed `placeholder`, uniquified.
    pub fn make_placeholder(&self, info: TensorInfo, scope: &str) -> TensorId {
        let spec = OpSpec::new(format!("{scope}placeholder"), PLACEHOLDER_OP).output(info);
        TensorId::new(self.create_op(spec), 0)
    }

    /// Register a freshly created operation with the ambient context
    ///
    /// Adds the currently active control dependencies as control inputs and,
    /// if the op has no device yet, the currently active device.
    pub fn apply_ambient(&self, op: OpId) {
        for dep in self.active_control_inputs() {
            self.add_control_input(op, dep);
        }
        if self.op_device(op).is_none() {
            if let Some(device) = self.active_device() {
                self.set_op_device(op, Some(device));
            }
        }
    }

    // ========================================================================
    // Edge rewiring
    // ========================================================================

    /// Redirect all consumers of tensor `old` to tensor `new`
    ///
    /// Returns the number of input slots rewired. A no-op when the two ids
    /// are equal.
    pub fn reroute_consumers(&self, old: TensorId, new: TensorId) -> usize {
        if old == new {
            return 0;
        }
        let mut inner = self.inner.borrow_mut();
        let consumers = inner.consumers.remove(&old).unwrap_or_default();
        let mut rewired = 0;
        for &c in &consumers {
            for slot in inner.ops[c.index()].inputs.iter_mut() {
                if *slot == old {
                    *slot = new;
                    rewired += 1;
                }
            }
        }
        if !consumers.is_empty() {
            inner.consumers.entry(new).or_default().extend(consumers);
        }
        rewired
    }

    /// Replace a single data input of an operation
    ///
    /// Returns false when the index is out of range.
    pub fn replace_op_input(&self, op: OpId, index: usize, new: TensorId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(slot) = inner.ops[op.index()].inputs.get_mut(index) else {
            return false;
        };
        let old = std::mem::replace(slot, new);
        if old == new {
            return true;
        }
        if let Some(consumers) = inner.consumers.get_mut(&old) {
            if let Some(pos) = consumers.iter().position(|&c| c == op) {
                consumers.remove(pos);
            }
        }
        inner.consumers.entry(new).or_default().push(op);
        true
    }

    /// Add a control-only input to an operation
    ///
    /// Self references and duplicates are ignored.
    pub fn add_control_input(&self, op: OpId, control: OpId) {
        if op == control {
            return;
        }
        let mut inner = self.inner.borrow_mut();
        let entry = &mut inner.ops[op.index()].control_inputs;
        if !entry.contains(&control) {
            entry.push(control);
        }
    }

    /// Set or clear an operation's device placement
    pub fn set_op_device(&self, op: OpId, device: Option<String>) {
        self.inner.borrow_mut().ops[op.index()].device = device;
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Add an element to a named collection, creating it if needed
    pub fn add_to_collection(&self, name: &str, elem: Element) {
        self.inner
            .borrow_mut()
            .collections
            .entry(name.to_string())
            .or_default()
            .push(elem);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DType, OpSpec, TensorInfo};

    fn make_chain() -> (Graph, OpId, OpId, OpId) {
        let g = Graph::new();
        let x = g.create_op(OpSpec::new("x", "Source").outputs_of(1, DType::F32));
        let a = g.create_op(
            OpSpec::new("a", "Relu")
                .input(TensorId::new(x, 0))
                .outputs_of(1, DType::F32),
        );
        let b = g.create_op(
            OpSpec::new("b", "Neg")
                .input(TensorId::new(x, 0))
                .outputs_of(1, DType::F32),
        );
        (g, x, a, b)
    }

    #[test]
    fn test_create_op_uniquifies_name() {
        let g = Graph::new();
        let first = g.create_op(OpSpec::new("n", "A").outputs_of(1, DType::F32));
        let second = g.create_op(OpSpec::new("n", "A").outputs_of(1, DType::F32));

        assert_eq!(g.op_name(first), "n");
        assert_eq!(g.op_name(second), "n_1");
        assert_eq!(g.find_op("n_1"), Some(second));
    }

    #[test]
    fn test_create_op_dedups_control_inputs() {
        let g = Graph::new();
        let x = g.create_op(OpSpec::new("x", "Source").outputs_of(1, DType::F32));
        let y = g.create_op(
            OpSpec::new("y", "Noop")
                .control_input(x)
                .control_input(x),
        );
        assert_eq!(g.op_control_inputs(y).as_slice(), &[x]);
    }

    #[test]
    fn test_make_placeholder() {
        let g = Graph::new();
        let t = g.make_placeholder(TensorInfo::new(DType::I64, &[4]), "b/");
        assert_eq!(g.op_type(t.op), PLACEHOLDER_OP);
        assert_eq!(g.op_name(t.op), "b/placeholder");
        assert_eq!(g.tensor_info(t), TensorInfo::new(DType::I64, &[4]));
    }

    #[test]
    fn test_reroute_consumers() {
        let (g, x, a, b) = make_chain();
        let old = TensorId::new(x, 0);
        let replacement = g.make_placeholder(TensorInfo::unknown(DType::F32), "");

        let rewired = g.reroute_consumers(old, replacement);
        assert_eq!(rewired, 2);
        assert_eq!(g.op_inputs(a).as_slice(), &[replacement]);
        assert_eq!(g.op_inputs(b).as_slice(), &[replacement]);
        assert!(g.consumers(old).is_empty());
        let mut consumers = g.consumers(replacement).to_vec();
        consumers.sort();
        assert_eq!(consumers, vec![a, b]);
    }

    #[test]
    fn test_replace_op_input() {
        let (g, x, a, _) = make_chain();
        let old = TensorId::new(x, 0);
        let replacement = g.make_placeholder(TensorInfo::unknown(DType::F32), "");

        assert!(g.replace_op_input(a, 0, replacement));
        assert!(!g.replace_op_input(a, 5, replacement));
        assert_eq!(g.op_inputs(a).as_slice(), &[replacement]);
        // the other consumer of x:0 is untouched
        assert_eq!(g.consumers(old).len(), 1);
    }

    #[test]
    fn test_apply_ambient() {
        let g = Graph::new();
        let dep = g.create_op(OpSpec::new("dep", "Noop"));
        g.push_control_dependencies(vec![dep]);
        g.push_device(Some("npu:0".to_string()));

        let op = g.create_op(OpSpec::new("op", "Noop"));
        g.apply_ambient(op);

        assert_eq!(g.op_control_inputs(op).as_slice(), &[dep]);
        assert_eq!(g.op_device(op), Some("npu:0".to_string()));

        // an explicit device is not overridden
        let pinned = g.create_op(OpSpec::new("pinned", "Noop").device("cpu:0"));
        g.apply_ambient(pinned);
        assert_eq!(g.op_device(pinned), Some("cpu:0".to_string()));
    }
}
