//! Subgraph views
//!
//! A [`SubgraphView`] is an explicit, ordered selection carved out of a
//! graph: a set of member operations plus ordered boundary input and output
//! tensors. It is a view, not an owning container. Operations may be
//! members of several overlapping views at once.
//!
//! Boundary invariant: every boundary input is a tensor consumed by a
//! member operation but produced outside the view; every boundary output
//! is produced by a member operation.

use indexmap::IndexSet;

use crate::error::{TransformError, TransformResult};
use crate::graph::{Graph, OpId, TensorId};

/// An explicit operation set plus ordered boundary input/output tensors
#[derive(Clone, Debug)]
pub struct SubgraphView {
    graph: Graph,
    ops: IndexSet<OpId>,
    inputs: Vec<TensorId>,
    outputs: Vec<TensorId>,
}

impl SubgraphView {
    /// Build a view over the given operations with inferred boundaries
    ///
    /// Boundary inputs are the tensors consumed by member ops but produced
    /// outside, in first-encounter order, deduplicated. Boundary outputs are
    /// every tensor produced by a member op, in op then slot order, so each
    /// produced tensor has a stable index for positional remapping.
    pub fn make_view(graph: &Graph, ops: impl IntoIterator<Item = OpId>) -> TransformResult<Self> {
        let mut members: IndexSet<OpId> = IndexSet::new();
        for op in ops {
            if !graph.contains_op(op) {
                return Err(TransformError::UnknownOp(op.to_string()));
            }
            members.insert(op);
        }

        let mut inputs: IndexSet<TensorId> = IndexSet::new();
        let mut outputs = Vec::new();
        for &op in &members {
            for t in graph.op_inputs(op) {
                if !members.contains(&t.op) {
                    inputs.insert(t);
                }
            }
            outputs.extend(graph.op_outputs(op));
        }

        Ok(Self {
            graph: graph.clone(),
            ops: members,
            inputs: inputs.into_iter().collect(),
            outputs,
        })
    }

    /// Build a view with explicit, ordered boundary tensors
    ///
    /// Validates the boundary invariant: inputs must be consumed by a member
    /// and produced outside; outputs must be produced by a member.
    pub fn with_boundaries(
        graph: &Graph,
        ops: impl IntoIterator<Item = OpId>,
        inputs: Vec<TensorId>,
        outputs: Vec<TensorId>,
    ) -> TransformResult<Self> {
        let view = Self::make_view(graph, ops)?;

        for &t in &inputs {
            if !graph.contains_tensor(t) {
                return Err(TransformError::UnknownTensor(t.to_string()));
            }
            if view.ops.contains(&t.op) {
                return Err(TransformError::InvalidView(format!(
                    "boundary input {} is produced inside the view",
                    graph.tensor_name(t)
                )));
            }
            let consumed = graph.consumers(t).iter().any(|c| view.ops.contains(c));
            if !consumed {
                return Err(TransformError::InvalidView(format!(
                    "boundary input {} is not consumed by any member op",
                    graph.tensor_name(t)
                )));
            }
        }
        for &t in &outputs {
            if !graph.contains_tensor(t) {
                return Err(TransformError::UnknownTensor(t.to_string()));
            }
            if !view.ops.contains(&t.op) {
                return Err(TransformError::InvalidView(format!(
                    "boundary output {} is not produced by a member op",
                    graph.tensor_name(t)
                )));
            }
        }

        Ok(Self {
            inputs,
            outputs,
            ..view
        })
    }

    /// The graph this view is carved out of
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Member operations, in selection order
    pub fn ops(&self) -> impl Iterator<Item = OpId> + '_ {
        self.ops.iter().copied()
    }

    /// Number of member operations
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Whether the view has no members
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Whether the operation is a member of this view
    pub fn contains(&self, op: OpId) -> bool {
        self.ops.contains(&op)
    }

    /// Ordered boundary input tensors
    pub fn inputs(&self) -> &[TensorId] {
        &self.inputs
    }

    /// Ordered boundary output tensors
    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    /// Position of a tensor in the boundary input list
    pub fn input_index(&self, t: TensorId) -> Option<usize> {
        self.inputs.iter().position(|&i| i == t)
    }

    /// Position of a tensor in the boundary output list
    pub fn output_index(&self, t: TensorId) -> Option<usize> {
        self.outputs.iter().position(|&o| o == t)
    }

    /// Narrow and reorder the boundaries by index into the current lists
    ///
    /// Indices out of range are silently dropped.
    pub fn remap(&self, input_indices: &[usize], output_indices: &[usize]) -> Self {
        Self {
            graph: self.graph.clone(),
            ops: self.ops.clone(),
            inputs: input_indices
                .iter()
                .filter_map(|&i| self.inputs.get(i).copied())
                .collect(),
            outputs: output_indices
                .iter()
                .filter_map(|&i| self.outputs.get(i).copied())
                .collect(),
        }
    }
}
