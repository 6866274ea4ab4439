//! Reachability walks over data and control edges
//!
//! The targeted-replacement algorithm needs to know which operations lie on
//! some path between a set of replaced tensors and a set of target tensors.
//! This module provides the forward walk (from a tensor's consumers), the
//! backward walk (from a tensor's producers), and their intersection, each
//! optionally following control edges through a [`ControlOutputs`] index.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::graph::{Graph, OpId, TensorId};

/// Reverse control-edge index: op → ops listing it as a control input
///
/// Control inputs are stored on the successor, so following them forward
/// needs this one-time inversion over the whole graph.
#[derive(Debug, Default)]
pub struct ControlOutputs {
    map: FxHashMap<OpId, SmallVec<[OpId; 2]>>,
}

impl ControlOutputs {
    /// Build the index by scanning every operation's control inputs
    pub fn new(graph: &Graph) -> Self {
        let mut map: FxHashMap<OpId, SmallVec<[OpId; 2]>> = FxHashMap::default();
        for op in graph.ops() {
            for ci in graph.op_control_inputs(op) {
                map.entry(ci).or_default().push(op);
            }
        }
        Self { map }
    }

    /// Operations that have `op` as a control input
    pub fn get(&self, op: OpId) -> &[OpId] {
        self.map.get(&op).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Operations reachable forward from the consumers of the seed tensors
///
/// Follows data edges (output → consumer) and, when a [`ControlOutputs`]
/// index is given, control edges. With `inclusive` false the starting
/// consumers themselves are excluded from the result (but still walked
/// through). Discovery order is deterministic.
pub fn get_forward_walk_ops(
    graph: &Graph,
    seed_ts: &[TensorId],
    inclusive: bool,
    control: Option<&ControlOutputs>,
) -> Vec<OpId> {
    let mut starts: IndexSet<OpId> = IndexSet::new();
    for &t in seed_ts {
        starts.extend(graph.consumers(t));
    }

    let mut visited: IndexSet<OpId> = IndexSet::new();
    let mut stack: Vec<OpId> = starts.iter().copied().collect();
    while let Some(op) = stack.pop() {
        if !visited.insert(op) {
            continue;
        }
        for t in graph.op_outputs(op) {
            for next in graph.consumers(t) {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }
        if let Some(ctrl) = control {
            for &next in ctrl.get(op) {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }
    }

    visited
        .into_iter()
        .filter(|op| inclusive || !starts.contains(op))
        .collect()
}

/// Operations reachable backward from the producers of the seed tensors
///
/// Follows data edges (input → producer) and, when `control` is true,
/// control inputs. With `inclusive` false the seed producers themselves are
/// excluded from the result.
pub fn get_backward_walk_ops(
    graph: &Graph,
    seed_ts: &[TensorId],
    inclusive: bool,
    control: bool,
) -> Vec<OpId> {
    let mut starts: IndexSet<OpId> = IndexSet::new();
    for &t in seed_ts {
        starts.insert(t.op);
    }

    let mut visited: IndexSet<OpId> = IndexSet::new();
    let mut stack: Vec<OpId> = starts.iter().copied().collect();
    while let Some(op) = stack.pop() {
        if !visited.insert(op) {
            continue;
        }
        for t in graph.op_inputs(op) {
            if !visited.contains(&t.op) {
                stack.push(t.op);
            }
        }
        if control {
            for ci in graph.op_control_inputs(op) {
                if !visited.contains(&ci) {
                    stack.push(ci);
                }
            }
        }
    }

    visited
        .into_iter()
        .filter(|op| inclusive || !starts.contains(op))
        .collect()
}

/// Operations lying on some path from the forward seeds to the backward seeds
///
/// The intersection of the inclusive forward walk from `forward_ts` and the
/// inclusive backward walk from `backward_ts`, in forward discovery order.
/// Control edges are followed in both directions when an index is given.
pub fn get_walks_intersection_ops(
    graph: &Graph,
    forward_ts: &[TensorId],
    backward_ts: &[TensorId],
    control: Option<&ControlOutputs>,
) -> Vec<OpId> {
    let forward = get_forward_walk_ops(graph, forward_ts, true, control);
    let backward: IndexSet<OpId> = get_backward_walk_ops(graph, backward_ts, true, control.is_some())
        .into_iter()
        .collect();
    forward
        .into_iter()
        .filter(|op| backward.contains(op))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DType, OpSpec};

    /// p -> a -> b -> t, with d dangling off p and c control-dependent on b
    fn make_test_graph() -> (Graph, Vec<OpId>) {
        let g = Graph::new();
        let p = g.create_op(OpSpec::new("p", "Source").outputs_of(1, DType::F32));
        let a = g.create_op(
            OpSpec::new("a", "Relu")
                .input(TensorId::new(p, 0))
                .outputs_of(1, DType::F32),
        );
        let b = g.create_op(
            OpSpec::new("b", "Neg")
                .input(TensorId::new(a, 0))
                .outputs_of(1, DType::F32),
        );
        let t = g.create_op(
            OpSpec::new("t", "Abs")
                .input(TensorId::new(b, 0))
                .outputs_of(1, DType::F32),
        );
        let d = g.create_op(
            OpSpec::new("d", "Exp")
                .input(TensorId::new(p, 0))
                .outputs_of(1, DType::F32),
        );
        let c = g.create_op(
            OpSpec::new("c", "Noop")
                .control_input(b)
                .outputs_of(1, DType::F32),
        );
        (g, vec![p, a, b, t, d, c])
    }

    #[test]
    fn test_forward_walk() {
        let (g, ids) = make_test_graph();
        let (p, a, b, t, d) = (ids[0], ids[1], ids[2], ids[3], ids[4]);

        let mut ops = get_forward_walk_ops(&g, &[TensorId::new(p, 0)], true, None);
        ops.sort();
        assert_eq!(ops, vec![a, b, t, d]);

        // exclusive drops the starting consumers but keeps what they reach
        let ops = get_forward_walk_ops(&g, &[TensorId::new(p, 0)], false, None);
        assert!(!ops.contains(&a));
        assert!(ops.contains(&t));
    }

    #[test]
    fn test_forward_walk_follows_control_edges() {
        let (g, ids) = make_test_graph();
        let (p, c) = (ids[0], ids[5]);

        let ctrl = ControlOutputs::new(&g);
        let without = get_forward_walk_ops(&g, &[TensorId::new(p, 0)], true, None);
        assert!(!without.contains(&c));

        let with = get_forward_walk_ops(&g, &[TensorId::new(p, 0)], true, Some(&ctrl));
        assert!(with.contains(&c));
    }

    #[test]
    fn test_backward_walk() {
        let (g, ids) = make_test_graph();
        let (p, a, b, t, c) = (ids[0], ids[1], ids[2], ids[3], ids[5]);

        let mut ops = get_backward_walk_ops(&g, &[TensorId::new(t, 0)], true, false);
        ops.sort();
        assert_eq!(ops, vec![p, a, b, t]);

        // control inputs are followed only when asked
        let ops = get_backward_walk_ops(&g, &[TensorId::new(c, 0)], true, true);
        assert!(ops.contains(&b));
        let ops = get_backward_walk_ops(&g, &[TensorId::new(c, 0)], true, false);
        assert_eq!(ops, vec![c]);
    }

    #[test]
    fn test_walks_intersection() {
        let (g, ids) = make_test_graph();
        let (p, a, b, t, d) = (ids[0], ids[1], ids[2], ids[3], ids[4]);

        let mut ops = get_walks_intersection_ops(
            &g,
            &[TensorId::new(p, 0)],
            &[TensorId::new(t, 0)],
            None,
        );
        ops.sort();
        // d is forward-reachable but not on a path to t
        assert_eq!(ops, vec![a, b, t]);
        assert!(!ops.contains(&d));
    }

    #[test]
    fn test_walks_intersection_disconnected() {
        let (g, ids) = make_test_graph();
        let (t, d) = (ids[3], ids[4]);

        // nothing flows from t into d
        let ops = get_walks_intersection_ops(
            &g,
            &[TensorId::new(t, 0)],
            &[TensorId::new(d, 0)],
            None,
        );
        assert!(ops.is_empty());
    }
}
