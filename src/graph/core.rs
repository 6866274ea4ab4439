//! Graph storage: op arena, name registry, ambient context stacks
//!
//! A [`Graph`] is a cheap-to-clone handle; clones share the same underlying
//! storage. The engine is single-threaded by design, so the storage sits
//! behind `Rc<RefCell<_>>` and every accessor returns owned data, keeping
//! borrows short-lived and re-entrancy safe.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use super::elements::{ControlList, Element, OpId, Operation};
use crate::graph::ConsumerMap;

pub(crate) struct GraphInner {
    pub(crate) ops: Vec<Operation>,
    /// name prefix → next suffix to try (1 means the bare name is taken)
    pub(crate) names_in_use: FxHashMap<String, u32>,
    pub(crate) op_by_name: FxHashMap<String, OpId>,
    pub(crate) consumers: ConsumerMap,
    pub(crate) collections: IndexMap<String, Vec<Element>>,
    pub(crate) control_dep_stack: Vec<Vec<OpId>>,
    pub(crate) device_stack: Vec<Option<String>>,
}

impl GraphInner {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            names_in_use: FxHashMap::default(),
            op_by_name: FxHashMap::default(),
            consumers: FxHashMap::default(),
            collections: IndexMap::new(),
            control_dep_stack: Vec::new(),
            device_stack: Vec::new(),
        }
    }

    /// Reserve and return a unique name derived from `prefix`
    ///
    /// First use returns the prefix itself; later uses append `_1`, `_2`, …
    pub(crate) fn unique_name(&mut self, prefix: &str) -> String {
        let next = self.names_in_use.get(prefix).copied().unwrap_or(0);
        if next == 0 {
            self.names_in_use.insert(prefix.to_string(), 1);
            return prefix.to_string();
        }
        let mut i = next;
        loop {
            let candidate = format!("{prefix}_{i}");
            if !self.names_in_use.contains_key(&candidate) {
                self.names_in_use.insert(candidate.clone(), 1);
                self.names_in_use.insert(prefix.to_string(), i + 1);
                return candidate;
            }
            i += 1;
        }
    }
}

/// A directed dataflow graph of operations and tensors
///
/// Owns its operations (append-only arena) and enforces name uniqueness
/// within itself. Also carries the ambient context stacks (currently
/// active control dependencies and device placement) that apply to newly
/// created operations. Ids are only meaningful for the graph that created
/// them.
#[derive(Clone)]
pub struct Graph {
    pub(crate) inner: Rc<RefCell<GraphInner>>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner::new())),
        }
    }

    /// Whether two handles refer to the same underlying graph
    pub fn same_graph(a: &Graph, b: &Graph) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Reserve and return a name unique within this graph
    ///
    /// The name is marked as used, so a later [`create_op`](Self::create_op)
    /// with the same prefix picks the next suffix.
    pub fn unique_name(&self, prefix: &str) -> String {
        self.inner.borrow_mut().unique_name(prefix)
    }

    // ========================================================================
    // Ambient context stacks
    // ========================================================================

    /// Push a frame of active control dependencies
    pub fn push_control_dependencies(&self, ops: Vec<OpId>) {
        self.inner.borrow_mut().control_dep_stack.push(ops);
    }

    /// Pop the innermost control-dependency frame
    pub fn pop_control_dependencies(&self) -> Option<Vec<OpId>> {
        self.inner.borrow_mut().control_dep_stack.pop()
    }

    /// Push a device frame; `None` clears the active device
    pub fn push_device(&self, device: Option<String>) {
        self.inner.borrow_mut().device_stack.push(device);
    }

    /// Pop the innermost device frame
    pub fn pop_device(&self) -> Option<Option<String>> {
        self.inner.borrow_mut().device_stack.pop()
    }

    /// Union of all active control-dependency frames, in push order
    pub fn active_control_inputs(&self) -> Vec<OpId> {
        let inner = self.inner.borrow();
        let mut seen = ControlList::new();
        for frame in &inner.control_dep_stack {
            for &op in frame {
                if !seen.contains(&op) {
                    seen.push(op);
                }
            }
        }
        seen.into_vec()
    }

    /// Currently active device, if any (innermost frame wins, `None` clears)
    pub fn active_device(&self) -> Option<String> {
        self.inner.borrow().device_stack.last().cloned().flatten()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Graph")
            .field("ops", &inner.ops.len())
            .field("collections", &inner.collections.len())
            .finish()
    }
}
