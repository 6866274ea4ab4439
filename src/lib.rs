//! # Graph Splice
//!
//! Subgraph transformation engine for dataflow graphs.
//!
//! This crate copies, rewrites, and splices user-selected regions of a
//! dataflow graph (operations connected by typed tensors), preserving
//! external connectivity, naming, and collection bookkeeping.
//!
//! ## Features
//!
//! - **Subgraph Views**: Ordered operation selections with explicit or
//!   inferred boundary tensors
//! - **Memoized Transformation**: Exactly-once translation of operations
//!   and tensors, in-place or across graphs, driven by replaceable handlers
//! - **Targeted Replacement**: Recompute chosen tensors as if selected
//!   inputs had different values, copying only the dependent region
//!
//! ## Example
//!
//! ```
//! use graph_splice::prelude::*;
//!
//! let g = Graph::new();
//! let x = g.create_op(OpSpec::new("x", "Source").outputs_of(1, DType::F32));
//! let y = g.create_op(
//!     OpSpec::new("y", "Relu")
//!         .input(TensorId::new(x, 0))
//!         .outputs_of(1, DType::F32),
//! );
//!
//! let sgv = SubgraphView::make_view(&g, [x, y]).unwrap();
//! let dst = Graph::new();
//! let (copied, _info) = copy(&sgv, &dst, "dup", "", false).unwrap();
//! assert_eq!(copied.op_count(), 2);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// ============================================================================
// Module declarations
// ============================================================================

pub mod error;
pub mod graph;
pub mod select;
pub mod subgraph;
pub mod transform;
pub mod util;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module - import commonly used types with `use graph_splice::prelude::*`
pub mod prelude {
    pub use crate::error::{TransformError, TransformResult};
    pub use crate::graph::{
        AttrValue, DType, Element, Graph, OpId, OpSpec, TensorId, TensorInfo,
    };
    pub use crate::select::{
        get_backward_walk_ops, get_forward_walk_ops, get_walks_intersection_ops, ControlOutputs,
    };
    pub use crate::subgraph::SubgraphView;
    pub use crate::transform::{
        copy, copy_with_input_replacements, graph_replace, ControlLink, ElemTree, ResultInfo,
        TransformHandlers, Transformer, Walk,
    };
}

// ============================================================================
// Crate-level re-exports
// ============================================================================

pub use error::{TransformError, TransformResult};
pub use transform::Transformer;

// ============================================================================
// Version information
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
