//! Graph model: operations, tensors, collections, ambient context
//!
//! This module provides the storage collaborator the transformation engine
//! works against:
//!
//! - [`Graph`]: op arena, name registry, consumer index, collections, and
//!   the ambient control-dependency / device stacks
//! - [`elements`]: id and value types ([`OpId`], [`TensorId`], [`OpSpec`], …)
//!
//! # Overview
//!
//! Identity is id-based: names are unique within a graph but may collide
//! across graphs, and every id is only meaningful for the graph that minted
//! it. A [`Graph`] value is a cheap-clone handle; [`Graph::same_graph`]
//! compares the underlying storage.
//!
//! # Example
//!
//! ```ignore
//! use graph_splice::graph::{Graph, OpSpec, DType, TensorId};
//!
//! let g = Graph::new();
//! let x = g.create_op(OpSpec::new("x", "Source").outputs_of(1, DType::F32));
//! let y = g.create_op(
//!     OpSpec::new("y", "Relu")
//!         .input(TensorId::new(x, 0))
//!         .outputs_of(1, DType::F32),
//! );
//! assert_eq!(g.consumers(TensorId::new(x, 0)).as_slice(), &[y]);
//! ```

pub mod accessors;
pub mod core;
pub mod elements;
pub mod mutators;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Consumer index: tensor → consuming ops, one entry per edge
pub type ConsumerMap = FxHashMap<TensorId, SmallVec<[OpId; 4]>>;

pub use self::core::Graph;
pub use elements::{AttrValue, DType, Element, OpId, OpSpec, TensorId, TensorInfo};
pub use mutators::PLACEHOLDER_OP;
