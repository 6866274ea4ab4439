//! The subgraph transformation engine
//!
//! A [`Transformer`] turns one [`SubgraphView`](crate::subgraph::SubgraphView)
//! into another: a structural copy into a different graph, a scoped
//! duplicate inside the same graph, or an in-place rewrite. The traversal
//! is memoized (each operation and tensor is translated exactly once per
//! call) and every policy decision goes through a replaceable handler in
//! [`TransformHandlers`].
//!
//! | Module | Contents |
//! |---|---|
//! | [`mod@self`] | [`Transformer`], [`Walk`], handler policies |
//! | `context` | Per-call [`TransformContext`] |
//! | `result` | [`ResultInfo`] bidirectional mapping, [`ElemTree`] |
//! | `replace` | [`copy`], [`copy_with_input_replacements`], [`graph_replace`] |
//!
//! ```
//! use graph_splice::graph::{DType, Graph, OpSpec, TensorId};
//! use graph_splice::subgraph::SubgraphView;
//! use graph_splice::transform::copy;
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
//! let (copied, info) = copy(&sgv, &dst, "", "", true).unwrap();
//!
//! assert_eq!(copied.op_count(), 2);
//! assert_eq!(dst.op_name(info.transformed_op(y).unwrap()), "y");
//! ```

mod context;
mod engine;
mod handlers;
mod replace;
mod result;

pub use self::context::TransformContext;
pub use self::engine::{Transformer, Walk};
pub use self::handlers::{
    assign_renamed_collections_handler, copy_op_handler, defer_control_input_handler,
    keep_if_possible_handler, op_handler, replace_with_placeholder_handler, tensor_handler,
    transform_op_if_inside_handler, transform_op_in_place, CollectionsHandlerFn, ControlHandlerFn,
    ControlLink, OpHandlerFn, OpLinkHandlerFn, TensorHandlerFn, TransformHandlers,
};
pub use self::replace::{copy, copy_with_input_replacements, graph_replace};
pub use self::result::{ElemTree, ResultInfo};
