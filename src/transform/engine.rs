//! The transformation engine
//!
//! [`Transformer`] orchestrates one transformation call: it walks the
//! subgraph from its boundary outputs, applies the configured handlers,
//! memoizes every translation, renames per scope, and reconciles the
//! results into a transformed subgraph view plus a [`ResultInfo`]
//! mapping.
//!
//! # Traversal
//!
//! 1. Normalize both scope strings; uniquify the destination scope unless
//!    reuse was requested.
//! 2. Forward-from-outputs pass: recursively translate every boundary
//!    output tensor. Translating a tensor translates its producer first
//!    when that producer is a member; boundary inputs go through the
//!    external-input handler, everything else external through the
//!    hidden-input handler.
//! 3. Root-completion pass: members with no outputs (pure side-effect
//!    nodes) are translated directly.
//! 4. Control completion: deferred control links are resolved from the
//!    memo table; deferred member sources never reached by the data walk
//!    are translated first. Control edges may close cycles, so they are
//!    never followed as a recursive translation dependency.
//! 5. Reassembly: a view over all translated members, with boundary
//!    order remapped to match the original view (unmatched entries are
//!    silently dropped).
//!
//! The two memo tables guarantee every operation and tensor is translated
//! at most once per call. A call is synchronous and single-threaded;
//! concurrent calls against the same destination graph must be serialized
//! by the caller.

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::error::{TransformError, TransformResult};
use crate::graph::{Element, Graph, OpId, TensorId};
use crate::subgraph::SubgraphView;
use crate::util::{scope_basename, scope_finalize};

use super::context::TransformContext;
use super::handlers::TransformHandlers;
use super::result::ResultInfo;

/// Transforms a subgraph view into another one
///
/// The default configuration copies a subgraph, replacing boundary inputs
/// with placeholders; replace individual [`TransformHandlers`] entries to
/// change that. One instance can be reused for independent calls, but a
/// call must not be re-entered from inside a handler.
#[derive(Default)]
pub struct Transformer {
    /// The replaceable policies consulted during traversal
    pub handlers: TransformHandlers,
}

impl Transformer {
    /// A transformer with the default copy policies
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute one transformation
    ///
    /// `src_scope` defines the renaming base: an op named `a/x/y` under
    /// source scope `a/` and destination scope `b/` becomes `b/x/y`.
    /// With `reuse_dst_scope` false, a non-empty destination scope is
    /// first uniquified within the destination graph.
    ///
    /// Returns the transformed subgraph view and the result mapping.
    /// On error the destination graph may already hold partially created
    /// operations; there is no rollback.
    pub fn call(
        &self,
        sgv: &SubgraphView,
        dst_graph: &Graph,
        dst_scope: &str,
        src_scope: &str,
        reuse_dst_scope: bool,
    ) -> TransformResult<(SubgraphView, ResultInfo)> {
        let src_scope = scope_finalize(src_scope);
        let mut dst_scope = scope_finalize(dst_scope);
        if !dst_scope.is_empty() && !reuse_dst_scope {
            dst_scope = scope_finalize(&dst_graph.unique_name(scope_basename(&dst_scope)));
        }

        debug!(
            ops = sgv.op_count(),
            src_scope = %src_scope,
            dst_scope = %dst_scope,
            in_place = Graph::same_graph(sgv.graph(), dst_graph),
            "starting subgraph transform"
        );

        let ctx = TransformContext::new(sgv.clone(), dst_graph.clone(), src_scope, dst_scope);
        let mut walk = Walk {
            handlers: &self.handlers,
            ctx,
        };

        // Forward pass from the declared boundary outputs.
        for &t in sgv.outputs() {
            walk.transform_tensor(t)?;
        }

        // Members with no outputs cannot be reached by the forward pass.
        let remaining_roots: Vec<OpId> = sgv
            .ops()
            .filter(|&op| {
                !walk.ctx.transformed_ops.contains_key(&op)
                    && sgv.graph().op_output_count(op) == 0
            })
            .collect();
        for op in remaining_roots {
            walk.transform_op(op)?;
        }

        walk.resolve_deferred_control()?;

        let transformed = walk.reassemble()?;
        let info = ResultInfo::new(walk.ctx);

        debug!(
            translated_ops = info.op_mapping().count(),
            translated_tensors = info.tensor_mapping().count(),
            "subgraph transform complete"
        );
        Ok((transformed, info))
    }
}

/// One in-flight transformation, as seen by handlers
///
/// Exposes the recursive translation entry points and the open per-call
/// [`TransformContext`]. Handlers receive `&mut Walk` and may recurse
/// through [`transform_tensor`](Self::transform_tensor) and
/// [`transform_op`](Self::transform_op); memoization guarantees each
/// element is translated at most once.
pub struct Walk<'a> {
    pub(crate) handlers: &'a TransformHandlers,
    /// The per-call state
    pub ctx: TransformContext,
}

impl Walk<'_> {
    /// Translate a tensor, memoized
    ///
    /// Member-produced tensors translate their producer first; boundary
    /// inputs go through the external-input handler; anything else goes
    /// through the hidden-input handler.
    pub fn transform_tensor(&mut self, t: TensorId) -> TransformResult<TensorId> {
        if let Some(&cached) = self.ctx.transformed_ts.get(&t) {
            return Ok(cached);
        }
        let handlers = self.handlers;

        let translated = if self.ctx.is_member(t.op) {
            let op_translated = self.transform_op(t.op)?;
            let candidate = TensorId::new(op_translated, t.slot);
            if !self.ctx.dst_graph.contains_tensor(candidate) {
                return Err(TransformError::UnknownTensor(format!(
                    "slot {} missing on translated op {}",
                    t.slot,
                    self.ctx.dst_graph.op_name(op_translated)
                )));
            }
            candidate
        } else if self.ctx.is_boundary_input(t) {
            (handlers.transform_external_input)(self, t)?
        } else {
            (handlers.transform_hidden_input)(self, t)?
        };

        if !(self.ctx.same_graph() && translated == t) {
            (handlers.assign_collections)(
                self,
                Element::Tensor(t),
                Element::Tensor(translated),
            )?;
        }

        trace!(tensor = %t, translated = %translated, "tensor translated");
        self.ctx.transformed_ts.insert(t, translated);
        Ok(translated)
    }

    /// Translate an operation, memoized
    ///
    /// Runs the op handler. When the identity changed, the result is
    /// registered with the destination graph's ambient context stacks and
    /// collection membership is propagated.
    pub fn transform_op(&mut self, op: OpId) -> TransformResult<OpId> {
        if let Some(&cached) = self.ctx.transformed_ops.get(&op) {
            return Ok(cached);
        }
        let handlers = self.handlers;
        let translated = (handlers.transform_op)(self, op)?;

        if !(self.ctx.same_graph() && translated == op) {
            self.ctx.dst_graph.apply_ambient(translated);
            (handlers.assign_collections)(self, Element::Op(op), Element::Op(translated))?;
        }

        trace!(op = %op, translated = %translated, "op translated");
        self.ctx.transformed_ops.insert(op, translated);
        Ok(translated)
    }

    /// Compute a destination name from a source name
    ///
    /// Destination name = destination scope + (source name with the source
    /// scope stripped). Fails with [`TransformError::ScopeMismatch`] when
    /// the name does not start with the source scope, which is a caller
    /// contract violation.
    pub fn new_name(&self, name: &str) -> TransformResult<String> {
        let Some(relative) = name.strip_prefix(self.ctx.src_scope.as_str()) else {
            return Err(TransformError::ScopeMismatch {
                name: name.to_string(),
                scope: self.ctx.src_scope.clone(),
            });
        };
        Ok(format!("{}{}", self.ctx.dst_scope, relative))
    }

    /// Defer a control link for resolution after the traversal
    ///
    /// `op` is the source operation being translated and `control` its
    /// source control input; once both have translations the edge is
    /// re-created in the destination graph.
    pub fn defer_control(&mut self, op: OpId, control: OpId) {
        self.ctx.pending_control.push((op, control));
    }

    /// Resolve deferred control links from the memo table
    ///
    /// Deferred member sources the data walk never reached are translated
    /// first; each round translates at least one new member, so the loop
    /// is bounded by the member count.
    fn resolve_deferred_control(&mut self) -> TransformResult<()> {
        loop {
            let unresolved: IndexSet<OpId> = self
                .ctx
                .pending_control
                .iter()
                .map(|&(_, control)| control)
                .filter(|&c| self.ctx.is_member(c) && !self.ctx.transformed_ops.contains_key(&c))
                .collect();
            if unresolved.is_empty() {
                break;
            }
            for op in unresolved {
                self.transform_op(op)?;
            }
        }

        let pending = std::mem::take(&mut self.ctx.pending_control);
        for (src_op, src_control) in pending {
            let Some(&op_translated) = self.ctx.transformed_ops.get(&src_op) else {
                continue;
            };
            let Some(&control_translated) = self.ctx.transformed_ops.get(&src_control) else {
                continue;
            };
            self.ctx
                .dst_graph
                .add_control_input(op_translated, control_translated);
        }
        Ok(())
    }

    /// Build the transformed subgraph view
    ///
    /// Infers a view over all translated members, then remaps its
    /// boundaries to the original view's input/output order; original
    /// boundary tensors without a translated counterpart in the new view
    /// are silently dropped from the positional remap.
    fn reassemble(&self) -> TransformResult<SubgraphView> {
        let ops: Vec<OpId> = self.ctx.transformed_ops.values().copied().collect();
        let view = SubgraphView::make_view(&self.ctx.dst_graph, ops)?;

        let mut input_remap = Vec::new();
        for &t in self.ctx.sgv.inputs() {
            let Some(&translated) = self.ctx.transformed_ts.get(&t) else {
                continue;
            };
            let Some(index) = view.input_index(translated) else {
                continue;
            };
            input_remap.push(index);
        }

        let mut output_remap = Vec::new();
        for &t in self.ctx.sgv.outputs() {
            let Some(&translated) = self.ctx.transformed_ts.get(&t) else {
                continue;
            };
            let Some(index) = view.output_index(translated) else {
                continue;
            };
            output_remap.push(index);
        }

        Ok(view.remap(&input_remap, &output_remap))
    }
}
