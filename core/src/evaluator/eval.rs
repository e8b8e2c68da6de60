//! Core evaluation logic.

use super::{
    EvaluatorOptions, ViewFallback,
    operators::{
        coerce, eval_binary, eval_cast, eval_neg, eval_not, eval_ternary,
    },
};
use crate::{
    binding::{BindMode, BindingTable, Provenance},
    error::EvalError,
    graph::{Attr, Graph, Node, NodeId, NodeKind, Op, UnaryOp},
    precomputed::PrecomputedValues,
    values::{StructValue, TensorMetadata, Value},
    view::{self, ShapeError},
};
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace};

/// One evaluation session over a borrowed graph.
#[derive(Debug, Clone)]
pub struct Evaluator<'g> {
    graph: &'g Graph,
    options: EvaluatorOptions,
    bindings: BindingTable<'g>,
    cache: Option<AttachedCache<'g>>,
}

#[derive(Debug, Clone)]
struct AttachedCache<'g> {
    values: Arc<PrecomputedValues<'g>>,
    stale: bool,
}

impl<'g> Evaluator<'g> {
    /// Create an empty session with default options.
    pub fn new(graph: &'g Graph) -> Self {
        Self::with_options(graph, EvaluatorOptions::default())
    }

    pub fn with_options(graph: &'g Graph, options: EvaluatorOptions) -> Self {
        Self {
            graph,
            options,
            bindings: BindingTable::new(graph),
            cache: None,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    pub fn bindings(&self) -> &BindingTable<'g> {
        &self.bindings
    }

    /// Discard every binding and any attached snapshot.
    pub fn reset(&mut self) {
        debug!("reset evaluator session");
        *self = Self::with_options(self.graph, self.options.clone());
    }

    // ============================================================================
    // Binding
    // ============================================================================

    /// Bind a free leaf (symbol or tensor input).
    pub fn bind(&mut self, node: NodeId, value: impl Into<Value>) -> Result<(), EvalError> {
        self.bind_with(node, value, BindMode::Leaf)
    }

    /// Bind any non-constant node; the value supersedes the node's derivation.
    pub fn bind_override(
        &mut self,
        node: NodeId,
        value: impl Into<Value>,
    ) -> Result<(), EvalError> {
        self.bind_with(node, value, BindMode::Override)
    }

    /// Bind any non-constant node after checking the value against what the
    /// node currently evaluates to.
    pub fn bind_validated(
        &mut self,
        node: NodeId,
        value: impl Into<Value>,
    ) -> Result<(), EvalError> {
        self.bind_with(node, value, BindMode::Validate)
    }

    pub fn bind_with(
        &mut self,
        node: NodeId,
        value: impl Into<Value>,
        mode: BindMode,
    ) -> Result<(), EvalError> {
        let value = value.into();
        match mode {
            BindMode::Leaf => self.bindings.bind(node, value, false)?,
            BindMode::Override => self.bindings.bind(node, value, true)?,
            BindMode::Validate => {
                let ty = self.graph.ty(node)?;
                if !value.conforms_to(ty) {
                    return Err(EvalError::type_mismatch(ty, value.describe()));
                }
                let current = if self.graph.is_structurally_defined(node)? {
                    Walk::new(self, Some(node)).run(node)?
                } else {
                    self.bindings.lookup(node).cloned()
                };
                if let Some(current) = current.filter(|current| *current != value) {
                    return Err(EvalError::BindingConflict {
                        node,
                        reason: format!(
                            "tried to bind to a value: {}, but it evaluates to {}",
                            value, current
                        ),
                    });
                }
                self.bindings.bind(node, value, true)?
            }
        }
        self.invalidate_cache(node);
        Ok(())
    }

    /// Bound value or literal of `node`, without deriving anything.
    pub fn lookup(&self, node: NodeId) -> Option<&Value> {
        self.bindings.lookup(node)
    }

    // ============================================================================
    // Precomputed values
    // ============================================================================

    /// Attach a precomputed snapshot.
    ///
    /// Every input the snapshot was computed from must be bound to the same
    /// value in this session, and every override in this session must be one
    /// of the snapshot's inputs. Otherwise the snapshot could disagree with a
    /// fresh derivation, and attaching fails with
    /// [`EvalError::CacheMismatch`].
    pub fn attach_cache(&mut self, cache: Arc<PrecomputedValues<'g>>) -> Result<(), EvalError> {
        if !std::ptr::eq(cache.graph(), self.graph) {
            return Err(EvalError::CacheMismatch {
                reason: "it was built for a different graph".to_string(),
            });
        }
        if !cache.is_evaluated() {
            return Err(EvalError::CacheMismatch {
                reason: "it has not been evaluated".to_string(),
            });
        }
        for (node, input, _) in cache.inputs().iter() {
            match self.bindings.lookup(node) {
                Some(bound) if bound == input => {}
                Some(bound) => {
                    return Err(EvalError::CacheMismatch {
                        reason: format!(
                            "{} is bound to {} here but to {} in the snapshot",
                            node, bound, input
                        ),
                    });
                }
                None => {
                    return Err(EvalError::CacheMismatch {
                        reason: format!("{} is bound in the snapshot but not here", node),
                    });
                }
            }
        }
        for (node, value, provenance) in self.bindings.iter() {
            if provenance == Provenance::Override && cache.inputs().lookup(node) != Some(value) {
                return Err(EvalError::CacheMismatch {
                    reason: format!("the override of {} is not part of the snapshot", node),
                });
            }
        }
        debug!(values = cache.len(), "attach precomputed values");
        self.cache = Some(AttachedCache {
            values: cache,
            stale: false,
        });
        Ok(())
    }

    pub fn detach_cache(&mut self) -> Option<Arc<PrecomputedValues<'g>>> {
        self.cache.take().map(|cache| cache.values)
    }

    /// Whether a snapshot is attached and still consulted.
    pub fn has_fresh_cache(&self) -> bool {
        self.cache.as_ref().is_some_and(|cache| !cache.stale)
    }

    fn invalidate_cache(&mut self, node: NodeId) {
        if let Some(cache) = self.cache.as_mut().filter(|cache| !cache.stale) {
            debug!(node = %node, "bind invalidates precomputed values");
            cache.stale = true;
        }
    }

    fn cached(&self, node: NodeId) -> Option<&Value> {
        self.cache
            .as_ref()
            .filter(|cache| !cache.stale)
            .and_then(|cache| cache.values.get(node))
    }

    // ============================================================================
    // Evaluation
    // ============================================================================

    /// Value of `node`, or `None` if it depends on an unbound leaf.
    pub fn evaluate(&self, node: NodeId) -> Result<Option<Value>, EvalError> {
        Walk::new(self, None).run(node)
    }

    /// Evaluate several nodes, sharing work between them.
    pub fn evaluate_many(
        &self,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> Result<Vec<Option<Value>>, EvalError> {
        let mut walk = Walk::new(self, None);
        nodes.into_iter().map(|node| walk.run(node)).collect()
    }

    /// Known values of those `nodes` that fit within the depth limit.
    ///
    /// Nodes that are too deep are skipped; any other error is returned.
    pub(crate) fn evaluate_within_depth(
        &self,
        nodes: &[NodeId],
    ) -> Result<Vec<(NodeId, Value)>, EvalError> {
        let mut walk = Walk::new(self, None);
        let mut values = Vec::new();
        for &node in nodes {
            match walk.run(node) {
                Ok(Some(value)) => values.push((node, value)),
                Ok(None) | Err(EvalError::StackOverflow { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(values)
    }
}

/// State of a single evaluation call tree.
struct Walk<'e, 'g> {
    evaluator: &'e Evaluator<'g>,
    memo: HashMap<NodeId, Option<Value>>,
    /// Nested evaluations each node needs, counting bound nodes as leaves.
    heights: HashMap<NodeId, usize>,
    /// Node whose own binding is ignored, so that it is re-derived.
    rederive: Option<NodeId>,
}

impl<'e, 'g> Walk<'e, 'g> {
    fn new(evaluator: &'e Evaluator<'g>, rederive: Option<NodeId>) -> Self {
        Self {
            evaluator,
            memo: HashMap::new(),
            heights: HashMap::new(),
            rederive,
        }
    }

    /// Evaluate `node` if its derivation fits within the depth limit.
    fn run(&mut self, node: NodeId) -> Result<Option<Value>, EvalError> {
        // Check depth before recursing
        let max_depth = self.evaluator.options.max_depth;
        if self.height(node)? > max_depth {
            return Err(EvalError::StackOverflow {
                depth: max_depth,
                max_depth,
            });
        }
        self.eval(node)
    }

    /// Longest chain of nested evaluations needed to derive `node`.
    ///
    /// Bound nodes count as leaves. Precomputed values are ignored, so the
    /// limit gives the same answer whether or not a snapshot is attached.
    fn height(&mut self, node: NodeId) -> Result<usize, EvalError> {
        let mut stack = vec![(node, false)];
        while let Some((current, expanded)) = stack.pop() {
            if self.heights.contains_key(&current) {
                continue;
            }
            let operands = self.derivation_operands(current)?;
            if expanded {
                let height = operands
                    .iter()
                    .filter_map(|operand| self.heights.get(operand))
                    .max()
                    .map_or(1, |deepest| deepest + 1);
                self.heights.insert(current, height);
            } else {
                stack.push((current, true));
                stack.extend(
                    operands
                        .iter()
                        .filter(|operand| !self.heights.contains_key(*operand))
                        .map(|&operand| (operand, false)),
                );
            }
        }
        Ok(self.heights.get(&node).copied().unwrap_or(1))
    }

    /// Operands `eval` would visit for `node`.
    fn derivation_operands(&self, node: NodeId) -> Result<&'g [NodeId], EvalError> {
        let graph = self.evaluator.graph;
        let target = graph.get(node)?;
        let bound = self.rederive != Some(node) && self.evaluator.bindings.lookup(node).is_some();
        Ok(if bound { &[] } else { target.operands() })
    }

    fn eval(&mut self, node: NodeId) -> Result<Option<Value>, EvalError> {
        if let Some(value) = self.memo.get(&node) {
            return Ok(value.clone());
        }
        let value = self.eval_inner(node)?;
        self.memo.insert(node, value.clone());
        Ok(value)
    }

    fn eval_inner(&mut self, node: NodeId) -> Result<Option<Value>, EvalError> {
        let evaluator = self.evaluator;
        if self.rederive != Some(node) {
            if let Some(value) = evaluator.bindings.lookup(node) {
                return Ok(Some(value.clone()));
            }
            if let Some(value) = evaluator.cached(node) {
                trace!(node = %node, "precomputed");
                return Ok(Some(value.clone()));
            }
        }

        let target = evaluator.graph.get(node)?;
        let (op, operands) = match &target.kind {
            NodeKind::Symbol(_) | NodeKind::Tensor(_) => return Ok(None),
            NodeKind::Constant(value) => return Ok(Some(value.clone())),
            NodeKind::Op { op, operands } => (op, operands),
        };

        // Every operand is evaluated so that errors surface even when another
        // operand is unknown.
        let mut values: SmallVec<[Value; 3]> = SmallVec::with_capacity(operands.len());
        let mut known = true;
        for &operand in operands {
            match self.eval(operand)? {
                Some(value) => values.push(value),
                None => known = false,
            }
        }
        if !known {
            trace!(node = %node, op = op.name(), "unknown operand");
            return Ok(None);
        }

        let value = self.apply(target, op, &values)?;
        trace!(node = %node, op = op.name(), value = %value, "evaluated");
        Ok(Some(value))
    }

    /// Apply `op` to fully known operand values.
    fn apply(&self, target: &Node, op: &Op, values: &[Value]) -> Result<Value, EvalError> {
        match (op, values) {
            (Op::Unary(UnaryOp::Neg), [x]) => eval_neg(x),
            (Op::Unary(UnaryOp::Not), [x]) => eval_not(x),
            (Op::Unary(UnaryOp::Cast), [x]) => eval_cast(x, &target.ty),
            (Op::Binary(op), [lhs, rhs]) => eval_binary(*op, lhs, rhs),
            (Op::Ternary(op), [a, b, c]) => Ok(coerce(eval_ternary(*op, a, b, c)?, &target.ty)),
            (Op::ArrayConstruct, elements) => Ok(Value::Array(elements.to_vec())),
            (Op::GetItem, [array, index]) => array.item(index.as_int()?),
            (Op::ReverseArray, [array]) => {
                Ok(Value::Array(array.as_array()?.iter().rev().cloned().collect()))
            }
            (Op::StructConstruct, fields) => {
                let ty = target
                    .ty
                    .as_struct()
                    .ok_or_else(|| EvalError::type_mismatch("struct", &target.ty))?;
                Ok(Value::Struct(StructValue::from_ordered(
                    ty.clone(),
                    fields.to_vec(),
                )))
            }
            (Op::GetAttr(Attr::Field { index, name }), [owner]) => {
                let owner = owner.as_struct()?;
                owner
                    .get_at(*index)
                    .cloned()
                    .ok_or_else(|| EvalError::UnknownField {
                        owner: owner.ty().name().to_string(),
                        field: name.to_string(),
                    })
            }
            (Op::GetAttr(Attr::Tensor(field)), [tensor]) => Ok(tensor.as_tensor()?.field(*field)),
            (Op::Metadata, [tensor]) => Ok(Value::Tensor(tensor.as_tensor()?.clone())),
            (Op::Permute(order), [tensor]) => {
                Ok(Value::Tensor(view::permute(tensor.as_tensor()?, order)?))
            }
            (Op::Reshape, [tensor, extents @ ..]) => {
                let target_sizes = extents
                    .iter()
                    .map(Value::as_int)
                    .collect::<Result<SmallVec<[i64; 6]>, _>>()?;
                self.view(tensor.as_tensor()?, &target_sizes)
            }
            (Op::Flatten { start, end }, [tensor]) => {
                let meta = tensor.as_tensor()?;
                let target_sizes = view::flattened_sizes(meta.sizes(), *start, *end)?;
                self.view(meta, &target_sizes)
            }
            (Op::Expand, [tensor, extents @ ..]) => {
                let target_sizes = extents
                    .iter()
                    .map(Value::as_int)
                    .collect::<Result<SmallVec<[i64; 6]>, _>>()?;
                Ok(Value::Tensor(view::expand(tensor.as_tensor()?, &target_sizes)?))
            }
            (op, values) => Err(EvalError::construction(format!(
                "`{}` cannot take {} operands",
                op.name(),
                values.len()
            ))),
        }
    }

    /// Zero-copy reshape, or the materialized layout if the session allows it.
    fn view(&self, meta: &TensorMetadata, target: &[i64]) -> Result<Value, EvalError> {
        let reshaped = match view::reshape(meta, target) {
            Err(ShapeError::NotViewable { .. })
                if self.evaluator.options.view_fallback == ViewFallback::Materialize =>
            {
                debug!(
                    sizes = ?meta.sizes(),
                    strides = ?meta.strides(),
                    target = ?target,
                    "no zero-copy view; materializing"
                );
                view::materialized(meta, target)?
            }
            result => result?,
        };
        Ok(Value::Tensor(reshaped))
    }
}
