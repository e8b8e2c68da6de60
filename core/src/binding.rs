//! Per-session store of concrete values for graph nodes.
//!
//! Free leaves (symbols and tensor inputs) may be bound and rebound at will.
//! Operator nodes only accept an explicit override, and constants never accept
//! a binding. Binding a tensor input also binds its symbolic extents.

use crate::{
    error::EvalError,
    graph::{Graph, NodeId, NodeKind},
    values::{TensorMetadata, Value},
};
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;

/// Where a node's value in the table comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// A free leaf bound by the caller.
    External,
    /// A structurally defined node whose derivation was superseded.
    Override,
    /// A literal embedded in the graph.
    ConstantFold,
    NotYetBound,
}

/// How [`Evaluator::bind_with`](crate::Evaluator::bind_with) treats the
/// target node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BindMode {
    /// Only free leaves may be bound.
    #[default]
    Leaf,
    /// Operator nodes may be bound; the value replaces their derivation.
    Override,
    /// Operator nodes may be bound if their derivation, when known, agrees.
    Validate,
}

#[derive(Debug, Clone)]
pub struct BindingTable<'g> {
    graph: &'g Graph,
    entries: HashMap<NodeId, (Value, Provenance)>,
}

impl<'g> BindingTable<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            entries: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Record `value` for `node`, replacing any previous binding.
    ///
    /// Operator nodes require `allow_override`. The value must conform to the
    /// node's declared type.
    pub fn bind(
        &mut self,
        node: NodeId,
        value: Value,
        allow_override: bool,
    ) -> Result<(), EvalError> {
        let graph = self.graph;
        let target = graph.get(node)?;
        let provenance = match &target.kind {
            NodeKind::Constant(constant) => {
                return Err(EvalError::BindingConflict {
                    node,
                    reason: format!("it is the constant {}", constant),
                });
            }
            NodeKind::Op { op, .. } if !allow_override => {
                return Err(EvalError::BindingConflict {
                    node,
                    reason: format!("it is defined by `{}`", op.name()),
                });
            }
            NodeKind::Op { .. } => Provenance::Override,
            NodeKind::Symbol(_) | NodeKind::Tensor(_) => Provenance::External,
        };
        if !value.conforms_to(&target.ty) {
            return Err(EvalError::type_mismatch(&target.ty, value.describe()));
        }

        let mut extents: SmallVec<[(NodeId, i64); 4]> = SmallVec::new();
        if let (NodeKind::Tensor(slot), Value::Tensor(meta)) = (&target.kind, &value) {
            check_layout(node, meta, slot.contiguous, &slot.expanded)?;
            for (axis, &extent) in target.extents.iter().enumerate() {
                let size = meta.sizes()[axis];
                match &graph.get(extent)?.kind {
                    NodeKind::Constant(Value::Int(expected)) if *expected != size => {
                        return Err(EvalError::type_mismatch(
                            format!("size {} on axis {} of {}", expected, axis, node),
                            size,
                        ));
                    }
                    NodeKind::Symbol(_) => extents.push((extent, size)),
                    _ => {}
                }
            }
        }

        debug!(node = %node, value = %value, ?provenance, "bind");
        for (extent, size) in extents {
            debug!(node = %extent, size, "bind tensor extent");
            self.entries
                .insert(extent, (Value::Int(size), Provenance::External));
        }
        self.entries.insert(node, (value, provenance));
        Ok(())
    }

    /// Bound value or embedded literal of `node`. Never derives anything.
    pub fn lookup(&self, node: NodeId) -> Option<&Value> {
        if let Some((value, _)) = self.entries.get(&node) {
            return Some(value);
        }
        match self.graph.get(node).ok().map(|n| &n.kind) {
            Some(NodeKind::Constant(value)) => Some(value),
            _ => None,
        }
    }

    pub fn provenance(&self, node: NodeId) -> Provenance {
        if let Some((_, provenance)) = self.entries.get(&node) {
            return *provenance;
        }
        match self.graph.get(node).map(|n| &n.kind) {
            Ok(NodeKind::Constant(_)) => Provenance::ConstantFold,
            _ => Provenance::NotYetBound,
        }
    }

    /// Explicit bindings, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Value, Provenance)> {
        self.entries
            .iter()
            .map(|(node, (value, provenance))| (*node, value, *provenance))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_layout(
    node: NodeId,
    meta: &TensorMetadata,
    contiguous: bool,
    expanded: &[bool],
) -> Result<(), EvalError> {
    for (axis, &is_expanded) in expanded.iter().enumerate() {
        let (size, stride) = (meta.sizes()[axis], meta.strides()[axis]);
        if is_expanded && size != 1 && stride != 0 {
            return Err(EvalError::type_mismatch(
                format!("stride 0 on expanded axis {} of {}", axis, node),
                format!("stride {}", stride),
            ));
        }
    }
    if contiguous && !meta.is_contiguous() {
        return Err(EvalError::type_mismatch(
            format!("contiguous tensor for {}", node),
            meta,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::TensorBuilder, values::Pointer};
    use fusor_types::{DataType, PrimDataType};
    use pretty_assertions::assert_eq;

    fn float_tensor(sizes: &[i64], strides: &[i64]) -> Value {
        Value::Tensor(
            TensorMetadata::new(Pointer::new(0x2000, PrimDataType::Float), sizes, strides).unwrap(),
        )
    }

    #[test]
    fn test_bind_and_rebind_leaf() {
        let mut g = Graph::new();
        let a = g.symbol(DataType::Int).unwrap();
        let mut table = BindingTable::new(&g);

        assert_eq!(table.lookup(a), None);
        assert_eq!(table.provenance(a), Provenance::NotYetBound);

        table.bind(a, Value::Int(7), false).unwrap();
        table.bind(a, Value::Int(2), false).unwrap();
        assert_eq!(table.lookup(a), Some(&Value::Int(2)));
        assert_eq!(table.provenance(a), Provenance::External);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_constants_cannot_be_bound() {
        let mut g = Graph::new();
        let e = g.int(0);
        let mut table = BindingTable::new(&g);

        for allow_override in [false, true] {
            assert!(matches!(
                table.bind(e, Value::Int(100), allow_override),
                Err(EvalError::BindingConflict { node, .. }) if node == e
            ));
        }
        assert_eq!(table.lookup(e), Some(&Value::Int(0)));
        assert_eq!(table.provenance(e), Provenance::ConstantFold);
    }

    #[test]
    fn test_operator_nodes_need_override() {
        let mut g = Graph::new();
        let a = g.symbol(DataType::Int).unwrap();
        let b = g.symbol(DataType::Int).unwrap();
        let c = g.add(a, b).unwrap();
        let mut table = BindingTable::new(&g);

        let err = table.bind(c, Value::Int(4), false).unwrap_err();
        assert_eq!(err.to_string(), "cannot bind %2: it is defined by `add`");

        table.bind(c, Value::Int(4), true).unwrap();
        assert_eq!(table.provenance(c), Provenance::Override);
    }

    #[test]
    fn test_type_checked_at_bind_time() {
        let mut g = Graph::new();
        let a = g.symbol(DataType::Int).unwrap();
        let arr = g.symbol(DataType::array(DataType::Int, 5)).unwrap();
        let mut table = BindingTable::new(&g);

        assert_eq!(
            table.bind(a, Value::Double(1.5), false),
            Err(EvalError::TypeMismatch {
                expected: "int".to_string(),
                found: "double 1.5".to_string()
            })
        );
        assert!(matches!(
            table.bind(arr, Value::from(vec![1i64, 2, 3]), false),
            Err(EvalError::TypeMismatch { .. })
        ));
        table
            .bind(arr, Value::from(vec![1i64, 2, 3, 4, 5]), false)
            .unwrap();
    }

    #[test]
    fn test_tensor_bind_sets_extents() {
        let mut g = Graph::new();
        let tv = TensorBuilder::new().shape([-1, 6]).build(&mut g).unwrap();
        let size0 = g.size(tv, 0).unwrap();
        let mut table = BindingTable::new(&g);

        table.bind(tv, float_tensor(&[9, 6], &[8, 1]), false).unwrap();
        assert_eq!(table.lookup(size0), Some(&Value::Int(9)));
        assert_eq!(table.provenance(size0), Provenance::External);

        assert!(matches!(
            table.bind(tv, float_tensor(&[9, 7], &[7, 1]), false),
            Err(EvalError::TypeMismatch { .. })
        ));
        // A failed bind leaves earlier bindings untouched.
        assert_eq!(table.lookup(size0), Some(&Value::Int(9)));
    }

    #[test]
    fn test_tensor_bind_checks_dtype_and_rank() {
        let mut g = Graph::new();
        let tv = g.symbolic_tensor(2, PrimDataType::Half).unwrap();
        let mut table = BindingTable::new(&g);

        assert!(matches!(
            table.bind(tv, float_tensor(&[2, 3], &[3, 1]), false),
            Err(EvalError::TypeMismatch { .. })
        ));
        let half = TensorMetadata::contiguous(Pointer::new(0x10, PrimDataType::Half), &[2, 3, 4])
            .unwrap();
        assert!(matches!(
            table.bind(tv, Value::Tensor(half), false),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_tensor_layout_constraints() {
        let mut g = Graph::new();
        let expanded = TensorBuilder::new()
            .shape([-1, 6])
            .expanded([true, false])
            .build(&mut g)
            .unwrap();
        let contiguous = g.contiguous_tensor(2, PrimDataType::Float).unwrap();
        let mut table = BindingTable::new(&g);

        table
            .bind(expanded, float_tensor(&[9, 6], &[0, 1]), false)
            .unwrap();
        // A size-1 axis may carry any stride.
        table
            .bind(expanded, float_tensor(&[1, 6], &[6, 1]), false)
            .unwrap();
        assert!(matches!(
            table.bind(expanded, float_tensor(&[9, 6], &[6, 1]), false),
            Err(EvalError::TypeMismatch { .. })
        ));

        table
            .bind(contiguous, float_tensor(&[6, 128], &[128, 1]), false)
            .unwrap();
        assert!(matches!(
            table.bind(contiguous, float_tensor(&[9, 6], &[8, 1]), false),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_node() {
        let g = Graph::new();
        let mut other = Graph::new();
        let stray = other.int(1);
        let mut table = BindingTable::new(&g);
        assert_eq!(
            table.bind(stray, Value::Int(1), false),
            Err(EvalError::UnknownNode { node: stray })
        );
        assert_eq!(table.lookup(stray), None);
    }
}
