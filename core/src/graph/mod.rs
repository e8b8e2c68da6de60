//! Symbolic program graph.
//!
//! A [`Graph`] is an append-only arena of immutable [`Node`]s addressed by
//! [`NodeId`]. Operands are always appended before their users, so arena order
//! is a topological order and the graph can never contain a cycle.
//!
//! Evaluation state never lives here: any number of evaluator sessions may
//! share one graph.

mod build;
mod op;
mod tensor_builder;


pub use op::{Attr, BinaryOp, Op, TernaryOp, UnaryOp};
pub use tensor_builder::TensorBuilder;

use crate::{error::EvalError, values::Value};
use ecow::EcoString;
use fusor_types::DataType;
use smallvec::SmallVec;
use std::fmt;

/// Stable identity of a node inside its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Layout constraints declared on a tensor input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSlot {
    /// Per axis: the bound tensor must broadcast this axis (stride 0).
    pub expanded: SmallVec<[bool; 6]>,
    /// The bound tensor must be row-major contiguous.
    pub contiguous: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Free variable, bound per session.
    Symbol(Option<EcoString>),
    /// Literal embedded in the graph.
    Constant(Value),
    /// Tensor input, bound per session to a metadata record.
    Tensor(TensorSlot),
    Op {
        op: Op,
        operands: SmallVec<[NodeId; 3]>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub ty: DataType,
    pub kind: NodeKind,
    /// One integer node per axis for tensor-typed nodes; empty otherwise.
    pub extents: SmallVec<[NodeId; 4]>,
}

impl Node {
    pub fn operands(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Op { operands, .. } => operands,
            _ => &[],
        }
    }

    /// Constants and operator nodes have a definition; symbols and tensor
    /// inputs do not.
    pub fn is_structurally_defined(&self) -> bool {
        matches!(self.kind, NodeKind::Constant(_) | NodeKind::Op { .. })
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Symbol(name) => name.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

static_assertions::assert_impl_all!(Graph: Send, Sync);

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, EvalError> {
        self.nodes
            .get(id.index())
            .ok_or(EvalError::UnknownNode { node: id })
    }

    pub fn ty(&self, id: NodeId) -> Result<&DataType, EvalError> {
        Ok(&self.get(id)?.ty)
    }

    pub fn operands(&self, id: NodeId) -> Result<&[NodeId], EvalError> {
        Ok(self.get(id)?.operands())
    }

    pub fn extents(&self, id: NodeId) -> Result<&[NodeId], EvalError> {
        Ok(&self.get(id)?.extents)
    }

    pub fn is_structurally_defined(&self, id: NodeId) -> Result<bool, EvalError> {
        Ok(self.get(id)?.is_structurally_defined())
    }

    /// All node ids in topological order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.ids().zip(&self.nodes)
    }

    fn push(&mut self, node: Node) -> NodeId {
        debug_assert!(
            node.operands()
                .iter()
                .chain(&node.extents)
                .all(|operand| operand.index() < self.nodes.len()),
            "operands must precede their users"
        );
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, node) in self.iter() {
            write!(f, "{} : {} = ", id, node.ty)?;
            match &node.kind {
                NodeKind::Symbol(Some(name)) => write!(f, "symbol {}", name)?,
                NodeKind::Symbol(None) => write!(f, "symbol")?,
                NodeKind::Constant(value) => write!(f, "{}", value)?,
                NodeKind::Tensor(_) => write!(f, "input")?,
                NodeKind::Op { op, operands } => {
                    write!(f, "{}", op.name())?;
                    for (i, operand) in operands.iter().enumerate() {
                        write!(f, "{}{}", if i == 0 { " " } else { ", " }, operand)?;
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
