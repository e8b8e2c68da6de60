use crate::values::TensorMetadataField;
use ecow::EcoString;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    /// Conversion to the node's declared scalar type.
    Cast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    CeilDiv,
    Min,
    Max,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::CeilDiv => "ceil_div",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TernaryOp {
    /// `clamp(x, lo, hi)`
    Clamp,
    /// `lerp(a, b, t)`
    Lerp,
    /// `threshold(x, thresh, value)`
    Threshold,
    /// `where(cond, a, b)`
    Where,
}

impl TernaryOp {
    pub fn name(self) -> &'static str {
        match self {
            TernaryOp::Clamp => "clamp",
            TernaryOp::Lerp => "lerp",
            TernaryOp::Threshold => "threshold",
            TernaryOp::Where => "where",
        }
    }
}

/// Attribute resolved when the `get_attr` node is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attr {
    Field { index: usize, name: EcoString },
    Tensor(TensorMetadataField),
}

impl Attr {
    pub fn name(&self) -> &str {
        match self {
            Attr::Field { name, .. } => name,
            Attr::Tensor(field) => field.name(),
        }
    }
}

/// Operator tag of an operator node. Operand layout per variant:
///
/// | op               | operands                     |
/// |------------------|------------------------------|
/// | `Unary`          | `[x]`                        |
/// | `Binary`         | `[lhs, rhs]`                 |
/// | `Ternary`        | `[a, b, c]`                  |
/// | `ArrayConstruct` | elements                     |
/// | `GetItem`        | `[array, index]`             |
/// | `ReverseArray`   | `[array]`                    |
/// | `StructConstruct`| fields in field-table order  |
/// | `GetAttr`        | `[struct or tensor]`         |
/// | `Metadata`       | `[tensor]`                   |
/// | `Permute`        | `[tensor]`                   |
/// | `Reshape`        | `[tensor, extents...]`       |
/// | `Flatten`        | `[tensor]`                   |
/// | `Expand`         | `[tensor, extents...]`       |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    Unary(UnaryOp),
    Binary(BinaryOp),
    Ternary(TernaryOp),
    ArrayConstruct,
    GetItem,
    ReverseArray,
    StructConstruct,
    GetAttr(Attr),
    Metadata,
    Permute(SmallVec<[usize; 6]>),
    Reshape,
    Flatten { start: usize, end: usize },
    Expand,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Unary(UnaryOp::Neg) => "neg",
            Op::Unary(UnaryOp::Not) => "not",
            Op::Unary(UnaryOp::Cast) => "cast",
            Op::Binary(op) => op.name(),
            Op::Ternary(op) => op.name(),
            Op::ArrayConstruct => "array",
            Op::GetItem => "get_item",
            Op::ReverseArray => "reverse_array",
            Op::StructConstruct => "struct",
            Op::GetAttr(_) => "get_attr",
            Op::Metadata => "metadata",
            Op::Permute(_) => "permute",
            Op::Reshape => "reshape",
            Op::Flatten { .. } => "flatten",
            Op::Expand => "expand",
        }
    }
}
