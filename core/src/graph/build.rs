//! Node constructors.
//!
//! Every constructor type-checks its operands and appends exactly the nodes it
//! needs. Malformed requests are rejected here, so the evaluator can rely on
//! operand types matching the operator.

use super::{Attr, BinaryOp, Graph, Node, NodeId, NodeKind, Op, TernaryOp, UnaryOp};
use crate::{
    error::EvalError,
    values::{StructValue, TensorMetadataField, Value},
    view::{self, ShapeError},
};
use ecow::EcoString;
use fusor_types::{ArrayType, DataType, StructType, TensorType};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

impl Graph {
    // ============================================================================
    // Leaves
    // ============================================================================

    /// Free variable of type `ty`. Tensor inputs are created with
    /// [`TensorBuilder`](super::TensorBuilder) instead.
    pub fn symbol(&mut self, ty: DataType) -> Result<NodeId, EvalError> {
        self.leaf_symbol(None, ty)
    }

    pub fn named_symbol(
        &mut self,
        name: impl Into<EcoString>,
        ty: DataType,
    ) -> Result<NodeId, EvalError> {
        self.leaf_symbol(Some(name.into()), ty)
    }

    pub(super) fn leaf_symbol(
        &mut self,
        name: Option<EcoString>,
        ty: DataType,
    ) -> Result<NodeId, EvalError> {
        if let DataType::Tensor(_) = ty {
            return Err(EvalError::construction(
                "tensor inputs carry extents; build them with `TensorBuilder`",
            ));
        }
        Ok(self.leaf(ty, NodeKind::Symbol(name)))
    }

    pub fn int(&mut self, value: i64) -> NodeId {
        self.leaf(DataType::Int, NodeKind::Constant(Value::Int(value)))
    }

    pub fn double(&mut self, value: f64) -> NodeId {
        self.leaf(DataType::Double, NodeKind::Constant(Value::Double(value)))
    }

    pub fn bool(&mut self, value: bool) -> NodeId {
        self.leaf(DataType::Bool, NodeKind::Constant(Value::Bool(value)))
    }

    /// Literal of any non-tensor type.
    pub fn constant(&mut self, value: Value, ty: DataType) -> Result<NodeId, EvalError> {
        if let DataType::Tensor(_) = ty {
            return Err(EvalError::construction("tensor inputs cannot be literals"));
        }
        if !value.conforms_to(&ty) {
            return Err(EvalError::type_mismatch(&ty, value.describe()));
        }
        Ok(self.leaf(ty, NodeKind::Constant(value)))
    }

    /// Array literal checked against its declared array type.
    pub fn array_literal(
        &mut self,
        values: Vec<Value>,
        ty: ArrayType,
    ) -> Result<NodeId, EvalError> {
        let value = Value::Array(values);
        let ty = DataType::Array(ty);
        if !value.conforms_to(&ty) {
            return Err(EvalError::construction(format!(
                "{} is not compatible with {}",
                value.describe(),
                ty
            )));
        }
        Ok(self.leaf(ty, NodeKind::Constant(value)))
    }

    fn leaf(&mut self, ty: DataType, kind: NodeKind) -> NodeId {
        self.push(Node {
            ty,
            kind,
            extents: SmallVec::new(),
        })
    }

    fn op(&mut self, ty: DataType, op: Op, operands: SmallVec<[NodeId; 3]>) -> NodeId {
        self.push(Node {
            ty,
            kind: NodeKind::Op { op, operands },
            extents: SmallVec::new(),
        })
    }

    // ============================================================================
    // Scalar operators
    // ============================================================================

    pub fn neg(&mut self, x: NodeId) -> Result<NodeId, EvalError> {
        let ty = self.numeric("neg", x)?;
        Ok(self.op(ty, Op::Unary(UnaryOp::Neg), smallvec![x]))
    }

    pub fn not(&mut self, x: NodeId) -> Result<NodeId, EvalError> {
        self.expect_bool("not", x)?;
        Ok(self.op(DataType::Bool, Op::Unary(UnaryOp::Not), smallvec![x]))
    }

    /// Convert between scalar kinds.
    pub fn cast(&mut self, x: NodeId, ty: DataType) -> Result<NodeId, EvalError> {
        let from = self.ty(x)?;
        if !from.is_scalar() {
            return Err(self.invalid_operand("cast", x));
        }
        if !ty.is_scalar() {
            return Err(EvalError::type_mismatch("int, double or bool", &ty));
        }
        Ok(self.op(ty, Op::Unary(UnaryOp::Cast), smallvec![x]))
    }

    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn div(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn modulo(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Mod, lhs, rhs)
    }

    pub fn ceil_div(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::CeilDiv, lhs, rhs)
    }

    pub fn min(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Min, lhs, rhs)
    }

    pub fn max(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Max, lhs, rhs)
    }

    pub fn eq(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Eq, lhs, rhs)
    }

    pub fn ne(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Ne, lhs, rhs)
    }

    pub fn lt(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Lt, lhs, rhs)
    }

    pub fn le(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Le, lhs, rhs)
    }

    pub fn gt(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Gt, lhs, rhs)
    }

    pub fn ge(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Ge, lhs, rhs)
    }

    pub fn and(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::And, lhs, rhs)
    }

    pub fn or(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        self.binary(BinaryOp::Or, lhs, rhs)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Result<NodeId, EvalError> {
        let ty = if op.is_logical() {
            self.expect_bool(op.name(), lhs)?;
            self.expect_bool(op.name(), rhs)?;
            DataType::Bool
        } else if op.is_comparison() {
            let both_bool = matches!(op, BinaryOp::Eq | BinaryOp::Ne)
                && *self.ty(lhs)? == DataType::Bool
                && *self.ty(rhs)? == DataType::Bool;
            if !both_bool {
                self.numeric(op.name(), lhs)?;
                self.numeric(op.name(), rhs)?;
            }
            DataType::Bool
        } else {
            promote(&self.numeric(op.name(), lhs)?, &self.numeric(op.name(), rhs)?)
        };
        Ok(self.op(ty, Op::Binary(op), smallvec![lhs, rhs]))
    }

    /// `max(lo, min(hi, x))`
    pub fn clamp(&mut self, x: NodeId, lo: NodeId, hi: NodeId) -> Result<NodeId, EvalError> {
        self.ternary(TernaryOp::Clamp, x, lo, hi)
    }

    /// `a + t * (b - a)`
    pub fn lerp(&mut self, a: NodeId, b: NodeId, t: NodeId) -> Result<NodeId, EvalError> {
        self.ternary(TernaryOp::Lerp, a, b, t)
    }

    /// `x` if `x > thresh`, otherwise `value`.
    pub fn threshold(
        &mut self,
        x: NodeId,
        thresh: NodeId,
        value: NodeId,
    ) -> Result<NodeId, EvalError> {
        self.ternary(TernaryOp::Threshold, x, thresh, value)
    }

    /// `a` if `cond`, otherwise `b`.
    pub fn where_(&mut self, cond: NodeId, a: NodeId, b: NodeId) -> Result<NodeId, EvalError> {
        self.ternary(TernaryOp::Where, cond, a, b)
    }

    pub fn ternary(
        &mut self,
        op: TernaryOp,
        a: NodeId,
        b: NodeId,
        c: NodeId,
    ) -> Result<NodeId, EvalError> {
        let name = op.name();
        let ty = match op {
            TernaryOp::Clamp | TernaryOp::Lerp => {
                let ab = promote(&self.numeric(name, a)?, &self.numeric(name, b)?);
                promote(&ab, &self.numeric(name, c)?)
            }
            TernaryOp::Threshold => {
                self.numeric(name, b)?;
                promote(&self.numeric(name, a)?, &self.numeric(name, c)?)
            }
            TernaryOp::Where => {
                self.expect_bool(name, a)?;
                let (then_ty, else_ty) = (self.ty(b)?, self.ty(c)?);
                if then_ty.is_numeric() && else_ty.is_numeric() {
                    promote(then_ty, else_ty)
                } else if then_ty == else_ty {
                    then_ty.clone()
                } else {
                    return Err(EvalError::type_mismatch(then_ty, else_ty));
                }
            }
        };
        Ok(self.op(ty, Op::Ternary(op), smallvec![a, b, c]))
    }

    // ============================================================================
    // Arrays and structs
    // ============================================================================

    /// Array of the given elements, which must all share one type.
    pub fn array(&mut self, elements: &[NodeId]) -> Result<NodeId, EvalError> {
        let Some((&first, rest)) = elements.split_first() else {
            return Err(EvalError::construction(
                "an empty array has no element type; use `array_literal`",
            ));
        };
        let elem = self.ty(first)?.clone();
        for &element in rest {
            let ty = self.ty(element)?;
            if *ty != elem {
                return Err(EvalError::type_mismatch(&elem, ty));
            }
        }
        let ty = DataType::array(elem, elements.len());
        Ok(self.op(ty, Op::ArrayConstruct, elements.iter().copied().collect()))
    }

    /// Zero-based element access; the index is bounds-checked at evaluation.
    pub fn get_item(&mut self, array: NodeId, index: NodeId) -> Result<NodeId, EvalError> {
        let elem = match self.ty(array)? {
            DataType::Array(array) => array.elem().clone(),
            _ => return Err(self.invalid_operand("get_item", array)),
        };
        if *self.ty(index)? != DataType::Int {
            return Err(EvalError::type_mismatch(DataType::Int, self.ty(index)?));
        }
        Ok(self.op(elem, Op::GetItem, smallvec![array, index]))
    }

    pub fn reverse_array(&mut self, array: NodeId) -> Result<NodeId, EvalError> {
        let ty = self.ty(array)?.clone();
        if ty.as_array().is_none() {
            return Err(self.invalid_operand("reverse_array", array));
        }
        Ok(self.op(ty, Op::ReverseArray, smallvec![array]))
    }

    /// Struct instance of `ty`. Every declared field must be given exactly once.
    pub fn struct_construct(
        &mut self,
        ty: Arc<StructType>,
        fields: &[(&str, NodeId)],
    ) -> Result<NodeId, EvalError> {
        let mut slots: SmallVec<[Option<NodeId>; 4]> = SmallVec::from_elem(None, ty.len());
        for &(name, node) in fields {
            let accessor = ty.field(name).ok_or_else(|| EvalError::UnknownField {
                owner: ty.name().to_string(),
                field: name.to_string(),
            })?;
            let node_ty = self.ty(node)?;
            if node_ty != accessor.ty() {
                return Err(EvalError::type_mismatch(accessor.ty(), node_ty));
            }
            if slots[accessor.index].replace(node).is_some() {
                return Err(EvalError::construction(format!(
                    "field `{}` of `{}` supplied more than once",
                    name,
                    ty.name()
                )));
            }
        }
        let mut operands = SmallVec::with_capacity(slots.len());
        for (info, slot) in ty.fields().iter().zip(slots) {
            match slot {
                Some(node) => operands.push(node),
                None => {
                    return Err(EvalError::construction(format!(
                        "struct `{}` is missing field `{}`",
                        ty.name(),
                        info.name
                    )));
                }
            }
        }
        Ok(self.op(DataType::Struct(ty), Op::StructConstruct, operands))
    }

    /// Struct literal, embedded as a constant.
    pub fn struct_literal(&mut self, value: StructValue) -> NodeId {
        let ty = DataType::Struct(value.ty().clone());
        self.leaf(ty, NodeKind::Constant(Value::Struct(value)))
    }

    /// Field of a struct, or a field of a tensor's metadata record.
    pub fn get_attr(&mut self, node: NodeId, name: &str) -> Result<NodeId, EvalError> {
        let (attr, ty) = match self.ty(node)? {
            DataType::Struct(st) => {
                let accessor = st.field(name).ok_or_else(|| EvalError::UnknownField {
                    owner: st.name().to_string(),
                    field: name.to_string(),
                })?;
                let attr = Attr::Field {
                    index: accessor.index,
                    name: accessor.info.name.clone(),
                };
                (attr, accessor.ty().clone())
            }
            DataType::Tensor(tt) | DataType::TensorMetadata(tt) => {
                let field = TensorMetadataField::from_name(name).ok_or_else(|| {
                    EvalError::UnknownField {
                        owner: DataType::TensorMetadata(*tt).to_string(),
                        field: name.to_string(),
                    }
                })?;
                (Attr::Tensor(field), field.ty(*tt))
            }
            _ => return Err(self.invalid_operand("get_attr", node)),
        };
        Ok(self.op(ty, Op::GetAttr(attr), smallvec![node]))
    }

    // ============================================================================
    // Tensors
    // ============================================================================

    /// Metadata record (data pointer, sizes, strides) of a tensor.
    pub fn metadata(&mut self, tensor: NodeId) -> Result<NodeId, EvalError> {
        let tt = self.tensor_type("metadata", tensor)?;
        Ok(self.op(DataType::TensorMetadata(tt), Op::Metadata, smallvec![tensor]))
    }

    /// Extent node of `axis`. No node is created.
    pub fn size(&self, tensor: NodeId, axis: usize) -> Result<NodeId, EvalError> {
        let extents = self.extents(tensor)?;
        extents
            .get(axis)
            .copied()
            .ok_or(EvalError::IndexOutOfRange {
                index: axis as i64,
                len: extents.len(),
            })
    }

    pub fn permute(&mut self, tensor: NodeId, order: &[usize]) -> Result<NodeId, EvalError> {
        let tt = self.tensor_type("permute", tensor)?;
        view::check_permutation(order, tt.rank)?;
        let extents = self.extents(tensor)?;
        let extents = order.iter().map(|&axis| extents[axis]).collect();
        Ok(self.tensor_op(tt, Op::Permute(order.into()), smallvec![tensor], extents))
    }

    /// Reshape to one axis per `target` extent.
    pub fn reshape(&mut self, tensor: NodeId, target: &[NodeId]) -> Result<NodeId, EvalError> {
        let tt = self.tensor_type("reshape", tensor)?;
        self.expect_extents(target)?;
        Ok(self.view_op(TensorType::new(tt.dtype, target.len()), Op::Reshape, tensor, target))
    }

    /// Merge axes `start..=end`. The merged extent is the product of the
    /// merged input extents.
    pub fn flatten(&mut self, tensor: NodeId, start: usize, end: usize) -> Result<NodeId, EvalError> {
        let tt = self.tensor_type("flatten", tensor)?;
        let input: SmallVec<[NodeId; 4]> = self.extents(tensor)?.into();
        let extents = if tt.rank == 0 && start == 0 && end == 0 {
            smallvec![self.int(1)]
        } else {
            if start > end || end >= tt.rank {
                return Err(ShapeError::InvalidDimRange {
                    start,
                    end,
                    rank: tt.rank,
                }
                .into());
            }
            let mut merged = input[start];
            for &extent in &input[start + 1..=end] {
                merged = self.mul(merged, extent)?;
            }
            let mut extents: SmallVec<[NodeId; 4]> = input[..start].into();
            extents.push(merged);
            extents.extend_from_slice(&input[end + 1..]);
            extents
        };
        let ty = TensorType::new(tt.dtype, extents.len());
        Ok(self.tensor_op(ty, Op::Flatten { start, end }, smallvec![tensor], extents))
    }

    /// Broadcast size-1 axes to `target`; extra leading extents add new axes.
    pub fn expand(&mut self, tensor: NodeId, target: &[NodeId]) -> Result<NodeId, EvalError> {
        let tt = self.tensor_type("expand", tensor)?;
        if target.len() < tt.rank {
            return Err(ShapeError::RankMismatch {
                expected: tt.rank,
                found: target.len(),
            }
            .into());
        }
        self.expect_extents(target)?;
        Ok(self.view_op(TensorType::new(tt.dtype, target.len()), Op::Expand, tensor, target))
    }

    fn view_op(&mut self, ty: TensorType, op: Op, tensor: NodeId, target: &[NodeId]) -> NodeId {
        let mut operands: SmallVec<[NodeId; 3]> = smallvec![tensor];
        operands.extend_from_slice(target);
        self.tensor_op(ty, op, operands, target.into())
    }

    fn tensor_op(
        &mut self,
        ty: TensorType,
        op: Op,
        operands: SmallVec<[NodeId; 3]>,
        extents: SmallVec<[NodeId; 4]>,
    ) -> NodeId {
        self.push(Node {
            ty: DataType::Tensor(ty),
            kind: NodeKind::Op { op, operands },
            extents,
        })
    }

    pub(super) fn tensor_input(
        &mut self,
        ty: TensorType,
        slot: super::TensorSlot,
        extents: SmallVec<[NodeId; 4]>,
    ) -> NodeId {
        self.push(Node {
            ty: DataType::Tensor(ty),
            kind: NodeKind::Tensor(slot),
            extents,
        })
    }

    // ============================================================================
    // Operand checks
    // ============================================================================

    fn numeric(&self, op: &'static str, node: NodeId) -> Result<DataType, EvalError> {
        let ty = self.ty(node)?;
        if ty.is_numeric() {
            Ok(ty.clone())
        } else {
            Err(self.invalid_operand(op, node))
        }
    }

    fn expect_bool(&self, op: &'static str, node: NodeId) -> Result<(), EvalError> {
        if *self.ty(node)? == DataType::Bool {
            Ok(())
        } else {
            Err(self.invalid_operand(op, node))
        }
    }

    fn expect_extents(&self, extents: &[NodeId]) -> Result<(), EvalError> {
        for &extent in extents {
            let ty = self.ty(extent)?;
            if *ty != DataType::Int {
                return Err(EvalError::type_mismatch(DataType::Int, ty));
            }
        }
        Ok(())
    }

    fn tensor_type(&self, op: &'static str, node: NodeId) -> Result<TensorType, EvalError> {
        match self.ty(node)? {
            DataType::Tensor(tt) => Ok(*tt),
            _ => Err(self.invalid_operand(op, node)),
        }
    }

    fn invalid_operand(&self, op: &'static str, node: NodeId) -> EvalError {
        let found = match self.ty(node) {
            Ok(ty) => format!("{} of type {}", node, ty),
            Err(err) => return err,
        };
        EvalError::InvalidOperand { op, found }
    }
}

/// Result type of a numeric operator: int only if both sides are int.
fn promote(lhs: &DataType, rhs: &DataType) -> DataType {
    if lhs.is_integral() && rhs.is_integral() {
        DataType::Int
    } else {
        DataType::Double
    }
}
