//! Scalar operator implementations.

use crate::{
    error::EvalError,
    graph::{BinaryOp, TernaryOp},
    values::Value,
};
use fusor_types::DataType;

/// Dispatch a binary operator on concrete operands.
///
/// Two ints stay int; any double operand promotes both sides to double.
pub(super) fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => eval_binary_int(op, *l, *r),
        (Value::Bool(l), Value::Bool(r)) => eval_binary_bool(op, *l, *r),
        (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
            eval_binary_float(op, left.as_number()?, right.as_number()?)
        }
        _ => Err(EvalError::InvalidOperand {
            op: op.name(),
            found: format!("{} and {}", left.describe(), right.describe()),
        }),
    }
}

/// Evaluate a binary operation on two integers.
///
/// Uses wrapping arithmetic to prevent panics on overflow.
/// Division by zero returns an error.
pub(super) fn eval_binary_int(op: BinaryOp, left: i64, right: i64) -> Result<Value, EvalError> {
    let checked = |op: BinaryOp| {
        if right == 0 {
            Err(EvalError::DivisionByZero { op: op.name() })
        } else {
            Ok(())
        }
    };
    let result = match op {
        BinaryOp::Add => left.wrapping_add(right),
        BinaryOp::Sub => left.wrapping_sub(right),
        BinaryOp::Mul => left.wrapping_mul(right),
        BinaryOp::Div => {
            checked(op)?;
            left.wrapping_div(right)
        }
        BinaryOp::Mod => {
            checked(op)?;
            left.wrapping_rem(right)
        }
        BinaryOp::CeilDiv => {
            checked(op)?;
            ceil_div(left, right)
        }
        BinaryOp::Min => left.min(right),
        BinaryOp::Max => left.max(right),
        BinaryOp::Eq => return Ok(Value::Bool(left == right)),
        BinaryOp::Ne => return Ok(Value::Bool(left != right)),
        BinaryOp::Lt => return Ok(Value::Bool(left < right)),
        BinaryOp::Le => return Ok(Value::Bool(left <= right)),
        BinaryOp::Gt => return Ok(Value::Bool(left > right)),
        BinaryOp::Ge => return Ok(Value::Bool(left >= right)),
        BinaryOp::And | BinaryOp::Or => {
            return Err(EvalError::InvalidOperand {
                op: op.name(),
                found: "int".to_string(),
            });
        }
    };
    Ok(Value::Int(result))
}

/// Quotient rounded toward positive infinity. `right` must be nonzero.
fn ceil_div(left: i64, right: i64) -> i64 {
    let quotient = left.wrapping_div(right);
    let remainder = left.wrapping_rem(right);
    if remainder != 0 && (remainder < 0) == (right < 0) {
        quotient.wrapping_add(1)
    } else {
        quotient
    }
}

/// Evaluate a binary operation on two doubles.
///
/// Follows IEEE 754 semantics (produces inf/nan rather than panicking).
pub(super) fn eval_binary_float(op: BinaryOp, left: f64, right: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Mod => left % right,
        BinaryOp::CeilDiv => (left / right).ceil(),
        BinaryOp::Min => left.min(right),
        BinaryOp::Max => left.max(right),
        BinaryOp::Eq => return Ok(Value::Bool(left == right)),
        BinaryOp::Ne => return Ok(Value::Bool(left != right)),
        BinaryOp::Lt => return Ok(Value::Bool(left < right)),
        BinaryOp::Le => return Ok(Value::Bool(left <= right)),
        BinaryOp::Gt => return Ok(Value::Bool(left > right)),
        BinaryOp::Ge => return Ok(Value::Bool(left >= right)),
        BinaryOp::And | BinaryOp::Or => {
            return Err(EvalError::InvalidOperand {
                op: op.name(),
                found: "double".to_string(),
            });
        }
    };
    Ok(Value::Double(result))
}

pub(super) fn eval_binary_bool(op: BinaryOp, left: bool, right: bool) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And => Ok(Value::Bool(left && right)),
        BinaryOp::Or => Ok(Value::Bool(left || right)),
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        _ => Err(EvalError::InvalidOperand {
            op: op.name(),
            found: "bool".to_string(),
        }),
    }
}

pub(super) fn eval_neg(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Int(v) => Ok(Value::Int(v.wrapping_neg())),
        Value::Double(v) => Ok(Value::Double(-v)),
        other => Err(EvalError::InvalidOperand {
            op: "neg",
            found: other.describe(),
        }),
    }
}

pub(super) fn eval_not(value: &Value) -> Result<Value, EvalError> {
    Ok(Value::Bool(!value.as_bool()?))
}

/// Convert a scalar to `ty`. Doubles truncate toward zero; anything nonzero
/// is `true`.
pub(super) fn eval_cast(value: &Value, ty: &DataType) -> Result<Value, EvalError> {
    let converted = match (value, ty) {
        (Value::Int(v), DataType::Int) => Value::Int(*v),
        (Value::Int(v), DataType::Double) => Value::Double(*v as f64),
        (Value::Int(v), DataType::Bool) => Value::Bool(*v != 0),
        (Value::Double(v), DataType::Int) => Value::Int(*v as i64),
        (Value::Double(v), DataType::Double) => Value::Double(*v),
        (Value::Double(v), DataType::Bool) => Value::Bool(*v != 0.0),
        (Value::Bool(v), DataType::Int) => Value::Int(i64::from(*v)),
        (Value::Bool(v), DataType::Double) => Value::Double(if *v { 1.0 } else { 0.0 }),
        (Value::Bool(v), DataType::Bool) => Value::Bool(*v),
        (other, ty) => return Err(EvalError::type_mismatch(ty, other.describe())),
    };
    Ok(converted)
}

/// Evaluate a ternary operator. All three operands are already evaluated;
/// only the selection is conditional.
pub(super) fn eval_ternary(
    op: TernaryOp,
    a: &Value,
    b: &Value,
    c: &Value,
) -> Result<Value, EvalError> {
    match op {
        TernaryOp::Clamp => {
            let (x, lo, hi) = (a, b, c);
            match (x, lo, hi) {
                (Value::Int(x), Value::Int(lo), Value::Int(hi)) => {
                    Ok(Value::Int((*lo).max((*hi).min(*x))))
                }
                _ => Ok(Value::Double(
                    lo.as_number()?.max(hi.as_number()?.min(x.as_number()?)),
                )),
            }
        }
        TernaryOp::Lerp => {
            let (start, end, weight) = (a, b, c);
            match (start, end, weight) {
                (Value::Int(s), Value::Int(e), Value::Int(w)) => Ok(Value::Int(
                    s.wrapping_add(w.wrapping_mul(e.wrapping_sub(*s))),
                )),
                _ => {
                    let (s, e, w) = (start.as_number()?, end.as_number()?, weight.as_number()?);
                    Ok(Value::Double(s + w * (e - s)))
                }
            }
        }
        TernaryOp::Threshold => {
            let (x, thresh, value) = (a, b, c);
            if x.as_number()? > thresh.as_number()? {
                Ok(x.clone())
            } else {
                Ok(value.clone())
            }
        }
        TernaryOp::Where => Ok(if a.as_bool()? { b.clone() } else { c.clone() }),
    }
}

/// Widen an int result to double when the node is declared double.
pub(super) fn coerce(value: Value, ty: &DataType) -> Value {
    match (value, ty) {
        (Value::Int(v), DataType::Double) => Value::Double(v as f64),
        (value, _) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(op: BinaryOp, l: i64, r: i64) -> Value {
        eval_binary_int(op, l, r).unwrap()
    }

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(int(BinaryOp::Add, 7, 3), Value::Int(10));
        assert_eq!(int(BinaryOp::Sub, 2, 5), Value::Int(-3));
        assert_eq!(int(BinaryOp::Mul, 4, 10), Value::Int(40));
        assert_eq!(int(BinaryOp::Mod, 7, 3), Value::Int(1));
        assert_eq!(int(BinaryOp::Mod, -7, 3), Value::Int(-1));
        assert_eq!(int(BinaryOp::Div, -7, 2), Value::Int(-3));
        assert_eq!(int(BinaryOp::Min, -7, 2), Value::Int(-7));
    }

    #[test]
    fn test_int_ceil_div() {
        assert_eq!(int(BinaryOp::CeilDiv, 7, 3), Value::Int(3));
        assert_eq!(int(BinaryOp::CeilDiv, 6, 3), Value::Int(2));
        assert_eq!(int(BinaryOp::CeilDiv, 2, 5), Value::Int(1));
        assert_eq!(int(BinaryOp::CeilDiv, -7, 3), Value::Int(-2));
        assert_eq!(int(BinaryOp::CeilDiv, 7, -3), Value::Int(-2));
        assert_eq!(int(BinaryOp::CeilDiv, -7, -3), Value::Int(3));
        assert_eq!(int(BinaryOp::CeilDiv, 129, 5), Value::Int(26));
    }

    #[test]
    fn test_int_div_by_zero() {
        for op in [BinaryOp::Div, BinaryOp::Mod, BinaryOp::CeilDiv] {
            assert_eq!(
                eval_binary_int(op, 10, 0),
                Err(EvalError::DivisionByZero { op: op.name() })
            );
        }
    }

    #[test]
    fn test_int_wrapping_overflow() {
        assert_eq!(int(BinaryOp::Add, i64::MAX, 1), Value::Int(i64::MIN));
        assert_eq!(int(BinaryOp::Mul, i64::MAX, 2), Value::Int(-2));
        assert_eq!(int(BinaryOp::Div, i64::MIN, -1), Value::Int(i64::MIN));
        assert_eq!(eval_neg(&Value::Int(i64::MIN)).unwrap(), Value::Int(i64::MIN));
    }

    #[test]
    fn test_float_ops() {
        let ceil = eval_binary_float(BinaryOp::CeilDiv, 10.0 - 2.0, 3.0).unwrap();
        assert_eq!(ceil, Value::Double(3.0));
        let rem = eval_binary_float(BinaryOp::Mod, -7.5, 2.0).unwrap();
        assert_eq!(rem, Value::Double(-1.5));
        // Float division by zero produces infinity (IEEE 754)
        let inf = eval_binary_float(BinaryOp::Div, 1.0, 0.0).unwrap();
        assert_eq!(inf, Value::Double(f64::INFINITY));
    }

    #[test]
    fn test_mixed_promotes() {
        assert_eq!(
            eval_binary(BinaryOp::Add, &Value::Int(1), &Value::Double(0.5)).unwrap(),
            Value::Double(1.5)
        );
        assert_eq!(
            eval_binary(BinaryOp::Lt, &Value::Double(0.5), &Value::Int(1)).unwrap(),
            Value::Bool(true)
        );
        assert!(matches!(
            eval_binary(BinaryOp::Add, &Value::Int(1), &Value::Bool(true)),
            Err(EvalError::InvalidOperand { op: "add", .. })
        ));
    }

    #[test]
    fn test_cast() {
        assert_eq!(
            eval_cast(&Value::Double(-2.7), &DataType::Int).unwrap(),
            Value::Int(-2)
        );
        assert_eq!(
            eval_cast(&Value::Bool(true), &DataType::Double).unwrap(),
            Value::Double(1.0)
        );
        assert_eq!(
            eval_cast(&Value::Int(0), &DataType::Bool).unwrap(),
            Value::Bool(false)
        );
        assert!(matches!(
            eval_cast(&Value::from(vec![1i64]), &DataType::Int),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_ternary() {
        let (a, b, c, d) = (
            Value::Double(7.0),
            Value::Double(3.8),
            Value::Double(0.8),
            Value::Double(0.2),
        );
        let clamp = |x, lo, hi| eval_ternary(TernaryOp::Clamp, x, lo, hi).unwrap();
        assert_eq!(clamp(&b, &c, &a), b);
        assert_eq!(clamp(&a, &c, &b), b);
        assert_eq!(clamp(&d, &c, &b), c);

        assert_eq!(
            eval_ternary(TernaryOp::Lerp, &a, &b, &d).unwrap(),
            Value::Double(7.0 + 0.2 * (3.8 - 7.0))
        );
        assert_eq!(eval_ternary(TernaryOp::Threshold, &d, &d, &b).unwrap(), b);
        assert_eq!(
            eval_ternary(TernaryOp::Where, &Value::Bool(false), &a, &b).unwrap(),
            b
        );
        assert_eq!(
            eval_ternary(
                TernaryOp::Clamp,
                &Value::Int(12),
                &Value::Int(0),
                &Value::Int(10)
            )
            .unwrap(),
            Value::Int(10)
        );
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(Value::Int(3), &DataType::Double), Value::Double(3.0));
        assert_eq!(coerce(Value::Int(3), &DataType::Int), Value::Int(3));
    }
}
