use crate::{
    error::EvalError,
    values::{Pointer, StructValue, TensorMetadata, TensorMetadataField},
};
use fusor_types::DataType;
use std::fmt;

/// A concrete runtime quantity produced by the evaluator.
///
/// The set of variants is closed: every operator matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    /// Homogeneous, ordered sequence.
    Array(Vec<Value>),
    Struct(StructValue),
    Tensor(TensorMetadata),
    Pointer(Pointer),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Tensor(_) => "tensor",
            Value::Pointer(_) => "pointer",
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Array(elements) => format!("array of length {}", elements.len()),
            Value::Struct(s) => format!("struct `{}`", s.ty().name()),
            Value::Tensor(meta) => format!("tensor<{}, {}>", meta.dtype(), meta.rank()),
            Value::Pointer(ptr) => format!("ptr<{}>", ptr.dtype()),
            scalar => format!("{} {}", scalar.kind_name(), scalar),
        }
    }

    // ============================================================================
    // Dynamic accessors
    // ============================================================================

    /// Extract integer value.
    ///
    /// Returns error if value is not an Int.
    pub fn as_int(&self) -> Result<i64, EvalError> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(other.mismatch("int")),
        }
    }

    /// Extract double value.
    ///
    /// Returns error if value is not a Double. Integers are not promoted; use
    /// [`Value::as_number`] for that.
    pub fn as_double(&self) -> Result<f64, EvalError> {
        match self {
            Value::Double(v) => Ok(*v),
            other => Err(other.mismatch("double")),
        }
    }

    /// Extract a numeric value, promoting integers to doubles.
    pub fn as_number(&self) -> Result<f64, EvalError> {
        match self {
            Value::Int(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            other => Err(other.mismatch("number")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_array(&self) -> Result<&[Value], EvalError> {
        match self {
            Value::Array(elements) => Ok(elements),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn as_struct(&self) -> Result<&StructValue, EvalError> {
        match self {
            Value::Struct(s) => Ok(s),
            other => Err(other.mismatch("struct")),
        }
    }

    pub fn as_tensor(&self) -> Result<&TensorMetadata, EvalError> {
        match self {
            Value::Tensor(meta) => Ok(meta),
            other => Err(other.mismatch("tensor")),
        }
    }

    pub fn as_pointer(&self) -> Result<Pointer, EvalError> {
        match self {
            Value::Pointer(ptr) => Ok(*ptr),
            other => Err(other.mismatch("pointer")),
        }
    }

    /// Extract an array of integers.
    pub fn to_int_vec(&self) -> Result<Vec<i64>, EvalError> {
        self.as_array()?.iter().map(Value::as_int).collect()
    }

    // ============================================================================
    // Element and attribute access
    // ============================================================================

    /// Zero-based, bounds-checked indexing into an array.
    pub fn item(&self, index: i64) -> Result<Value, EvalError> {
        let elements = self.as_array()?;
        usize::try_from(index)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .ok_or(EvalError::IndexOutOfRange {
                index,
                len: elements.len(),
            })
    }

    /// Read a struct field or a tensor metadata field by name.
    pub fn attr(&self, name: &str) -> Result<Value, EvalError> {
        match self {
            Value::Struct(s) => s.get(name).cloned(),
            Value::Tensor(meta) => TensorMetadataField::from_name(name)
                .map(|field| meta.field(field))
                .ok_or_else(|| EvalError::UnknownField {
                    owner: "tensor metadata".to_string(),
                    field: name.to_string(),
                }),
            other => Err(EvalError::InvalidOperand {
                op: "get_attr",
                found: other.describe(),
            }),
        }
    }

    /// Whether this value is an instance of `ty`.
    ///
    /// The match is exact: no numeric promotion, array lengths must agree,
    /// and tensors must have the declared element type and rank.
    pub fn conforms_to(&self, ty: &DataType) -> bool {
        match (self, ty) {
            (Value::Int(_), DataType::Int)
            | (Value::Double(_), DataType::Double)
            | (Value::Bool(_), DataType::Bool) => true,
            (Value::Array(elements), DataType::Array(array)) => {
                elements.len() == array.len()
                    && elements.iter().all(|e| e.conforms_to(array.elem()))
            }
            (Value::Struct(s), DataType::Struct(st)) => {
                std::sync::Arc::ptr_eq(s.ty(), st) || **s.ty() == **st
            }
            (Value::Tensor(meta), DataType::Tensor(tt) | DataType::TensorMetadata(tt)) => {
                meta.dtype() == tt.dtype && meta.rank() == tt.rank
            }
            (Value::Pointer(ptr), DataType::Pointer(dtype)) => ptr.dtype() == *dtype,
            _ => false,
        }
    }

    fn mismatch(&self, expected: &str) -> EvalError {
        EvalError::type_mismatch(expected, self.describe())
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(values: Vec<i64>) -> Self {
        Value::Array(values.into_iter().map(Value::Int).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl From<StructValue> for Value {
    fn from(v: StructValue) -> Self {
        Value::Struct(v)
    }
}

impl From<TensorMetadata> for Value {
    fn from(v: TensorMetadata) -> Self {
        Value::Tensor(v)
    }
}

impl From<Pointer> for Value {
    fn from(v: Pointer) -> Self {
        Value::Pointer(v)
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => format_double(f, *v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, "]")
            }
            Value::Struct(s) => write!(f, "{}", s),
            Value::Tensor(meta) => write!(f, "{}", meta),
            Value::Pointer(ptr) => write!(f, "{}", ptr),
        }
    }
}

/// Format a double so that it always reads as a double.
fn format_double(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        write!(f, "nan")
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            write!(f, "inf")
        } else {
            write!(f, "-inf")
        }
    } else {
        let s = value.to_string();
        if s.contains('.') || s.contains('e') || s.contains('E') {
            write!(f, "{}", s)
        } else {
            write!(f, "{}.0", s)
        }
    }
}
