//! Struct instances.
//!
//! A `StructValue` pairs a shared [`StructType`] with one value per declared
//! field, stored in table order. Fields are read and written through the
//! type's field table; the field set itself is fixed by the type.

use crate::{error::EvalError, values::Value};
use fusor_types::{FieldInfo, StructType};
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    ty: Arc<StructType>,
    fields: Vec<Value>,
}

impl StructValue {
    /// Build an instance from `(name, value)` pairs.
    ///
    /// Every declared field must be supplied exactly once, and each value
    /// must conform to its field's declared type.
    pub fn new<'a>(
        ty: Arc<StructType>,
        fields: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<Self, EvalError> {
        let mut slots: Vec<Option<Value>> = vec![None; ty.len()];
        for (name, value) in fields {
            let accessor = ty.field(name).ok_or_else(|| EvalError::UnknownField {
                owner: ty.name().to_string(),
                field: name.to_string(),
            })?;
            if !value.conforms_to(accessor.ty()) {
                return Err(EvalError::type_mismatch(accessor.ty(), value.describe()));
            }
            if slots[accessor.index].replace(value).is_some() {
                return Err(EvalError::construction(format!(
                    "field `{}` of `{}` supplied more than once",
                    name,
                    ty.name()
                )));
            }
        }

        let mut values = Vec::with_capacity(slots.len());
        for (info, slot) in ty.fields().iter().zip(slots) {
            match slot {
                Some(value) => values.push(value),
                None => {
                    return Err(EvalError::construction(format!(
                        "struct `{}` is missing field `{}`",
                        ty.name(),
                        info.name
                    )));
                }
            }
        }
        Ok(Self { ty, fields: values })
    }

    /// Build an instance from values already in field-table order and
    /// already checked against the field types.
    pub(crate) fn from_ordered(ty: Arc<StructType>, fields: Vec<Value>) -> Self {
        debug_assert_eq!(ty.len(), fields.len());
        Self { ty, fields }
    }

    pub fn ty(&self) -> &Arc<StructType> {
        &self.ty
    }

    pub fn get(&self, name: &str) -> Result<&Value, EvalError> {
        let accessor = self.ty.field(name).ok_or_else(|| self.unknown_field(name))?;
        Ok(&self.fields[accessor.index])
    }

    pub fn get_at(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Replace one field's value. The new value must conform to the field type.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        let index = {
            let accessor = self.ty.field(name).ok_or_else(|| self.unknown_field(name))?;
            if !value.conforms_to(accessor.ty()) {
                return Err(EvalError::type_mismatch(accessor.ty(), value.describe()));
            }
            accessor.index
        };
        self.fields[index] = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldInfo, &Value)> {
        self.ty.fields().iter().zip(&self.fields)
    }

    fn unknown_field(&self, name: &str) -> EvalError {
        EvalError::UnknownField {
            owner: self.ty.name().to_string(),
            field: name.to_string(),
        }
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.ty.name())?;
        for (i, (info, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", info.name, value)?;
        }
        write!(f, " }}")
    }
}
