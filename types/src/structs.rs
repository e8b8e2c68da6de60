//! Struct types with a statically declared field table.
//!
//! A `StructType` is defined once, up front, with an ordered list of fields.
//! The name → index map is built at definition time so that attribute lookups
//! can be resolved to a field index once and never hashed again on the
//! evaluation path.

use crate::{DataType, TypeError};
use ecow::EcoString;
use hashbrown::HashMap;
use std::fmt;

/// One entry of a struct's field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: EcoString,
    pub ty: DataType,
    /// Whether generated kernels read this field.
    pub used_in_kernel: bool,
}

impl FieldInfo {
    pub fn new(name: impl Into<EcoString>, ty: DataType) -> Self {
        Self {
            name: name.into(),
            ty,
            used_in_kernel: true,
        }
    }

    pub fn host_only(mut self) -> Self {
        self.used_in_kernel = false;
        self
    }
}

/// A field resolved by name: its position in the table and its type.
#[derive(Debug, Clone, Copy)]
pub struct FieldAccessor<'a> {
    pub index: usize,
    pub info: &'a FieldInfo,
}

impl FieldAccessor<'_> {
    pub fn ty(&self) -> &DataType {
        &self.info.ty
    }
}

#[derive(Debug, Clone)]
pub struct StructType {
    name: EcoString,
    fields: Vec<FieldInfo>,
    index: HashMap<EcoString, usize>,
}

impl StructType {
    /// Define a struct type. Field order is preserved.
    pub fn new(
        name: impl Into<EcoString>,
        fields: impl IntoIterator<Item = FieldInfo>,
    ) -> Result<Self, TypeError> {
        let name = name.into();
        let fields: Vec<FieldInfo> = fields.into_iter().collect();
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(TypeError::DuplicateField {
                    struct_name: name,
                    field: field.name.clone(),
                });
            }
        }
        Ok(Self {
            name,
            fields,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve a field by name.
    pub fn field(&self, name: &str) -> Option<FieldAccessor<'_>> {
        let index = *self.index.get(name)?;
        Some(FieldAccessor {
            index,
            info: &self.fields[index],
        })
    }

    pub fn field_at(&self, index: usize) -> Option<&FieldInfo> {
        self.fields.get(index)
    }
}

impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        // The index is derived from `fields`.
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for StructType {}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "struct {} {{", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", field.name, field.ty)?;
        }
        write!(f, " }}")
    }
}
