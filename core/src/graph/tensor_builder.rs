use super::{Graph, NodeId, TensorSlot};
use crate::error::EvalError;
use ecow::{EcoString, eco_format};
use fusor_types::{PrimDataType, TensorType};
use smallvec::SmallVec;

/// Builder for tensor inputs.
///
/// Each axis gets an extent node: a fresh integer symbol for a `-1` entry in
/// the shape, or an integer constant otherwise. Binding the tensor later binds
/// the symbolic extents and checks the constant ones.
///
/// ```
/// use fusor_core::graph::{Graph, TensorBuilder};
/// use fusor_types::PrimDataType;
///
/// let mut graph = Graph::new();
/// let tv = TensorBuilder::new()
///     .shape([-1, 6])
///     .dtype(PrimDataType::Float)
///     .expanded([true, false])
///     .build(&mut graph)
///     .unwrap();
/// assert_eq!(graph.extents(tv).unwrap().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct TensorBuilder {
    shape: Option<Vec<i64>>,
    ndims: Option<usize>,
    dtype: PrimDataType,
    expanded: Vec<bool>,
    contiguous: bool,
    name: Option<EcoString>,
}

impl Default for TensorBuilder {
    fn default() -> Self {
        Self {
            shape: None,
            ndims: None,
            dtype: PrimDataType::Float,
            expanded: Vec::new(),
            contiguous: false,
            name: None,
        }
    }
}

impl TensorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-axis extents: `-1` is symbolic, `n >= 0` is the constant `n`.
    pub fn shape(mut self, shape: impl IntoIterator<Item = i64>) -> Self {
        self.shape = Some(shape.into_iter().collect());
        self
    }

    /// Rank of a tensor whose extents are all symbolic.
    pub fn ndims(mut self, ndims: usize) -> Self {
        self.ndims = Some(ndims);
        self
    }

    pub fn dtype(mut self, dtype: PrimDataType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Axes that must be bound with stride 0.
    pub fn expanded(mut self, expanded: impl IntoIterator<Item = bool>) -> Self {
        self.expanded = expanded.into_iter().collect();
        self
    }

    pub fn contiguous(mut self, contiguous: bool) -> Self {
        self.contiguous = contiguous;
        self
    }

    /// Name used for the tensor's symbolic extents (`name.size0`, ...).
    pub fn name(mut self, name: impl Into<EcoString>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self, graph: &mut Graph) -> Result<NodeId, EvalError> {
        let shape = match (self.shape, self.ndims) {
            (Some(shape), Some(ndims)) if shape.len() != ndims => {
                return Err(EvalError::construction(format!(
                    "shape {:?} does not have {} dimensions",
                    shape, ndims
                )));
            }
            (Some(shape), _) => shape,
            (None, ndims) => vec![-1; ndims.unwrap_or(0)],
        };
        if let Some(&bad) = shape.iter().find(|&&extent| extent < -1) {
            return Err(EvalError::construction(format!(
                "invalid extent {} in shape {:?}",
                bad, shape
            )));
        }

        let rank = shape.len();
        let expanded: SmallVec<[bool; 6]> = match self.expanded.len() {
            0 => SmallVec::from_elem(false, rank),
            n if n == rank => self.expanded.into_iter().collect(),
            n => {
                return Err(EvalError::construction(format!(
                    "{} expanded flags for a rank-{} tensor",
                    n, rank
                )));
            }
        };

        let mut extents = SmallVec::with_capacity(rank);
        for (axis, &extent) in shape.iter().enumerate() {
            let node = if extent == -1 {
                let name = self.name.as_ref().map(|name| eco_format!("{}.size{}", name, axis));
                graph.leaf_symbol(name, fusor_types::DataType::Int)?
            } else {
                graph.int(extent)
            };
            extents.push(node);
        }

        let slot = TensorSlot {
            expanded,
            contiguous: self.contiguous,
        };
        Ok(graph.tensor_input(TensorType::new(self.dtype, rank), slot, extents))
    }
}

impl Graph {
    /// Rank-`ndims` tensor input with symbolic extents and no layout constraint.
    pub fn symbolic_tensor(
        &mut self,
        ndims: usize,
        dtype: PrimDataType,
    ) -> Result<NodeId, EvalError> {
        TensorBuilder::new().ndims(ndims).dtype(dtype).build(self)
    }

    /// Rank-`ndims` tensor input with symbolic extents that must be bound
    /// contiguously.
    pub fn contiguous_tensor(
        &mut self,
        ndims: usize,
        dtype: PrimDataType,
    ) -> Result<NodeId, EvalError> {
        TensorBuilder::new()
            .ndims(ndims)
            .dtype(dtype)
            .contiguous(true)
            .build(self)
    }
}
