/// What to do when a reshape or flatten has no zero-copy view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ViewFallback {
    /// Fail with [`ShapeError::NotViewable`](crate::view::ShapeError::NotViewable).
    #[default]
    Fail,
    /// Produce the contiguous layout of a copy, with a null data pointer. The
    /// caller is responsible for allocating and filling the buffer.
    Materialize,
}

/// Configuration options for an evaluator session.
///
/// # Example
///
/// ```
/// use fusor_core::{EvaluatorOptions, ViewFallback};
///
/// let options = EvaluatorOptions {
///     max_depth: 500,
///     view_fallback: ViewFallback::Materialize,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorOptions {
    /// Maximum evaluation depth (for recursion protection).
    ///
    /// Default: 1000
    pub max_depth: usize,

    /// Default: [`ViewFallback::Fail`]
    pub view_fallback: ViewFallback,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            view_fallback: ViewFallback::Fail,
        }
    }
}
