//! Precomputed scalar values for a fixed set of input bindings.
//!
//! A [`PrecomputedValues`] snapshot is filled once and then attached to any
//! number of [`Evaluator`] sessions that bind the same inputs. Attached
//! snapshots short-cut repeated evaluation of extents and other scalars; they
//! never change what a session evaluates to.

use crate::{
    binding::BindingTable,
    error::EvalError,
    evaluator::Evaluator,
    graph::{Graph, NodeId},
    values::Value,
};
use hashbrown::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PrecomputedValues<'g> {
    inputs: BindingTable<'g>,
    values: HashMap<NodeId, Value>,
    evaluated: bool,
}

impl<'g> PrecomputedValues<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            inputs: BindingTable::new(graph),
            values: HashMap::new(),
            evaluated: false,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.inputs.graph()
    }

    /// Record an input binding. Any previously computed values are discarded.
    pub fn bind(&mut self, node: NodeId, value: impl Into<Value>) -> Result<(), EvalError> {
        self.inputs.bind(node, value.into(), false)?;
        self.clear();
        Ok(())
    }

    /// Record an override of an operator node as an input.
    pub fn bind_override(&mut self, node: NodeId, value: impl Into<Value>) -> Result<(), EvalError> {
        self.inputs.bind(node, value.into(), true)?;
        self.clear();
        Ok(())
    }

    pub fn inputs(&self) -> &BindingTable<'g> {
        &self.inputs
    }

    /// Evaluate every scalar node of the graph that the inputs determine.
    ///
    /// Nodes deeper than the default depth limit are left out; sessions
    /// derive them on demand.
    pub fn evaluate(&mut self) -> Result<(), EvalError> {
        let graph = self.graph();
        let mut session = Evaluator::new(graph);
        for (node, value, _) in self.inputs.iter() {
            session.bind_override(node, value.clone())?;
        }

        let scalars: Vec<NodeId> = graph
            .iter()
            .filter(|(_, node)| node.ty.is_scalar())
            .map(|(id, _)| id)
            .collect();
        self.values = session
            .evaluate_within_depth(&scalars)?
            .into_iter()
            .collect();
        self.evaluated = true;
        debug!(
            inputs = self.inputs.len(),
            values = self.values.len(),
            "precomputed values"
        );
        Ok(())
    }

    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    pub fn get(&self, node: NodeId) -> Option<&Value> {
        self.values.get(&node)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn clear(&mut self) {
        self.values.clear();
        self.evaluated = false;
    }
}
