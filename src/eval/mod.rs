//! # Evaluation Contract
//!
//! A node kind is a [`NodeDefinition`]: declared input and output ports plus
//! a [`NodeEvaluator`]. Evaluators are pure. They receive the node's input
//! loops (already coerced to the declared kinds and aligned to one length)
//! and return output loops plus any async effects the engine should issue.
//!
//! ```text
//! inputs: [Loop; n] ──► NodeEvaluator::evaluate ──► EvalResult { outputs, requests }
//!                           ▲
//!                     EvalContext (time, node id, previous outputs)
//! ```

pub mod builtin;
mod registry;

pub use registry::NodeRegistry;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::integrator::ResourceRequest;
use crate::model::{longest_loop_length, GraphTime, LayerInput, Loop, LoopAlignment, NodeId, Value, ValueKind};

// ============================================================================
// Evaluator
// ============================================================================

/// Read-only facts about the evaluation in progress.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub node_id: NodeId,
    pub time: GraphTime,
    pub alignment: LoopAlignment,
    /// The node's outputs from its previous evaluation. Feedback-capable
    /// kinds (counters, accumulators) read their own prior state here.
    pub previous_outputs: &'a [Loop],
}

impl EvalContext<'_> {
    /// Previous value of output `port` at `lane`, if the node has been
    /// evaluated before.
    pub fn previous(&self, port: usize, lane: usize) -> Option<&Value> {
        self.previous_outputs.get(port).map(|l| l.get_looped(lane, self.alignment))
    }
}

/// An async effect requested by an evaluator for one lane.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncRequest {
    pub loop_index: usize,
    pub request: ResourceRequest,
}

/// Evaluator output: one loop per declared output port, plus requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalResult {
    pub outputs: Vec<Loop>,
    pub requests: Vec<AsyncRequest>,
}

impl EvalResult {
    pub fn outputs(outputs: Vec<Loop>) -> Self {
        Self { outputs, requests: Vec::new() }
    }

    pub fn with_request(mut self, loop_index: usize, request: ResourceRequest) -> Self {
        self.requests.push(AsyncRequest { loop_index, request });
        self
    }
}

/// The pure evaluation step of a node kind.
pub trait NodeEvaluator: Send + Sync + 'static {
    fn evaluate(&self, inputs: &[Loop], ctx: &EvalContext<'_>) -> EvalResult;
}

impl<F> NodeEvaluator for F
where
    F: Fn(&[Loop], &EvalContext<'_>) -> EvalResult + Send + Sync + 'static,
{
    fn evaluate(&self, inputs: &[Loop], ctx: &EvalContext<'_>) -> EvalResult {
        self(inputs, ctx)
    }
}

/// Applies `f` lane by lane and transposes the rows into output loops.
///
/// `f` receives the lane index and that lane's value from every input, and
/// returns one value per output. A node without inputs still runs one lane.
pub fn map_lanes<F>(inputs: &[Loop], alignment: LoopAlignment, output_count: usize, mut f: F) -> Vec<Loop>
where
    F: FnMut(usize, &[Value]) -> Vec<Value>,
{
    let lanes = longest_loop_length(inputs);
    let mut columns: Vec<Vec<Value>> = (0..output_count).map(|_| Vec::with_capacity(lanes)).collect();
    let mut row = Vec::with_capacity(inputs.len());

    for lane in 0..lanes {
        row.clear();
        row.extend(inputs.iter().map(|l| l.get_looped(lane, alignment).clone()));
        let mut produced = f(lane, &row).into_iter();
        for column in columns.iter_mut() {
            column.push(produced.next().unwrap_or(Value::None));
        }
    }

    columns
        .into_iter()
        .map(|c| Loop::new(c).unwrap_or_else(|_| Loop::single(Value::None)))
        .collect()
}

// ============================================================================
// Definitions
// ============================================================================

/// Patch nodes compute values; layer nodes describe something drawn and
/// address inputs by [`LayerInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeCategory {
    Patch,
    Layer,
}

/// A declared input port.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDefinition {
    pub label: String,
    pub kind: ValueKind,
    pub default: Value,
    /// Set for layer inputs, which are addressed by key path.
    pub layer_input: Option<LayerInput>,
    /// Follows the node's type when the node kind is type-changeable.
    pub generic: bool,
}

impl InputDefinition {
    pub fn new(label: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            label: label.into(),
            kind,
            default: kind.default_value(),
            layer_input: None,
            generic: false,
        }
    }

    pub fn layer(input: LayerInput) -> Self {
        Self {
            label: input.name().to_string(),
            kind: input.value_kind(),
            default: input.default_value(),
            layer_input: Some(input),
            generic: false,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn generic(mut self) -> Self {
        self.generic = true;
        self
    }
}

/// A declared output port.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDefinition {
    pub label: String,
    pub kind: ValueKind,
    pub generic: bool,
}

impl OutputDefinition {
    pub fn new(label: impl Into<String>, kind: ValueKind) -> Self {
        Self { label: label.into(), kind, generic: false }
    }

    pub fn generic(mut self) -> Self {
        self.generic = true;
        self
    }
}

/// Output indices an async node writes completions into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncPorts {
    pub loading: usize,
    pub result: usize,
    pub errored: usize,
    pub error: usize,
}

/// Everything the engine knows about one node kind.
#[derive(Clone)]
pub struct NodeDefinition {
    pub name: String,
    pub category: NodeCategory,
    pub inputs: Vec<InputDefinition>,
    pub outputs: Vec<OutputDefinition>,
    pub evaluator: Arc<dyn NodeEvaluator>,
    pub async_ports: Option<AsyncPorts>,
    /// Kind the generic ports start with; `None` for fixed-type kinds.
    pub default_type: Option<ValueKind>,
}

impl NodeDefinition {
    pub fn patch(name: impl Into<String>, evaluator: impl NodeEvaluator) -> Self {
        Self {
            name: name.into(),
            category: NodeCategory::Patch,
            inputs: Vec::new(),
            outputs: Vec::new(),
            evaluator: Arc::new(evaluator),
            async_ports: None,
            default_type: None,
        }
    }

    pub fn layer(name: impl Into<String>, inputs: &[LayerInput]) -> Self {
        Self {
            name: name.into(),
            category: NodeCategory::Layer,
            inputs: inputs.iter().copied().map(InputDefinition::layer).collect(),
            outputs: Vec::new(),
            evaluator: Arc::new(|_: &[Loop], _: &EvalContext<'_>| EvalResult::default()),
            async_ports: None,
            default_type: None,
        }
    }

    pub fn input(mut self, input: InputDefinition) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(mut self, output: OutputDefinition) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_async_ports(mut self, ports: AsyncPorts) -> Self {
        self.async_ports = Some(ports);
        self
    }

    /// Marks the kind type-changeable, with generic ports starting at `kind`.
    pub fn type_changeable(mut self, kind: ValueKind) -> Self {
        self.default_type = Some(kind);
        self
    }

    pub fn is_type_changeable(&self) -> bool {
        self.default_type.is_some()
    }

    /// Index of the input declared for `layer_input`.
    pub fn layer_input_index(&self, layer_input: LayerInput) -> Option<usize> {
        self.inputs.iter().position(|i| i.layer_input == Some(layer_input))
    }
}

impl fmt::Debug for NodeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("async_ports", &self.async_ports)
            .field("default_type", &self.default_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_lanes_aligns_and_transposes() {
        let inputs = [
            Loop::new([1.0, 2.0, 3.0]).unwrap(),
            Loop::single(10.0),
        ];
        let out = map_lanes(&inputs, LoopAlignment::RepeatLast, 2, |lane, row| {
            let sum = row[0].as_number().unwrap() + row[1].as_number().unwrap();
            vec![Value::Number(sum), Value::Int(lane as i64)]
        });
        assert_eq!(out[0], Loop::new([11.0, 12.0, 13.0]).unwrap());
        assert_eq!(out[1], Loop::new([Value::Int(0), Value::Int(1), Value::Int(2)]).unwrap());
    }

    #[test]
    fn test_map_lanes_without_inputs_runs_once() {
        let out = map_lanes(&[], LoopAlignment::RepeatLast, 1, |_, _| vec![Value::Bool(true)]);
        assert_eq!(out, vec![Loop::single(true)]);
    }

    #[test]
    fn test_layer_definition_inputs() {
        let def = NodeDefinition::layer("oval", &[LayerInput::Position, LayerInput::Size]);
        assert_eq!(def.category, NodeCategory::Layer);
        assert_eq!(def.layer_input_index(LayerInput::Size), Some(1));
        assert_eq!(def.inputs[0].kind, ValueKind::Position);
        assert!(def.outputs.is_empty());
    }
}
