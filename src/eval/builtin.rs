//! Built-in node catalog.
//!
//! A compact set of kinds covering each shape of evaluator the engine
//! supports: plain lane-wise math, type-changeable pass-through, loop
//! construction, feedback through previous outputs, async requests, and
//! output-less layers.

use crate::eval::{
    map_lanes, AsyncPorts, EvalContext, EvalResult, InputDefinition, NodeDefinition, NodeRegistry,
    OutputDefinition,
};
use crate::integrator::{ResourceKind, ResourceRequest};
use crate::model::categorical::NetworkRequestType;
use crate::model::{
    GraphTime, LayerDimension, LayerInput, LayerSize, Loop, Value, ValueKind,
};

/// Registers every built-in kind.
pub fn register_all(registry: &mut NodeRegistry) {
    registry
        .register(value_node())
        .register(binary_math("add", |a, b| a + b))
        .register(binary_math("multiply", |a, b| a * b))
        .register(size_pack())
        .register(size_unpack())
        .register(loop_builder())
        .register(option_picker())
        .register(counter())
        .register(network_request())
        .register(image_request())
        .register(rectangle_layer())
        .register(text_layer());
}

/// A pulse is active during the graph frame it carries. Time zero is the
/// idle state before the first frame, so nothing fires there.
pub fn pulse_fired(value: &Value, now: GraphTime) -> bool {
    matches!(value, Value::Pulse(t) if *t == now && now > 0.0)
}

fn number(value: &Value) -> f64 {
    value.as_number().unwrap_or(0.0)
}

// ============================================================================
// Patch nodes
// ============================================================================

fn value_node() -> NodeDefinition {
    NodeDefinition::patch("value", |inputs: &[Loop], _: &EvalContext<'_>| {
        EvalResult::outputs(inputs.iter().take(1).cloned().collect())
    })
    .input(InputDefinition::new("value", ValueKind::Number).generic())
    .output(OutputDefinition::new("value", ValueKind::Number).generic())
    .type_changeable(ValueKind::Number)
}

fn binary_math(name: &'static str, op: fn(f64, f64) -> f64) -> NodeDefinition {
    NodeDefinition::patch(name, move |inputs: &[Loop], ctx: &EvalContext<'_>| {
        EvalResult::outputs(map_lanes(inputs, ctx.alignment, 1, |_, row| {
            vec![Value::Number(op(number(&row[0]), number(&row[1])))]
        }))
    })
    .input(InputDefinition::new("a", ValueKind::Number))
    .input(InputDefinition::new("b", ValueKind::Number))
    .output(OutputDefinition::new("result", ValueKind::Number))
}

fn size_pack() -> NodeDefinition {
    NodeDefinition::patch("sizePack", |inputs: &[Loop], ctx: &EvalContext<'_>| {
        EvalResult::outputs(map_lanes(inputs, ctx.alignment, 1, |_, row| {
            let dim = |v: &Value| match v {
                Value::LayerDimension(d) => *d,
                _ => LayerDimension::default(),
            };
            vec![Value::Size(LayerSize { width: dim(&row[0]), height: dim(&row[1]) })]
        }))
    })
    .input(InputDefinition::new("width", ValueKind::LayerDimension).with_default(Value::LayerDimension(LayerDimension::Number(100.0))))
    .input(InputDefinition::new("height", ValueKind::LayerDimension).with_default(Value::LayerDimension(LayerDimension::Number(100.0))))
    .output(OutputDefinition::new("size", ValueKind::Size))
}

fn size_unpack() -> NodeDefinition {
    NodeDefinition::patch("sizeUnpack", |inputs: &[Loop], ctx: &EvalContext<'_>| {
        EvalResult::outputs(map_lanes(inputs, ctx.alignment, 2, |_, row| match &row[0] {
            Value::Size(s) => vec![Value::LayerDimension(s.width), Value::LayerDimension(s.height)],
            _ => vec![ValueKind::LayerDimension.default_value(); 2],
        }))
    })
    .input(InputDefinition::new("size", ValueKind::Size))
    .output(OutputDefinition::new("width", ValueKind::LayerDimension))
    .output(OutputDefinition::new("height", ValueKind::LayerDimension))
}

/// Collects the first lane of each input into a loop of its own.
fn loop_builder() -> NodeDefinition {
    let mut def = NodeDefinition::patch("loopBuilder", |inputs: &[Loop], _: &EvalContext<'_>| {
        let values: Vec<Value> = inputs.iter().map(|l| l.first().clone()).collect();
        let indices: Vec<Value> = (0..values.len()).map(|i| Value::Number(i as f64)).collect();
        let outputs = match (Loop::new(indices), Loop::new(values)) {
            (Ok(indices), Ok(values)) => vec![indices, values],
            _ => Vec::new(),
        };
        EvalResult::outputs(outputs)
    })
    .output(OutputDefinition::new("index", ValueKind::Number))
    .output(OutputDefinition::new("values", ValueKind::Number).generic())
    .type_changeable(ValueKind::Number);
    for i in 0..5 {
        def = def.input(InputDefinition::new(format!("value {i}"), ValueKind::Number).generic());
    }
    def
}

/// Picks one of its options by index, wrapping out-of-range indices.
fn option_picker() -> NodeDefinition {
    NodeDefinition::patch("optionPicker", |inputs: &[Loop], ctx: &EvalContext<'_>| {
        EvalResult::outputs(map_lanes(inputs, ctx.alignment, 1, |_, row| {
            let options = &row[1..];
            let pick = (number(&row[0]).round() as i64).rem_euclid(options.len() as i64) as usize;
            vec![options[pick].clone()]
        }))
    })
    .input(InputDefinition::new("option", ValueKind::Number))
    .input(InputDefinition::new("option 0", ValueKind::Number).generic())
    .input(InputDefinition::new("option 1", ValueKind::Number).generic().with_default(1.0))
    .output(OutputDefinition::new("value", ValueKind::Number).generic())
    .type_changeable(ValueKind::Number)
}

/// Counts pulses. Reads its own previous output, so it is safe inside a
/// feedback loop.
fn counter() -> NodeDefinition {
    NodeDefinition::patch("counter", |inputs: &[Loop], ctx: &EvalContext<'_>| {
        EvalResult::outputs(map_lanes(inputs, ctx.alignment, 1, |lane, row| {
            let mut count = ctx.previous(0, lane).map(number).unwrap_or(0.0);
            if pulse_fired(&row[0], ctx.time) {
                count += 1.0;
            }
            if pulse_fired(&row[1], ctx.time) {
                count -= 1.0;
            }
            let max = number(&row[3]);
            if pulse_fired(&row[2], ctx.time) || (max > 0.0 && count > max) {
                count = 0.0;
            }
            vec![Value::Number(count)]
        }))
    })
    .input(InputDefinition::new("increase", ValueKind::Pulse))
    .input(InputDefinition::new("decrease", ValueKind::Pulse))
    .input(InputDefinition::new("reset", ValueKind::Pulse))
    .input(InputDefinition::new("maximum count", ValueKind::Number))
    .output(OutputDefinition::new("count", ValueKind::Number))
}

// ============================================================================
// Async nodes
// ============================================================================

const ASYNC_PORTS: AsyncPorts = AsyncPorts { loading: 0, result: 1, errored: 2, error: 3 };

/// Shared lane logic for request nodes: a fired pulse with a non-empty URL
/// issues a request and flips `loading`; otherwise the lane keeps its
/// previous outputs.
fn request_lanes(
    inputs: &[Loop],
    ctx: &EvalContext<'_>,
    result_kind: ValueKind,
    mut build: impl FnMut(&[Value]) -> Option<ResourceRequest>,
    pulse_port: usize,
) -> EvalResult {
    let mut requests = Vec::new();
    let outputs = map_lanes(inputs, ctx.alignment, 4, |lane, row| {
        let previous = |port: usize, fallback: Value| ctx.previous(port, lane).cloned().unwrap_or(fallback);
        let result = previous(ASYNC_PORTS.result, result_kind.default_value());
        let error = previous(ASYNC_PORTS.error, Value::String(String::new()));

        if pulse_fired(&row[pulse_port], ctx.time) {
            if let Some(request) = build(row) {
                requests.push((lane, request));
                return vec![Value::Bool(true), result, Value::Bool(false), error];
            }
        }
        vec![
            previous(ASYNC_PORTS.loading, Value::Bool(false)),
            result,
            previous(ASYNC_PORTS.errored, Value::Bool(false)),
            error,
        ]
    });

    requests
        .into_iter()
        .fold(EvalResult::outputs(outputs), |acc, (lane, request)| acc.with_request(lane, request))
}

fn async_outputs(def: NodeDefinition, result: OutputDefinition) -> NodeDefinition {
    def.output(OutputDefinition::new("loading", ValueKind::Bool))
        .output(result)
        .output(OutputDefinition::new("errored", ValueKind::Bool))
        .output(OutputDefinition::new("error", ValueKind::String))
        .with_async_ports(ASYNC_PORTS)
}

fn non_empty_url(value: &Value) -> Option<String> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn network_request() -> NodeDefinition {
    let def = NodeDefinition::patch("networkRequest", |inputs: &[Loop], ctx: &EvalContext<'_>| {
        request_lanes(inputs, ctx, ValueKind::Json, |row| {
            let url = non_empty_url(&row[0])?;
            let method = match &row[1] {
                Value::NetworkRequestType(m) => *m,
                _ => NetworkRequestType::Get,
            };
            let body = match (&row[2], method) {
                (Value::Json(body), NetworkRequestType::Post) => Some(body.clone()),
                _ => None,
            };
            Some(ResourceRequest { url, method, body, expects: ResourceKind::Json })
        }, 3)
    })
    .input(InputDefinition::new("url", ValueKind::String))
    .input(InputDefinition::new("method", ValueKind::NetworkRequestType))
    .input(InputDefinition::new("body", ValueKind::Json))
    .input(InputDefinition::new("request", ValueKind::Pulse));
    async_outputs(def, OutputDefinition::new("result", ValueKind::Json))
}

fn image_request() -> NodeDefinition {
    let def = NodeDefinition::patch("imageRequest", |inputs: &[Loop], ctx: &EvalContext<'_>| {
        request_lanes(inputs, ctx, ValueKind::AsyncMedia, |row| {
            let url = non_empty_url(&row[0])?;
            Some(ResourceRequest::get(url, ResourceKind::Image))
        }, 1)
    })
    .input(InputDefinition::new("url", ValueKind::String))
    .input(InputDefinition::new("request", ValueKind::Pulse));
    async_outputs(def, OutputDefinition::new("image", ValueKind::AsyncMedia))
}

// ============================================================================
// Layers
// ============================================================================

fn rectangle_layer() -> NodeDefinition {
    NodeDefinition::layer(
        "rectangle",
        &[
            LayerInput::Position,
            LayerInput::Size,
            LayerInput::Rotation,
            LayerInput::Opacity,
            LayerInput::Color,
            LayerInput::CornerRadius,
            LayerInput::Padding,
            LayerInput::Anchoring,
            LayerInput::BlendMode,
            LayerInput::ZIndex,
        ],
    )
}

fn text_layer() -> NodeDefinition {
    NodeDefinition::layer(
        "text",
        &[
            LayerInput::Text,
            LayerInput::Position,
            LayerInput::Size,
            LayerInput::FontSize,
            LayerInput::TextAlignment,
            LayerInput::Color,
            LayerInput::Margin,
            LayerInput::Opacity,
        ],
    )
}
