//! End-to-end tests for graph editing and propagation.
//!
//! Each test builds a small graph from the built-in catalog, edits it
//! through the public API and checks values and evaluation order.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use stitch_core::eval::{EvalContext, EvalResult, InputDefinition, NodeDefinition, OutputDefinition};
use stitch_core::model::{
    LayerDimension, LayerInput, LayerInputKeyPath, LayerSize, Loop, LoopAlignment, NodeId, Point2,
    Value, ValueKind,
};
use stitch_core::{
    Error, GraphConfig, GraphState, InputCoordinate, InputMode, NodeRegistry, OutputCoordinate,
};

// ============================================================================
// Helpers
// ============================================================================

fn graph() -> GraphState {
    GraphState::new(Arc::new(NodeRegistry::with_builtins()), GraphConfig::default())
}

fn input(node: NodeId, port: usize) -> InputCoordinate {
    InputCoordinate::new(node, port)
}

fn output(node: NodeId, port: usize) -> OutputCoordinate {
    OutputCoordinate::new(node, port)
}

fn number(g: &GraphState, node: NodeId) -> f64 {
    g.output_loop(output(node, 0)).unwrap().first().as_number().unwrap()
}

// ============================================================================
// 1. Propagation order and change detection
// ============================================================================

#[test]
fn test_edit_reaches_every_dependent_in_order() {
    let mut g = graph();
    let a = g.add_node("add").unwrap();
    let b = g.add_node("multiply").unwrap();
    let c = g.add_node("add").unwrap();
    g.connect(output(a, 0), input(b, 0)).unwrap();
    g.connect(output(b, 0), input(c, 0)).unwrap();
    g.set_input_values(input(b, 1), Loop::single(10.0)).unwrap();
    g.set_input_values(input(c, 1), Loop::single(1.0)).unwrap();
    g.take_changed_nodes();

    let report = g.set_input_values(input(a, 0), Loop::single(2.0)).unwrap();
    assert_eq!(report.evaluated, vec![a, b, c]);
    assert_eq!(number(&g, c), 21.0);
    assert_eq!(g.take_changed_nodes(), vec![a, b, c]);
}

#[test]
fn test_identical_edit_evaluates_nothing() {
    let mut g = graph();
    let a = g.add_node("add").unwrap();
    g.set_input_values(input(a, 0), Loop::single(2.0)).unwrap();
    let report = g.set_input_values(input(a, 0), Loop::single(2.0)).unwrap();
    assert!(report.is_empty());
}

#[test]
fn test_connect_coerces_into_declared_kind() {
    let mut g = graph();
    let v = g.add_node("value").unwrap();
    let pack = g.add_node("sizePack").unwrap();
    g.set_input_values(input(v, 0), Loop::new([40.0, 80.0]).unwrap()).unwrap();
    g.connect(output(v, 0), input(pack, 0)).unwrap();

    assert_eq!(
        g.output_loop(output(pack, 0)).unwrap(),
        &Loop::new([
            Value::Size(LayerSize { width: LayerDimension::Number(40.0), height: LayerDimension::Number(100.0) }),
            Value::Size(LayerSize { width: LayerDimension::Number(80.0), height: LayerDimension::Number(100.0) }),
        ])
        .unwrap()
    );
}

// ============================================================================
// 2. Single writer per input
// ============================================================================

#[test]
fn test_reconnect_replaces_previous_edge() {
    let mut g = graph();
    let a = g.add_node("add").unwrap();
    let b = g.add_node("add").unwrap();
    let sink = g.add_node("add").unwrap();
    g.set_input_values(input(a, 0), Loop::single(1.0)).unwrap();
    g.set_input_values(input(b, 0), Loop::single(2.0)).unwrap();

    g.connect(output(a, 0), input(sink, 0)).unwrap();
    g.connect(output(b, 0), input(sink, 0)).unwrap();

    assert_eq!(g.upstream_connection(input(sink, 0)).unwrap(), Some(output(b, 0)));
    assert_eq!(g.edges().len(), 1);
    assert!(g.shallow_downstream_nodes(a).is_empty());
    assert_eq!(number(&g, sink), 2.0);

    // a no longer reaches sink.
    let report = g.set_input_values(input(a, 0), Loop::single(50.0)).unwrap();
    assert_eq!(report.evaluated, vec![a]);
    assert_eq!(number(&g, sink), 2.0);
}

// ============================================================================
// 3. Feedback
// ============================================================================

#[test]
fn test_counter_feedback_advances_once_per_frame() {
    let mut g = graph();
    let counter = g.add_node("counter").unwrap();
    let doubled = g.add_node("multiply").unwrap();
    g.connect(output(counter, 0), input(doubled, 0)).unwrap();
    g.set_input_values(input(doubled, 1), Loop::single(2.0)).unwrap();
    // The doubled count feeds back into the counter's maximum.
    g.connect(output(doubled, 0), input(counter, 3)).unwrap();

    for frame in 1..=3 {
        let time = f64::from(frame);
        g.set_graph_time(time);
        let report = g.set_input_values(input(counter, 0), Loop::single(Value::Pulse(time))).unwrap();
        assert!(report.evaluated.iter().filter(|id| **id == counter).count() <= 1);
        assert_eq!(number(&g, counter), time);
    }
    assert_eq!(number(&g, doubled), 6.0);
}

#[test]
fn test_self_loop_reads_previous_output() {
    let mut registry = NodeRegistry::with_builtins();
    registry.register(
        NodeDefinition::patch("accumulate", |inputs: &[Loop], _: &EvalContext<'_>| {
            let sum = inputs[0].first().as_number().unwrap_or(0.0) + inputs[1].first().as_number().unwrap_or(0.0);
            EvalResult::outputs(vec![Loop::single(sum)])
        })
        .input(InputDefinition::new("previous", ValueKind::Number))
        .input(InputDefinition::new("step", ValueKind::Number))
        .output(OutputDefinition::new("total", ValueKind::Number)),
    );
    let mut g = GraphState::new(Arc::new(registry), GraphConfig::default());
    let acc = g.add_node("accumulate").unwrap();
    g.connect(output(acc, 0), input(acc, 0)).unwrap();

    let mut totals = Vec::new();
    for step in [1.0, 2.0, 3.0] {
        let report = g.set_input_values(input(acc, 1), Loop::single(step)).unwrap();
        assert_eq!(report.evaluated, vec![acc]);
        totals.push(number(&g, acc));
    }
    assert_eq!(totals, vec![1.0, 3.0, 6.0]);
}

// ============================================================================
// 4. Layer inputs: packed and unpacked
// ============================================================================

#[test]
fn test_unpacked_fields_drive_packed_value() {
    let mut g = graph();
    let rect = g.add_node("rectangle").unwrap();
    let x = g.add_node("value").unwrap();
    let position = InputCoordinate::new(rect, LayerInput::Position);
    let field_x = InputCoordinate::new(rect, LayerInputKeyPath::unpacked(LayerInput::Position, 0));
    let field_y = InputCoordinate::new(rect, LayerInputKeyPath::unpacked(LayerInput::Position, 1));

    g.set_input_values(position, Loop::single(Point2::new(3.0, 4.0))).unwrap();
    assert_eq!(g.current_loop(field_y).unwrap(), Loop::single(4.0));

    g.set_input_mode(rect, LayerInput::Position, InputMode::Unpacked).unwrap();
    g.set_input_values(input(x, 0), Loop::new([10.0, 20.0]).unwrap()).unwrap();
    g.connect(output(x, 0), field_x).unwrap();

    assert_eq!(
        g.current_loop(position).unwrap(),
        Loop::new([Point2::new(10.0, 4.0), Point2::new(20.0, 4.0)]).unwrap()
    );
    assert!(matches!(g.connect(output(x, 0), position), Err(Error::InactivePort(_))));
}

#[test]
fn test_unpacking_scalar_input_is_rejected() {
    let mut g = graph();
    let rect = g.add_node("rectangle").unwrap();
    assert!(matches!(
        g.set_input_mode(rect, LayerInput::Opacity, InputMode::Unpacked),
        Err(Error::PortNotFound(_))
    ));
    assert!(matches!(
        g.set_input_mode(rect, LayerInput::FontSize, InputMode::Packed),
        Err(Error::PortNotFound(_))
    ));
}

#[test]
fn test_field_and_packed_edits_respect_edges_on_either_side() {
    let mut g = graph();
    let rect = g.add_node("rectangle").unwrap();
    let point = g.add_node("value").unwrap();
    let position = InputCoordinate::new(rect, LayerInput::Position);
    let field_x = InputCoordinate::new(rect, LayerInputKeyPath::unpacked(LayerInput::Position, 0));
    let field_y = InputCoordinate::new(rect, LayerInputKeyPath::unpacked(LayerInput::Position, 1));

    // Packed value driven by an edge: its fields are not editable.
    g.set_node_kind(point, ValueKind::Position).unwrap();
    g.set_input_values(input(point, 0), Loop::single(Point2::new(5.0, 6.0))).unwrap();
    g.connect(output(point, 0), position).unwrap();
    assert!(matches!(
        g.set_input_values(field_x, Loop::single(99.0)),
        Err(Error::InputConnected(at)) if at == position
    ));
    assert_eq!(g.current_loop(position).unwrap(), Loop::single(Point2::new(5.0, 6.0)));

    // One field driven by an edge: the packed value is not editable, the
    // other field still is.
    let x = g.add_node("value").unwrap();
    g.set_input_mode(rect, LayerInput::Position, InputMode::Unpacked).unwrap();
    g.set_input_values(input(x, 0), Loop::single(7.0)).unwrap();
    g.connect(output(x, 0), field_x).unwrap();
    assert!(matches!(
        g.set_input_values(position, Loop::single(Point2::new(1.0, 2.0))),
        Err(Error::InputConnected(at)) if at == field_x
    ));
    assert_eq!(g.current_loop(field_x).unwrap(), Loop::single(7.0));

    g.set_input_values(field_y, Loop::single(8.0)).unwrap();
    assert_eq!(g.current_loop(position).unwrap(), Loop::single(Point2::new(7.0, 8.0)));
}

// ============================================================================
// 5. Type changes and alignment policy
// ============================================================================

#[test]
fn test_type_change_flows_downstream() {
    let mut g = graph();
    let v = g.add_node("value").unwrap();
    let unpack = g.add_node("sizeUnpack").unwrap();
    g.set_input_values(input(v, 0), Loop::single(30.0)).unwrap();
    g.connect(output(v, 0), input(unpack, 0)).unwrap();

    g.set_node_kind(v, ValueKind::Size).unwrap();
    assert_eq!(g.output_loop(output(v, 0)).unwrap().kind(), ValueKind::Size);
    assert_eq!(
        g.output_loop(output(unpack, 1)).unwrap(),
        &Loop::single(Value::LayerDimension(LayerDimension::Number(30.0)))
    );
}

#[test]
fn test_cycle_alignment_wraps_short_loops() {
    let config = GraphConfig::default().with_loop_alignment(LoopAlignment::Cycle);
    let mut g = GraphState::new(Arc::new(NodeRegistry::with_builtins()), config);
    let a = g.add_node("add").unwrap();
    g.set_input_values(input(a, 0), Loop::new([1.0, 2.0, 3.0, 4.0]).unwrap()).unwrap();
    g.set_input_values(input(a, 1), Loop::new([10.0, 20.0]).unwrap()).unwrap();
    assert_eq!(
        g.output_loop(output(a, 0)).unwrap(),
        &Loop::new([11.0, 22.0, 13.0, 24.0]).unwrap()
    );
}

#[test]
fn test_option_picker_follows_generic_type() {
    let mut g = graph();
    let picker = g.add_node("optionPicker").unwrap();
    g.set_node_kind(picker, ValueKind::String).unwrap();
    g.set_input_values(input(picker, 1), Loop::single("left")).unwrap();
    g.set_input_values(input(picker, 2), Loop::single("right")).unwrap();
    g.set_input_values(input(picker, 0), Loop::new([0.0, 1.0]).unwrap()).unwrap();
    assert_eq!(
        g.output_loop(output(picker, 0)).unwrap(),
        &Loop::new(["left", "right"]).unwrap()
    );
}
