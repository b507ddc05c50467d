//! End-to-end tests for value coercion.
//!
//! Property tests cover totality and determinism over every target kind;
//! the fixed cases pin down the documented conversions.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use stitch_core::model::categorical::{Anchoring, BlendMode, TextAlignment};
use stitch_core::model::{
    lengthen_arrays, Color, LayerSize, Loop, Padding, Point2, Point3, Value, ValueKind,
};
use stitch_core::{coerce, coerce_loop, is_truthy};

// ============================================================================
// Strategies
// ============================================================================

fn any_kind() -> impl Strategy<Value = ValueKind> {
    prop::sample::select(ValueKind::ALL.to_vec())
}

fn finite() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6f64
}

/// Values across the model: direct primitives plus values of every kind
/// obtained by coercing integers and strings.
fn any_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        finite().prop_map(Value::Number),
        "[a-zA-Z0-9 .#-]{0,12}".prop_map(Value::String),
        (finite(), finite()).prop_map(|(x, y)| Value::Position(Point2::new(x, y))),
        (finite(), finite(), finite()).prop_map(|(x, y, z)| Value::Point3D(Point3::new(x, y, z))),
        (0.0..1.0f64, 0.0..1.0f64, 0.0..1.0f64, 0.0..1.0f64)
            .prop_map(|(r, g, b, a)| Value::Color(Color::rgba(r, g, b, a))),
        (any_kind(), -8i64..8).prop_map(|(kind, i)| coerce(&Value::Int(i), kind, 1.0)),
        (any_kind(), "[a-z]{0,8}").prop_map(|(kind, s)| coerce(&Value::String(s), kind, 1.0)),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_coercion_is_total(value in any_value(), kind in any_kind()) {
        prop_assert_eq!(coerce(&value, kind, 3.0).kind(), kind);
    }

    #[test]
    fn prop_coercion_is_deterministic(value in any_value(), kind in any_kind()) {
        prop_assert_eq!(coerce(&value, kind, 3.0), coerce(&value, kind, 3.0));
    }

    #[test]
    fn prop_bool_agrees_with_truthiness(value in any_value()) {
        let as_bool = coerce(&value, ValueKind::Bool, 0.0);
        prop_assert_eq!(&as_bool, &Value::Bool(is_truthy(&value)));
        prop_assert_eq!(coerce(&as_bool, ValueKind::Bool, 0.0), as_bool);
    }

    #[test]
    fn prop_same_kind_is_identity(value in any_value()) {
        prop_assert_eq!(coerce(&value, value.kind(), 0.0), value);
    }

    #[test]
    fn prop_numbers_survive_text(n in finite()) {
        let text = coerce(&Value::Number(n), ValueKind::String, 0.0);
        prop_assert_eq!(coerce(&text, ValueKind::Number, 0.0), Value::Number(n));
    }

    #[test]
    fn prop_loop_coercion_keeps_length(values in prop::collection::vec(any_value(), 1..6), kind in any_kind()) {
        let lanes = Loop::new(values).unwrap();
        let coerced = coerce_loop(&lanes, kind, 0.0);
        prop_assert_eq!(coerced.len(), lanes.len());
        prop_assert!(coerced.iter().all(|v| v.kind() == kind));
    }
}

// ============================================================================
// Documented conversions
// ============================================================================

#[test]
fn test_number_to_size_is_square() {
    assert_eq!(
        coerce(&Value::Number(5.0), ValueKind::Size, 0.0),
        Value::Size(LayerSize::new(5.0, 5.0))
    );
}

#[test]
fn test_padding_to_position_reads_right_and_bottom() {
    assert_eq!(
        coerce(&Value::Padding(Padding::new(1.0, 2.0, 3.0, 4.0)), ValueKind::Position, 0.0),
        Value::Position(Point2::new(2.0, 3.0))
    );
}

#[test]
fn test_string_fallbacks() {
    assert_eq!(coerce(&Value::from(""), ValueKind::Bool, 0.0), Value::Bool(false));
    assert_eq!(
        coerce(&Value::from("hello"), ValueKind::Number, 0.0),
        ValueKind::Number.default_true(0.0)
    );
    assert_eq!(
        coerce(&Value::from(""), ValueKind::Number, 0.0),
        ValueKind::Number.default_false()
    );
}

#[test]
fn test_sibling_loops_lengthen_by_repeating_last() {
    let aligned = lengthen_arrays(&[Loop::new([1.0, 2.0, 3.0]).unwrap(), Loop::single(10.0)]);
    assert_eq!(aligned[0], Loop::new([1.0, 2.0, 3.0]).unwrap());
    assert_eq!(aligned[1], Loop::new([10.0, 10.0, 10.0]).unwrap());
}

#[test]
fn test_categorical_crossings() {
    assert_eq!(
        coerce(&Value::from("center"), ValueKind::Anchoring, 0.0),
        Value::Anchoring(Anchoring::Center)
    );
    assert_eq!(
        coerce(&Value::TextAlignment(TextAlignment::Center), ValueKind::Anchoring, 0.0),
        Value::Anchoring(Anchoring::Center)
    );
    assert_eq!(
        coerce(&Value::Int(0), ValueKind::BlendMode, 0.0),
        Value::BlendMode(BlendMode::Normal)
    );
    assert_eq!(
        coerce(&Value::BlendMode(BlendMode::Multiply), ValueKind::String, 0.0),
        Value::from("multiply")
    );
}

#[test]
fn test_pulse_fallback_uses_current_time() {
    assert_eq!(coerce(&Value::Bool(true), ValueKind::Pulse, 4.5), Value::Pulse(4.5));
    assert_eq!(coerce(&Value::Bool(false), ValueKind::Pulse, 4.5), Value::Pulse(0.0));
}
