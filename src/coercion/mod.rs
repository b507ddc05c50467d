//! # Coercion Engine
//!
//! Converts any [`Value`] into a value of any [`ValueKind`]. Used when an edge
//! joins ports of different declared kinds and when a node changes its kind.
//!
//! Coercion is total: there is no error channel. Every path ends either in a
//! derived value or in one of the target kind's two declared constants
//! (`default_true` / `default_false`), chosen by the source's truthiness.
//!
//! | Target | Derived from |
//! |--------|--------------|
//! | numeric family | leading components / broadcast scalar, numeric text |
//! | bool | truthiness |
//! | string | display text |
//! | json | structured payloads, JSON text |
//! | color | `#RRGGBB[AA]` text |
//! | categorical | case name (text / other enums), integer index |

mod numeric;
mod truthy;

pub use truthy::is_truthy;

use crate::model::categorical::{visit_categorical, ByIndex, ByName, ShapeCommandType};
use crate::model::*;

/// Converts `value` to a value of kind `to`.
///
/// Deterministic in `(value, to, now)`; `now` is only read when a truthy value
/// becomes a pulse.
pub fn coerce(value: &Value, to: ValueKind, now: GraphTime) -> Value {
    if value.kind() == to {
        return value.clone();
    }
    let coerced = derive(value, to).unwrap_or_else(|| fallback(value, to, now));
    debug_assert_eq!(coerced.kind(), to, "coercion of {} produced wrong kind", value.type_name());
    coerced
}

/// Element-wise [`coerce`] over a loop.
pub fn coerce_loop(values: &Loop, to: ValueKind, now: GraphTime) -> Loop {
    if values.iter().all(|v| v.kind() == to) {
        return values.clone();
    }
    values.map(|v| coerce(v, to, now))
}

/// The declared constant for `to`, picked by the truthiness of `value`.
fn fallback(value: &Value, to: ValueKind, now: GraphTime) -> Value {
    if is_truthy(value) {
        to.default_true(now)
    } else {
        to.default_false()
    }
}

/// Meaningful conversion, if one exists.
fn derive(value: &Value, to: ValueKind) -> Option<Value> {
    match to {
        ValueKind::None => Some(Value::None),
        ValueKind::Bool => Some(Value::Bool(is_truthy(value))),
        ValueKind::String => Some(Value::String(display_text(value))),

        ValueKind::Number => numeric::scalar(value).map(Value::Number),
        ValueKind::Int => numeric::scalar(value)
            .filter(|n| n.is_finite())
            .map(|n| Value::Int(n.round() as i64)),
        ValueKind::LayerDimension => numeric::dimension(value).map(Value::LayerDimension),
        ValueKind::Position => numeric::pair(value).map(|(x, y)| Value::Position(Point2::new(x, y))),
        ValueKind::Size => to_size(value),
        ValueKind::Point3D => {
            numeric::triple(value).map(|(x, y, z)| Value::Point3D(Point3::new(x, y, z)))
        }
        ValueKind::Point4D => {
            numeric::quad(value).map(|(x, y, z, w)| Value::Point4D(Point4::new(x, y, z, w)))
        }
        ValueKind::Padding => numeric::quad(value)
            .map(|(top, right, bottom, left)| Value::Padding(Padding::new(top, right, bottom, left))),
        ValueKind::Spacing => match value {
            Value::String(s) => Spacing::parse(s).map(Value::Spacing),
            other => numeric::scalar(other).map(|n| Value::Spacing(Spacing::Number(n))),
        },

        ValueKind::Color => text_of(value).and_then(Color::from_hex).map(Value::Color),
        ValueKind::Transform => numeric_transform(value),
        ValueKind::TextFont => text_of(value)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|family| Value::TextFont(TextFont { family: family.to_string(), ..TextFont::default() })),
        ValueKind::Json => Some(Value::Json(to_json(value))),
        ValueKind::Shape => match value {
            Value::Json(json) => CustomShape::from_json(json).map(|s| Value::Shape(Some(s))),
            Value::ShapeCommand(cmd) => Some(Value::Shape(Some(CustomShape::new(vec![*cmd])))),
            _ => None,
        },
        ValueKind::ShapeCommand => match value {
            Value::ShapeCommandType(t) => Some(Value::ShapeCommand(command_of_type(*t))),
            Value::Json(json) => serde_json::from_value(json.clone()).ok().map(Value::ShapeCommand),
            _ => None,
        },
        ValueKind::ShapeCommandType => match value {
            Value::ShapeCommand(cmd) => Some(Value::ShapeCommandType(type_of_command(cmd))),
            other => categorical(other, to),
        },
        ValueKind::Pulse => None,
        ValueKind::AsyncMedia => None,
        ValueKind::AssignedLayer => match value {
            Value::AnchorEntity(id) => Some(Value::AssignedLayer(*id)),
            _ => None,
        },
        ValueKind::AnchorEntity => match value {
            Value::AssignedLayer(id) => Some(Value::AnchorEntity(*id)),
            _ => None,
        },
        kind => categorical(value, kind),
    }
}

fn to_size(value: &Value) -> Option<Value> {
    match value {
        Value::LayerDimension(d) => Some(Value::Size(LayerSize { width: *d, height: *d })),
        Value::String(s) => {
            LayerDimension::parse(s).map(|d| Value::Size(LayerSize { width: d, height: d }))
        }
        other => numeric::pair(other).map(|(w, h)| Value::Size(LayerSize::new(w, h))),
    }
}

fn numeric_transform(value: &Value) -> Option<Value> {
    match value {
        Value::Point3D(p) => Some(Value::Transform(Transform3D::translation(*p))),
        Value::Position(p) => Some(Value::Transform(Transform3D::translation(Point3::new(p.x, p.y, 0.0)))),
        _ => None,
    }
}

/// Categorical targets: case name from text or another enum, index from numbers.
fn categorical(value: &Value, to: ValueKind) -> Option<Value> {
    let name = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Json(serde_json::Value::String(s)) => Some(s.as_str()),
        other => other.categorical_name(),
    };
    if let Some(name) = name {
        if let Some(found) = visit_categorical(to, ByName(name)).flatten() {
            return Some(found);
        }
    }
    match value {
        Value::Int(i) => visit_categorical(to, ByIndex(*i)),
        Value::Number(n) if n.is_finite() => visit_categorical(to, ByIndex(n.floor() as i64)),
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Json(serde_json::Value::String(s)) => Some(s),
        _ => None,
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::None => String::new(),
        Value::Json(serde_json::Value::String(s)) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON projection of a value. Structured payloads embed as objects.
pub fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::{json, Value as Json};

    let embed = |v: Result<Json, serde_json::Error>| v.unwrap_or(Json::Null);
    match value {
        Value::None => Json::Null,
        Value::Json(j) => j.clone(),
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| Json::String(s.clone())),
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => json!(i),
        Value::Number(n) => serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Value::Pulse(t) => json!({ "pulse": t }),
        Value::Position(p) => embed(serde_json::to_value(p)),
        Value::Size(s) => json!({ "width": s.width.to_string(), "height": s.height.to_string() }),
        Value::LayerDimension(d) => Json::String(d.to_string()),
        Value::Point3D(p) => embed(serde_json::to_value(p)),
        Value::Point4D(p) => embed(serde_json::to_value(p)),
        Value::Padding(p) => embed(serde_json::to_value(p)),
        Value::Color(c) => Json::String(c.to_hex()),
        Value::Shape(Some(shape)) => embed(serde_json::to_value(&shape.commands)),
        Value::ShapeCommand(cmd) => embed(serde_json::to_value(cmd)),
        Value::AsyncMedia(Some(media)) => json!({ "id": media.id, "name": media.name, "mime": media.mime }),
        Value::AssignedLayer(Some(id)) | Value::AnchorEntity(Some(id)) => json!(id.0),
        Value::Shape(None)
        | Value::AsyncMedia(None)
        | Value::AssignedLayer(None)
        | Value::AnchorEntity(None) => Json::Null,
        other => match other.categorical_name() {
            Some(name) => Json::String(name.to_string()),
            None => embed(serde_json::to_value(other)),
        },
    }
}

fn command_of_type(t: ShapeCommandType) -> ShapeCommand {
    let point = Point2::ZERO;
    match t {
        ShapeCommandType::MoveTo => ShapeCommand::MoveTo { point },
        ShapeCommandType::LineTo => ShapeCommand::LineTo { point },
        ShapeCommandType::CurveTo => ShapeCommand::CurveTo { point, control1: point, control2: point },
        ShapeCommandType::ClosePath => ShapeCommand::ClosePath,
    }
}

fn type_of_command(cmd: &ShapeCommand) -> ShapeCommandType {
    match cmd {
        ShapeCommand::MoveTo { .. } => ShapeCommandType::MoveTo,
        ShapeCommand::LineTo { .. } => ShapeCommandType::LineTo,
        ShapeCommand::CurveTo { .. } => ShapeCommandType::CurveTo,
        ShapeCommand::ClosePath => ShapeCommandType::ClosePath,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::categorical::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_number_to_size_is_square() {
        assert_eq!(
            coerce(&Value::Number(5.0), ValueKind::Size, 0.0),
            Value::Size(LayerSize::new(5.0, 5.0))
        );
    }

    #[test]
    fn test_padding_to_position_reads_right_bottom() {
        let padding = Value::Padding(Padding::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(
            coerce(&padding, ValueKind::Position, 0.0),
            Value::Position(Point2::new(2.0, 3.0))
        );
        assert_eq!(coerce(&padding, ValueKind::Number, 0.0), Value::Number(1.0));
    }

    #[test]
    fn test_strings() {
        assert_eq!(coerce(&Value::from(""), ValueKind::Bool, 0.0), Value::Bool(false));
        assert_eq!(coerce(&Value::from("hello"), ValueKind::Number, 0.0), Value::Number(1.0));
        assert_eq!(coerce(&Value::from(""), ValueKind::Number, 0.0), Value::Number(0.0));
        assert_eq!(coerce(&Value::from("4.5"), ValueKind::Number, 0.0), Value::Number(4.5));
        assert_eq!(coerce(&Value::from("4.5"), ValueKind::Int, 0.0), Value::Int(5));
        assert_eq!(coerce(&Value::Number(2.0), ValueKind::String, 0.0), Value::from("2"));
    }

    #[test]
    fn test_position_to_number_is_x() {
        let p = Value::Position(Point2::new(7.0, 8.0));
        assert_eq!(coerce(&p, ValueKind::Number, 0.0), Value::Number(7.0));
        assert_eq!(
            coerce(&p, ValueKind::Point4D, 0.0),
            Value::Point4D(Point4::new(7.0, 8.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_categorical_targets() {
        assert_eq!(
            coerce(&Value::from("Overlay"), ValueKind::BlendMode, 0.0),
            Value::BlendMode(BlendMode::Overlay)
        );
        assert_eq!(
            coerce(&Value::Int(2), ValueKind::TextAlignment, 0.0),
            Value::TextAlignment(TextAlignment::Right)
        );
        // Shared case names carry across enums.
        assert_eq!(
            coerce(&Value::TextAlignment(TextAlignment::Center), ValueKind::Anchoring, 0.0),
            Value::Anchoring(Anchoring::Center)
        );
        // No meaningful reading: declared constants.
        assert_eq!(
            coerce(&Value::Color(Color::WHITE), ValueKind::FitStyle, 0.0),
            Value::FitStyle(FitStyle::Fill)
        );
        assert_eq!(
            coerce(&Value::Bool(false), ValueKind::FitStyle, 0.0),
            Value::FitStyle(FitStyle::Fit)
        );
    }

    #[test]
    fn test_fallback_constants() {
        assert_eq!(coerce(&Value::Bool(true), ValueKind::Pulse, 9.0), Value::Pulse(9.0));
        assert_eq!(coerce(&Value::Number(0.0), ValueKind::Color, 0.0), Value::Color(Color::CLEAR));
        assert_eq!(coerce(&Value::from("#FFFFFF"), ValueKind::Color, 0.0), Value::Color(Color::WHITE));
        assert_eq!(coerce(&Value::Number(3.0), ValueKind::AsyncMedia, 0.0), Value::AsyncMedia(None));
    }

    #[test]
    fn test_json_embedding() {
        assert_eq!(
            coerce(&Value::Position(Point2::new(1.0, 2.0)), ValueKind::Json, 0.0),
            Value::Json(serde_json::json!({ "x": 1.0, "y": 2.0 }))
        );
        assert_eq!(
            coerce(&Value::from("{\"a\": 1}"), ValueKind::Json, 0.0),
            Value::Json(serde_json::json!({ "a": 1 }))
        );
        assert_eq!(
            coerce(&Value::from("plain"), ValueKind::Json, 0.0),
            Value::Json(serde_json::json!("plain"))
        );
    }

    #[test]
    fn test_unparseable_shape_json_uses_constants() {
        let bad = Value::Json(serde_json::json!({ "commands": "nope" }));
        assert_eq!(coerce(&bad, ValueKind::Shape, 0.0), ValueKind::Shape.default_true(0.0));
        let empty = Value::Json(serde_json::json!({}));
        assert_eq!(coerce(&empty, ValueKind::Shape, 0.0), Value::Shape(None));
    }

    #[test]
    fn test_coerce_loop() {
        let l = Loop::new([1.0, 0.0]).unwrap();
        assert_eq!(
            coerce_loop(&l, ValueKind::Bool, 0.0),
            Loop::new([true, false]).unwrap()
        );
    }
}
