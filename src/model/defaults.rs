//! Declared constants per value kind.
//!
//! Each kind has a documented default (what a fresh port holds) and two
//! coercion fallbacks: `default_true` and `default_false`, used when a value
//! that cannot be converted meaningfully is coerced into the kind.

use super::categorical::{categorical_default_false, categorical_default_true};
use super::geometry::*;
use super::value::{GraphTime, Value, ValueKind};

impl ValueKind {
    /// The value a freshly created port of this kind holds.
    pub fn default_value(self) -> Value {
        match self {
            ValueKind::Size => Value::Size(LayerSize::new(100.0, 100.0)),
            ValueKind::Color => Value::Color(Color::BLACK),
            ValueKind::Json => Value::Json(serde_json::Value::Object(Default::default())),
            ValueKind::TextFont => Value::TextFont(TextFont::default()),
            ValueKind::Transform => Value::Transform(Transform3D::IDENTITY),
            ValueKind::LayerDimension => Value::LayerDimension(LayerDimension::Auto),
            kind if kind.is_categorical() => {
                categorical_default_false(kind).unwrap_or(Value::None)
            }
            kind => kind.default_false(),
        }
    }

    /// Fallback used when a falsey source cannot be converted to this kind.
    pub fn default_false(self) -> Value {
        match self {
            ValueKind::None => Value::None,
            ValueKind::String => Value::String(String::new()),
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Number => Value::Number(0.0),
            ValueKind::LayerDimension => Value::LayerDimension(LayerDimension::Number(0.0)),
            ValueKind::Position => Value::Position(Point2::ZERO),
            ValueKind::Size => Value::Size(LayerSize::square(0.0)),
            ValueKind::Point3D => Value::Point3D(Point3::ZERO),
            ValueKind::Point4D => Value::Point4D(Point4::ZERO),
            ValueKind::Padding => Value::Padding(Padding::uniform(0.0)),
            ValueKind::Spacing => Value::Spacing(Spacing::Number(0.0)),
            ValueKind::Color => Value::Color(Color::CLEAR),
            ValueKind::Transform => Value::Transform(Transform3D::IDENTITY),
            ValueKind::TextFont => Value::TextFont(TextFont::default()),
            ValueKind::Shape => Value::Shape(None),
            ValueKind::ShapeCommand => Value::ShapeCommand(ShapeCommand::MoveTo { point: Point2::ZERO }),
            ValueKind::Pulse => Value::Pulse(0.0),
            ValueKind::Json => Value::Json(serde_json::Value::Bool(false)),
            ValueKind::AsyncMedia => Value::AsyncMedia(None),
            ValueKind::AssignedLayer => Value::AssignedLayer(None),
            ValueKind::AnchorEntity => Value::AnchorEntity(None),
            kind => categorical_default_false(kind).unwrap_or(Value::None),
        }
    }

    /// Fallback used when a truthy source cannot be converted to this kind.
    ///
    /// `now` only matters for pulses: a truthy value fires a pulse at `now`.
    pub fn default_true(self, now: GraphTime) -> Value {
        match self {
            ValueKind::None => Value::None,
            ValueKind::String => Value::String("true".into()),
            ValueKind::Bool => Value::Bool(true),
            ValueKind::Int => Value::Int(1),
            ValueKind::Number => Value::Number(1.0),
            ValueKind::LayerDimension => Value::LayerDimension(LayerDimension::Number(1.0)),
            ValueKind::Position => Value::Position(Point2::splat(1.0)),
            ValueKind::Size => Value::Size(LayerSize::square(1.0)),
            ValueKind::Point3D => Value::Point3D(Point3::splat(1.0)),
            ValueKind::Point4D => Value::Point4D(Point4::splat(1.0)),
            ValueKind::Padding => Value::Padding(Padding::uniform(1.0)),
            ValueKind::Spacing => Value::Spacing(Spacing::Number(1.0)),
            ValueKind::Color => Value::Color(Color::BLACK),
            ValueKind::Transform => Value::Transform(Transform3D::IDENTITY),
            ValueKind::TextFont => Value::TextFont(TextFont::default()),
            ValueKind::Shape => Value::Shape(Some(unit_square())),
            ValueKind::ShapeCommand => Value::ShapeCommand(ShapeCommand::LineTo { point: Point2::ZERO }),
            ValueKind::Pulse => Value::Pulse(now),
            ValueKind::Json => Value::Json(serde_json::Value::Bool(true)),
            ValueKind::AsyncMedia => Value::AsyncMedia(None),
            ValueKind::AssignedLayer => Value::AssignedLayer(None),
            ValueKind::AnchorEntity => Value::AnchorEntity(None),
            kind => categorical_default_true(kind).unwrap_or(Value::None),
        }
    }
}

fn unit_square() -> CustomShape {
    let p = Point2::new;
    CustomShape::new(vec![
        ShapeCommand::MoveTo { point: p(0.0, 0.0) },
        ShapeCommand::LineTo { point: p(1.0, 0.0) },
        ShapeCommand::LineTo { point: p(1.0, 1.0) },
        ShapeCommand::LineTo { point: p(0.0, 1.0) },
        ShapeCommand::ClosePath,
    ])
}
