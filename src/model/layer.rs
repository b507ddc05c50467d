//! Layer input catalog and packed/unpacked field mapping.
//!
//! Multi-field layer inputs (position, size, padding, …) may be edited as one
//! packed value or as independent per-field ports. This module owns the pure
//! mapping between the two shapes; the row model decides which is live.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::geometry::*;
use super::value::{Value, ValueKind};
use crate::coercion::coerce;

/// Field values of one unpacked layer input.
pub type UnpackedFields = SmallVec<[Value; 4]>;

/// Inputs a layer node can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerInput {
    Position,
    Size,
    Scale,
    Opacity,
    Rotation,
    Color,
    Padding,
    Margin,
    Anchoring,
    Text,
    FontSize,
    TextAlignment,
    BlendMode,
    CornerRadius,
    ZIndex,
}

impl LayerInput {
    pub fn name(self) -> &'static str {
        match self {
            LayerInput::Position => "position",
            LayerInput::Size => "size",
            LayerInput::Scale => "scale",
            LayerInput::Opacity => "opacity",
            LayerInput::Rotation => "rotation",
            LayerInput::Color => "color",
            LayerInput::Padding => "padding",
            LayerInput::Margin => "margin",
            LayerInput::Anchoring => "anchoring",
            LayerInput::Text => "text",
            LayerInput::FontSize => "fontSize",
            LayerInput::TextAlignment => "textAlignment",
            LayerInput::BlendMode => "blendMode",
            LayerInput::CornerRadius => "cornerRadius",
            LayerInput::ZIndex => "zIndex",
        }
    }

    /// Declared kind of the packed port.
    pub fn value_kind(self) -> ValueKind {
        match self {
            LayerInput::Position => ValueKind::Position,
            LayerInput::Size => ValueKind::Size,
            LayerInput::Rotation => ValueKind::Point3D,
            LayerInput::Color => ValueKind::Color,
            LayerInput::Padding | LayerInput::Margin => ValueKind::Padding,
            LayerInput::Anchoring => ValueKind::Anchoring,
            LayerInput::Text => ValueKind::String,
            LayerInput::TextAlignment => ValueKind::TextAlignment,
            LayerInput::BlendMode => ValueKind::BlendMode,
            LayerInput::Scale
            | LayerInput::Opacity
            | LayerInput::FontSize
            | LayerInput::CornerRadius
            | LayerInput::ZIndex => ValueKind::Number,
        }
    }

    /// Default value of the packed port.
    pub fn default_value(self) -> Value {
        match self {
            LayerInput::Scale | LayerInput::Opacity => Value::Number(1.0),
            LayerInput::FontSize => Value::Number(17.0),
            LayerInput::Color => Value::Color(Color::rgba(0.0, 0.48, 1.0, 1.0)),
            LayerInput::Text => Value::String("Text".into()),
            other => other.value_kind().default_value(),
        }
    }

    /// Kinds of the unpacked fields, in field order. Empty when the input
    /// has only a packed form.
    pub fn unpacked_kinds(self) -> &'static [ValueKind] {
        const XY: &[ValueKind] = &[ValueKind::Number, ValueKind::Number];
        const XYZ: &[ValueKind] = &[ValueKind::Number, ValueKind::Number, ValueKind::Number];
        const EDGES: &[ValueKind] = &[
            ValueKind::Number,
            ValueKind::Number,
            ValueKind::Number,
            ValueKind::Number,
        ];
        const DIMS: &[ValueKind] = &[ValueKind::LayerDimension, ValueKind::LayerDimension];
        match self {
            LayerInput::Position => XY,
            LayerInput::Size => DIMS,
            LayerInput::Rotation => XYZ,
            LayerInput::Padding | LayerInput::Margin => EDGES,
            _ => &[],
        }
    }

    pub fn is_unpackable(self) -> bool {
        !self.unpacked_kinds().is_empty()
    }

    /// Splits a packed value into its fields. The value is coerced to the
    /// packed kind first, so any input is accepted.
    pub fn unpack(self, value: &Value) -> UnpackedFields {
        let mut fields = UnpackedFields::new();
        match coerce(value, self.value_kind(), 0.0) {
            Value::Position(p) => fields.extend([Value::Number(p.x), Value::Number(p.y)]),
            Value::Size(s) => fields.extend([
                Value::LayerDimension(s.width),
                Value::LayerDimension(s.height),
            ]),
            Value::Point3D(p) => {
                fields.extend([Value::Number(p.x), Value::Number(p.y), Value::Number(p.z)])
            }
            Value::Padding(p) => fields.extend([
                Value::Number(p.top),
                Value::Number(p.right),
                Value::Number(p.bottom),
                Value::Number(p.left),
            ]),
            other => fields.push(other),
        }
        fields
    }

    /// Rebuilds the packed value from field values. Missing fields take the
    /// field's default; each field is coerced to its declared kind.
    pub fn pack(self, fields: &[Value]) -> Value {
        let kinds = self.unpacked_kinds();
        if kinds.is_empty() {
            return fields
                .first()
                .map(|v| coerce(v, self.value_kind(), 0.0))
                .unwrap_or_else(|| self.default_value());
        }

        let field = |i: usize| -> Value {
            match fields.get(i) {
                Some(v) => coerce(v, kinds[i], 0.0),
                None => kinds[i].default_false(),
            }
        };
        let num = |i: usize| field(i).as_number().unwrap_or(0.0);
        let dim = |i: usize| match field(i) {
            Value::LayerDimension(d) => d,
            _ => LayerDimension::default(),
        };

        match self {
            LayerInput::Position => Value::Position(Point2::new(num(0), num(1))),
            LayerInput::Size => Value::Size(LayerSize { width: dim(0), height: dim(1) }),
            LayerInput::Rotation => Value::Point3D(Point3::new(num(0), num(1), num(2))),
            LayerInput::Padding | LayerInput::Margin => {
                Value::Padding(Padding::new(num(0), num(1), num(2), num(3)))
            }
            _ => self.default_value(),
        }
    }
}

impl fmt::Display for LayerInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
