//! The closed set of values a port can carry.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::categorical::*;
use super::geometry::*;
use super::NodeId;

/// Graph time in seconds since the prototype started.
pub type GraphTime = f64;

/// A port value.
///
/// Covers every semantic type in the editor:
/// - Scalars: Number, Int, Bool, String
/// - Numeric family: LayerDimension, Position, Size, Point3D, Point4D, Padding, Spacing
/// - Visual: Color, Transform, TextFont, Shape, ShapeCommand
/// - Handles: AsyncMedia, Json, AssignedLayer, AnchorEntity
/// - Events: Pulse
/// - Categorical enums (anchoring, blend mode, orientation, …)
///
/// Values are immutable snapshots; a port changes by storing a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    None,
    String(String),
    Bool(bool),
    Int(i64),
    Number(f64),

    // Numeric family
    LayerDimension(LayerDimension),
    Position(Point2),
    Size(LayerSize),
    Point3D(Point3),
    Point4D(Point4),
    Padding(Padding),
    Spacing(Spacing),

    // Visual
    Color(Color),
    Transform(Transform3D),
    TextFont(TextFont),
    Shape(Option<CustomShape>),
    ShapeCommand(ShapeCommand),

    // Handles and events
    Pulse(GraphTime),
    Json(serde_json::Value),
    AsyncMedia(Option<MediaObject>),
    AssignedLayer(Option<NodeId>),
    AnchorEntity(Option<NodeId>),

    // Categorical
    Anchoring(Anchoring),
    CameraDirection(CameraDirection),
    ScrollMode(ScrollMode),
    TextAlignment(TextAlignment),
    TextVerticalAlignment(TextVerticalAlignment),
    FitStyle(FitStyle),
    AnimationCurve(AnimationCurve),
    LightType(LightType),
    LayerStroke(LayerStroke),
    TextTransform(TextTransform),
    DateAndTimeFormat(DateAndTimeFormat),
    ScrollJumpStyle(ScrollJumpStyle),
    ScrollDecelerationRate(ScrollDecelerationRate),
    DelayStyle(DelayStyle),
    ShapeCoordinates(ShapeCoordinates),
    ShapeCommandType(ShapeCommandType),
    Orientation(Orientation),
    CameraOrientation(CameraOrientation),
    DeviceOrientation(DeviceOrientation),
    TextDecoration(TextDecoration),
    BlendMode(BlendMode),
    MapType(MapType),
    ProgressIndicatorStyle(ProgressIndicatorStyle),
    MobileHapticStyle(MobileHapticStyle),
    StrokeLineCap(StrokeLineCap),
    StrokeLineJoin(StrokeLineJoin),
    ContentMode(ContentMode),
    SizingScenario(SizingScenario),
    DeviceAppearance(DeviceAppearance),
    MaterialThickness(MaterialThickness),
    NetworkRequestType(NetworkRequestType),
}

/// The declared type of a port: one tag per [`Value`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    None,
    String,
    Bool,
    Int,
    Number,
    LayerDimension,
    Position,
    Size,
    Point3D,
    Point4D,
    Padding,
    Spacing,
    Color,
    Transform,
    TextFont,
    Shape,
    ShapeCommand,
    Pulse,
    Json,
    AsyncMedia,
    AssignedLayer,
    AnchorEntity,
    Anchoring,
    CameraDirection,
    ScrollMode,
    TextAlignment,
    TextVerticalAlignment,
    FitStyle,
    AnimationCurve,
    LightType,
    LayerStroke,
    TextTransform,
    DateAndTimeFormat,
    ScrollJumpStyle,
    ScrollDecelerationRate,
    DelayStyle,
    ShapeCoordinates,
    ShapeCommandType,
    Orientation,
    CameraOrientation,
    DeviceOrientation,
    TextDecoration,
    BlendMode,
    MapType,
    ProgressIndicatorStyle,
    MobileHapticStyle,
    StrokeLineCap,
    StrokeLineJoin,
    ContentMode,
    SizingScenario,
    DeviceAppearance,
    MaterialThickness,
    NetworkRequestType,
}

impl ValueKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [ValueKind] = &[
        ValueKind::None,
        ValueKind::String,
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Number,
        ValueKind::LayerDimension,
        ValueKind::Position,
        ValueKind::Size,
        ValueKind::Point3D,
        ValueKind::Point4D,
        ValueKind::Padding,
        ValueKind::Spacing,
        ValueKind::Color,
        ValueKind::Transform,
        ValueKind::TextFont,
        ValueKind::Shape,
        ValueKind::ShapeCommand,
        ValueKind::Pulse,
        ValueKind::Json,
        ValueKind::AsyncMedia,
        ValueKind::AssignedLayer,
        ValueKind::AnchorEntity,
        ValueKind::Anchoring,
        ValueKind::CameraDirection,
        ValueKind::ScrollMode,
        ValueKind::TextAlignment,
        ValueKind::TextVerticalAlignment,
        ValueKind::FitStyle,
        ValueKind::AnimationCurve,
        ValueKind::LightType,
        ValueKind::LayerStroke,
        ValueKind::TextTransform,
        ValueKind::DateAndTimeFormat,
        ValueKind::ScrollJumpStyle,
        ValueKind::ScrollDecelerationRate,
        ValueKind::DelayStyle,
        ValueKind::ShapeCoordinates,
        ValueKind::ShapeCommandType,
        ValueKind::Orientation,
        ValueKind::CameraOrientation,
        ValueKind::DeviceOrientation,
        ValueKind::TextDecoration,
        ValueKind::BlendMode,
        ValueKind::MapType,
        ValueKind::ProgressIndicatorStyle,
        ValueKind::MobileHapticStyle,
        ValueKind::StrokeLineCap,
        ValueKind::StrokeLineJoin,
        ValueKind::ContentMode,
        ValueKind::SizingScenario,
        ValueKind::DeviceAppearance,
        ValueKind::MaterialThickness,
        ValueKind::NetworkRequestType,
    ];

    /// Kinds whose values are built from one or more numbers.
    pub fn is_numeric_family(self) -> bool {
        matches!(
            self,
            ValueKind::Number
                | ValueKind::Int
                | ValueKind::LayerDimension
                | ValueKind::Position
                | ValueKind::Size
                | ValueKind::Point3D
                | ValueKind::Point4D
                | ValueKind::Padding
                | ValueKind::Spacing
        )
    }

    /// Kinds backed by a [`Categorical`] enum.
    pub fn is_categorical(self) -> bool {
        self >= ValueKind::Anchoring
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::None => "none",
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Number => "number",
            ValueKind::LayerDimension => "layerDimension",
            ValueKind::Position => "position",
            ValueKind::Size => "size",
            ValueKind::Point3D => "point3D",
            ValueKind::Point4D => "point4D",
            ValueKind::Padding => "padding",
            ValueKind::Spacing => "spacing",
            ValueKind::Color => "color",
            ValueKind::Transform => "transform",
            ValueKind::TextFont => "textFont",
            ValueKind::Shape => "shape",
            ValueKind::ShapeCommand => "shapeCommand",
            ValueKind::Pulse => "pulse",
            ValueKind::Json => "json",
            ValueKind::AsyncMedia => "media",
            ValueKind::AssignedLayer => "assignedLayer",
            ValueKind::AnchorEntity => "anchorEntity",
            ValueKind::Anchoring => "anchoring",
            ValueKind::CameraDirection => "cameraDirection",
            ValueKind::ScrollMode => "scrollMode",
            ValueKind::TextAlignment => "textAlignment",
            ValueKind::TextVerticalAlignment => "textVerticalAlignment",
            ValueKind::FitStyle => "fitStyle",
            ValueKind::AnimationCurve => "animationCurve",
            ValueKind::LightType => "lightType",
            ValueKind::LayerStroke => "layerStroke",
            ValueKind::TextTransform => "textTransform",
            ValueKind::DateAndTimeFormat => "dateAndTimeFormat",
            ValueKind::ScrollJumpStyle => "scrollJumpStyle",
            ValueKind::ScrollDecelerationRate => "scrollDecelerationRate",
            ValueKind::DelayStyle => "delayStyle",
            ValueKind::ShapeCoordinates => "shapeCoordinates",
            ValueKind::ShapeCommandType => "shapeCommandType",
            ValueKind::Orientation => "orientation",
            ValueKind::CameraOrientation => "cameraOrientation",
            ValueKind::DeviceOrientation => "deviceOrientation",
            ValueKind::TextDecoration => "textDecoration",
            ValueKind::BlendMode => "blendMode",
            ValueKind::MapType => "mapType",
            ValueKind::ProgressIndicatorStyle => "progressIndicatorStyle",
            ValueKind::MobileHapticStyle => "mobileHapticStyle",
            ValueKind::StrokeLineCap => "strokeLineCap",
            ValueKind::StrokeLineJoin => "strokeLineJoin",
            ValueKind::ContentMode => "contentMode",
            ValueKind::SizingScenario => "sizingScenario",
            ValueKind::DeviceAppearance => "deviceAppearance",
            ValueKind::MaterialThickness => "materialThickness",
            ValueKind::NetworkRequestType => "networkRequestType",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    /// The declared-type tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::String(_) => ValueKind::String,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Number(_) => ValueKind::Number,
            Value::LayerDimension(_) => ValueKind::LayerDimension,
            Value::Position(_) => ValueKind::Position,
            Value::Size(_) => ValueKind::Size,
            Value::Point3D(_) => ValueKind::Point3D,
            Value::Point4D(_) => ValueKind::Point4D,
            Value::Padding(_) => ValueKind::Padding,
            Value::Spacing(_) => ValueKind::Spacing,
            Value::Color(_) => ValueKind::Color,
            Value::Transform(_) => ValueKind::Transform,
            Value::TextFont(_) => ValueKind::TextFont,
            Value::Shape(_) => ValueKind::Shape,
            Value::ShapeCommand(_) => ValueKind::ShapeCommand,
            Value::Pulse(_) => ValueKind::Pulse,
            Value::Json(_) => ValueKind::Json,
            Value::AsyncMedia(_) => ValueKind::AsyncMedia,
            Value::AssignedLayer(_) => ValueKind::AssignedLayer,
            Value::AnchorEntity(_) => ValueKind::AnchorEntity,
            Value::Anchoring(_) => ValueKind::Anchoring,
            Value::CameraDirection(_) => ValueKind::CameraDirection,
            Value::ScrollMode(_) => ValueKind::ScrollMode,
            Value::TextAlignment(_) => ValueKind::TextAlignment,
            Value::TextVerticalAlignment(_) => ValueKind::TextVerticalAlignment,
            Value::FitStyle(_) => ValueKind::FitStyle,
            Value::AnimationCurve(_) => ValueKind::AnimationCurve,
            Value::LightType(_) => ValueKind::LightType,
            Value::LayerStroke(_) => ValueKind::LayerStroke,
            Value::TextTransform(_) => ValueKind::TextTransform,
            Value::DateAndTimeFormat(_) => ValueKind::DateAndTimeFormat,
            Value::ScrollJumpStyle(_) => ValueKind::ScrollJumpStyle,
            Value::ScrollDecelerationRate(_) => ValueKind::ScrollDecelerationRate,
            Value::DelayStyle(_) => ValueKind::DelayStyle,
            Value::ShapeCoordinates(_) => ValueKind::ShapeCoordinates,
            Value::ShapeCommandType(_) => ValueKind::ShapeCommandType,
            Value::Orientation(_) => ValueKind::Orientation,
            Value::CameraOrientation(_) => ValueKind::CameraOrientation,
            Value::DeviceOrientation(_) => ValueKind::DeviceOrientation,
            Value::TextDecoration(_) => ValueKind::TextDecoration,
            Value::BlendMode(_) => ValueKind::BlendMode,
            Value::MapType(_) => ValueKind::MapType,
            Value::ProgressIndicatorStyle(_) => ValueKind::ProgressIndicatorStyle,
            Value::MobileHapticStyle(_) => ValueKind::MobileHapticStyle,
            Value::StrokeLineCap(_) => ValueKind::StrokeLineCap,
            Value::StrokeLineJoin(_) => ValueKind::StrokeLineJoin,
            Value::ContentMode(_) => ValueKind::ContentMode,
            Value::SizingScenario(_) => ValueKind::SizingScenario,
            Value::DeviceAppearance(_) => ValueKind::DeviceAppearance,
            Value::MaterialThickness(_) => ValueKind::MaterialThickness,
            Value::NetworkRequestType(_) => ValueKind::NetworkRequestType,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Name of the case if this is a categorical value.
    pub fn categorical_name(&self) -> Option<&'static str> {
        Some(match self {
            Value::Anchoring(v) => v.name(),
            Value::CameraDirection(v) => v.name(),
            Value::ScrollMode(v) => v.name(),
            Value::TextAlignment(v) => v.name(),
            Value::TextVerticalAlignment(v) => v.name(),
            Value::FitStyle(v) => v.name(),
            Value::AnimationCurve(v) => v.name(),
            Value::LightType(v) => v.name(),
            Value::LayerStroke(v) => v.name(),
            Value::TextTransform(v) => v.name(),
            Value::DateAndTimeFormat(v) => v.name(),
            Value::ScrollJumpStyle(v) => v.name(),
            Value::ScrollDecelerationRate(v) => v.name(),
            Value::DelayStyle(v) => v.name(),
            Value::ShapeCoordinates(v) => v.name(),
            Value::ShapeCommandType(v) => v.name(),
            Value::Orientation(v) => v.name(),
            Value::CameraOrientation(v) => v.name(),
            Value::DeviceOrientation(v) => v.name(),
            Value::TextDecoration(v) => v.name(),
            Value::BlendMode(v) => v.name(),
            Value::MapType(v) => v.name(),
            Value::ProgressIndicatorStyle(v) => v.name(),
            Value::MobileHapticStyle(v) => v.name(),
            Value::StrokeLineCap(v) => v.name(),
            Value::StrokeLineJoin(v) => v.name(),
            Value::ContentMode(v) => v.name(),
            Value::SizingScenario(v) => v.name(),
            Value::DeviceAppearance(v) => v.name(),
            Value::MaterialThickness(v) => v.name(),
            Value::NetworkRequestType(v) => v.name(),
            _ => return None,
        })
    }

    /// Attempt to extract as f64 without any coercion fallback.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Number(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<Point2> for Value { fn from(v: Point2) -> Self { Value::Position(v) } }
impl From<LayerSize> for Value { fn from(v: LayerSize) -> Self { Value::Size(v) } }
impl From<Point3> for Value { fn from(v: Point3) -> Self { Value::Point3D(v) } }
impl From<Point4> for Value { fn from(v: Point4) -> Self { Value::Point4D(v) } }
impl From<Padding> for Value { fn from(v: Padding) -> Self { Value::Padding(v) } }
impl From<Color> for Value { fn from(v: Color) -> Self { Value::Color(v) } }
impl From<serde_json::Value> for Value { fn from(v: serde_json::Value) -> Self { Value::Json(v) } }

// ============================================================================
// Display
// ============================================================================

/// Human-readable text, used by the inspector and by string coercion.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.categorical_name() {
            return f.write_str(name);
        }
        match self {
            Value::None => write!(f, "none"),
            Value::String(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::LayerDimension(d) => write!(f, "{d}"),
            Value::Position(p) => write!(f, "{}, {}", p.x, p.y),
            Value::Size(s) => write!(f, "{} x {}", s.width, s.height),
            Value::Point3D(p) => write!(f, "{}, {}, {}", p.x, p.y, p.z),
            Value::Point4D(p) => write!(f, "{}, {}, {}, {}", p.x, p.y, p.z, p.w),
            Value::Padding(p) => write!(f, "{}, {}, {}, {}", p.top, p.right, p.bottom, p.left),
            Value::Spacing(Spacing::Number(n)) => write!(f, "{n}"),
            Value::Spacing(Spacing::Between) => write!(f, "between"),
            Value::Spacing(Spacing::Evenly) => write!(f, "evenly"),
            Value::Color(c) => f.write_str(&c.to_hex()),
            Value::Transform(t) => write!(
                f,
                "position({}, {}, {})",
                t.position.x, t.position.y, t.position.z
            ),
            Value::TextFont(font) => write!(f, "{} {}", font.family, font.weight),
            Value::Shape(Some(shape)) => write!(f, "shape[{}]", shape.commands.len()),
            Value::Shape(None) => write!(f, "no shape"),
            Value::ShapeCommand(cmd) => write!(f, "{cmd:?}"),
            Value::Pulse(t) => write!(f, "pulse@{t}"),
            Value::Json(j) => write!(f, "{j}"),
            Value::AsyncMedia(Some(media)) => f.write_str(&media.name),
            Value::AsyncMedia(None) => write!(f, "no media"),
            Value::AssignedLayer(Some(id)) | Value::AnchorEntity(Some(id)) => write!(f, "layer {id}"),
            Value::AssignedLayer(None) | Value::AnchorEntity(None) => write!(f, "none"),
            // Categorical values returned above.
            other => write!(f, "{}", other.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(3.5), Value::Number(3.5));
        assert_eq!(Value::from(true), Value::Bool(true));
    }

    #[test]
    fn test_kind_table_is_complete() {
        assert_eq!(ValueKind::ALL.len(), 53);
        for (i, kind) in ValueKind::ALL.iter().enumerate() {
            if i > 0 {
                assert!(ValueKind::ALL[i - 1] < *kind, "ALL must follow declaration order");
            }
        }
        assert!(ValueKind::BlendMode.is_categorical());
        assert!(!ValueKind::AnchorEntity.is_categorical());
        assert!(ValueKind::Padding.is_numeric_family());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::BlendMode(BlendMode::Screen).to_string(), "screen");
        assert_eq!(Value::Position(Point2::new(1.0, 2.5)).to_string(), "1, 2.5");
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
        assert_eq!(Value::Color(Color::WHITE).to_string(), "#FFFFFFFF");
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(Value::Number(2.0)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "Number", "value": 2.0 }));
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::Number(2.0));
    }
}
