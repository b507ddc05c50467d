//! Structured payloads carried by the numeric-family and visual value variants.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 2D position (also used for offsets and anchors expressed in points).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const ZERO: Point2 = Point2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v }
    }
}

/// 3D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }
}

/// 4D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Point4 {
    pub const ZERO: Point4 = Point4 { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v, w: v }
    }
}

/// One axis of a layer's size.
///
/// Only `Number` and `Percent` carry a numeric component; the others are
/// resolved by the layout collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum LayerDimension {
    Number(f64),
    Percent(f64),
    Auto,
    Fill,
    Hug,
}

impl LayerDimension {
    /// The numeric component, if this dimension has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LayerDimension::Number(n) | LayerDimension::Percent(n) => Some(*n),
            _ => None,
        }
    }

    /// Parses `"auto"`, `"fill"`, `"hug"`, `"50%"` or a plain number.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "auto" => return Some(LayerDimension::Auto),
            "fill" => return Some(LayerDimension::Fill),
            "hug" => return Some(LayerDimension::Hug),
            _ => {}
        }
        if let Some(pct) = s.strip_suffix('%') {
            return finite(pct).map(LayerDimension::Percent);
        }
        finite(s).map(LayerDimension::Number)
    }
}

impl Default for LayerDimension {
    fn default() -> Self {
        LayerDimension::Number(0.0)
    }
}

impl fmt::Display for LayerDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerDimension::Number(n) => write!(f, "{n}"),
            LayerDimension::Percent(n) => write!(f, "{n}%"),
            LayerDimension::Auto => write!(f, "auto"),
            LayerDimension::Fill => write!(f, "fill"),
            LayerDimension::Hug => write!(f, "hug"),
        }
    }
}

fn finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Layer size: width and height, each a [`LayerDimension`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerSize {
    pub width: LayerDimension,
    pub height: LayerDimension,
}

impl LayerSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width: LayerDimension::Number(width),
            height: LayerDimension::Number(height),
        }
    }

    pub const fn square(side: f64) -> Self {
        Self::new(side, side)
    }

    pub fn width_number(&self) -> Option<f64> {
        self.width.as_number()
    }

    pub fn height_number(&self) -> Option<f64> {
        self.height.as_number()
    }
}

/// Edge insets, clockwise from the top.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self { top, right, bottom, left }
    }

    pub const fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v)
    }
}

/// Spacing between stacked children.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Spacing {
    Number(f64),
    Between,
    Evenly,
}

impl Spacing {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Spacing::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "between" => Some(Spacing::Between),
            "evenly" => Some(Spacing::Evenly),
            other => finite(other).map(Spacing::Number),
        }
    }
}

impl Default for Spacing {
    fn default() -> Self {
        Spacing::Number(0.0)
    }
}

/// RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self { red, green, blue, alpha }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| -> Option<f64> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .ok()
                .map(|c| f64::from(c) / 255.0)
        };
        let alpha = if hex.len() == 8 { channel(6)? } else { 1.0 };
        Some(Color::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    pub fn to_hex(&self) -> String {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02X}{:02X}{:02X}{:02X}",
            c(self.red),
            c(self.green),
            c(self.blue),
            c(self.alpha)
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Decomposed 3D transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub position: Point3,
    pub scale: Point3,
    pub rotation: Point3,
}

impl Transform3D {
    pub const IDENTITY: Transform3D = Transform3D {
        position: Point3::ZERO,
        scale: Point3::splat(1.0),
        rotation: Point3::ZERO,
    };

    pub const fn translation(position: Point3) -> Self {
        Self { position, ..Self::IDENTITY }
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Transform3D::IDENTITY
    }
}

/// Font selection for text layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextFont {
    pub family: String,
    pub weight: u16,
}

impl Default for TextFont {
    fn default() -> Self {
        Self { family: "system".into(), weight: 400 }
    }
}

/// Handle to decoded media (image, video frame, model …) produced by a
/// collaborator. The payload is reference-counted and never copied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaObject {
    /// Collaborator-assigned identifier.
    pub id: u64,
    pub name: String,
    pub mime: String,
    pub data: Bytes,
}

impl MediaObject {
    pub fn new(id: u64, name: impl Into<String>, mime: impl Into<String>, data: Bytes) -> Self {
        Self { id, name: name.into(), mime: mime.into(), data }
    }
}

/// One drawing instruction of a custom shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShapeCommand {
    MoveTo { point: Point2 },
    LineTo { point: Point2 },
    CurveTo { point: Point2, control1: Point2, control2: Point2 },
    ClosePath,
}

impl Default for ShapeCommand {
    fn default() -> Self {
        ShapeCommand::MoveTo { point: Point2::ZERO }
    }
}

/// A path-based shape built from [`ShapeCommand`]s.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomShape {
    pub commands: Vec<ShapeCommand>,
}

impl CustomShape {
    pub fn new(commands: Vec<ShapeCommand>) -> Self {
        Self { commands }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Parses a list of JSON shape commands. Returns `None` when the payload
    /// is not a non-empty command array.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        let commands: Vec<ShapeCommand> = serde_json::from_value(json.clone()).ok()?;
        (!commands.is_empty()).then(|| CustomShape::new(commands))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_dimension_parse() {
        assert_eq!(LayerDimension::parse("auto"), Some(LayerDimension::Auto));
        assert_eq!(LayerDimension::parse(" 50% "), Some(LayerDimension::Percent(50.0)));
        assert_eq!(LayerDimension::parse("12.5"), Some(LayerDimension::Number(12.5)));
        assert_eq!(LayerDimension::parse("wide"), None);
    }

    #[test]
    fn test_color_hex_roundtrip() {
        let c = Color::from_hex("#FF000080").unwrap();
        assert_eq!(c.red, 1.0);
        assert_eq!(c.to_hex(), "#FF000080");
        assert!(Color::from_hex("#12").is_none());
        assert!(Color::from_hex("zzzzzz").is_none());
    }

    #[test]
    fn test_shape_from_json() {
        let json = serde_json::json!([
            { "type": "moveTo", "point": { "x": 0.0, "y": 0.0 } },
            { "type": "lineTo", "point": { "x": 10.0, "y": 0.0 } },
            { "type": "closePath" }
        ]);
        let shape = CustomShape::from_json(&json).unwrap();
        assert_eq!(shape.commands.len(), 3);
        assert!(CustomShape::from_json(&serde_json::json!("nope")).is_none());
        assert!(CustomShape::from_json(&serde_json::json!([])).is_none());
    }
}
