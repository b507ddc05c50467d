//! Truthy/falsey interpretation of every value.

use crate::model::{LayerDimension, Spacing, Value};

/// Whether `value` counts as "true" when coerced to a boolean or when a
/// coercion falls back to a declared constant.
///
/// - Booleans map directly; numbers are falsey only at zero (and NaN).
/// - Strings: empty is falsey, `"true"`/`"false"` are literal, numeric text
///   follows the number rule, any other text is truthy.
/// - Multi-component numerics are truthy when any component is non-zero.
/// - JSON follows JavaScript-style truthiness.
/// - Handles (media, shape, layer references) are truthy when present.
/// - Kinds without a natural truthiness (colors, fonts, transforms,
///   categorical enums) are falsey exactly when equal to their declared
///   `default_false` constant.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Number(n) => number_truthy(*n),
        Value::String(s) => string_truthy(s),
        Value::LayerDimension(d) => match d {
            LayerDimension::Number(n) | LayerDimension::Percent(n) => number_truthy(*n),
            LayerDimension::Auto | LayerDimension::Fill | LayerDimension::Hug => true,
        },
        Value::Position(p) => [p.x, p.y].into_iter().any(number_truthy),
        Value::Size(s) => {
            is_truthy(&Value::LayerDimension(s.width)) || is_truthy(&Value::LayerDimension(s.height))
        }
        Value::Point3D(p) => [p.x, p.y, p.z].into_iter().any(number_truthy),
        Value::Point4D(p) => [p.x, p.y, p.z, p.w].into_iter().any(number_truthy),
        Value::Padding(p) => [p.top, p.right, p.bottom, p.left].into_iter().any(number_truthy),
        Value::Spacing(Spacing::Number(n)) => number_truthy(*n),
        Value::Spacing(_) => true,
        Value::Pulse(t) => number_truthy(*t),
        Value::Json(j) => json_truthy(j),
        Value::Shape(shape) => shape.as_ref().is_some_and(|s| !s.is_empty()),
        Value::AsyncMedia(media) => media.is_some(),
        Value::AssignedLayer(id) | Value::AnchorEntity(id) => id.is_some(),
        other => *other != other.kind().default_false(),
    }
}

fn number_truthy(n: f64) -> bool {
    n != 0.0 && !n.is_nan()
}

fn string_truthy(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    if s.eq_ignore_ascii_case("true") {
        return true;
    }
    if s.eq_ignore_ascii_case("false") {
        return false;
    }
    match s.parse::<f64>() {
        Ok(n) => number_truthy(n),
        Err(_) => true,
    }
}

fn json_truthy(j: &serde_json::Value) -> bool {
    match j {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(number_truthy),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
    }
}
