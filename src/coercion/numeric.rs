//! Component extraction for the numeric family.
//!
//! Narrowing takes leading components; widening broadcasts a scalar into
//! every component. Each helper returns `None` when the source has no
//! numeric reading, letting the caller fall back to declared constants.

use crate::model::{LayerDimension, Value};

/// Parses numeric text, ignoring surrounding whitespace.
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// The first numeric component of `value`.
pub(crate) fn scalar(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Int(i) => Some(*i as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_number(s),
        Value::LayerDimension(d) => d.as_number(),
        Value::Position(p) => Some(p.x),
        Value::Size(s) => s.width_number(),
        Value::Point3D(p) => Some(p.x),
        Value::Point4D(p) => Some(p.x),
        Value::Padding(p) => Some(p.top),
        Value::Spacing(s) => s.as_number(),
        Value::Json(serde_json::Value::Number(n)) => n.as_f64(),
        Value::Json(serde_json::Value::String(s)) => parse_number(s),
        _ => None,
    }
}

/// Two leading components: (x, y), (width, height), or a broadcast scalar.
///
/// Padding reads as (right, bottom), the pair that positions a trailing
/// corner inset.
pub(crate) fn pair(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Position(p) => Some((p.x, p.y)),
        Value::Size(s) => match (s.width_number(), s.height_number()) {
            (Some(w), Some(h)) => Some((w, h)),
            (Some(n), None) | (None, Some(n)) => Some((n, n)),
            (None, None) => None,
        },
        Value::Point3D(p) => Some((p.x, p.y)),
        Value::Point4D(p) => Some((p.x, p.y)),
        Value::Padding(p) => Some((p.right, p.bottom)),
        other => scalar(other).map(|n| (n, n)),
    }
}

/// Three components; two-component sources get `z = 0`.
pub(crate) fn triple(value: &Value) -> Option<(f64, f64, f64)> {
    match value {
        Value::Point3D(p) => Some((p.x, p.y, p.z)),
        Value::Point4D(p) => Some((p.x, p.y, p.z)),
        Value::Padding(p) => Some((p.top, p.right, p.bottom)),
        Value::Position(_) | Value::Size(_) => pair(value).map(|(x, y)| (x, y, 0.0)),
        other => scalar(other).map(|n| (n, n, n)),
    }
}

/// Four components; shorter sources are zero-extended.
pub(crate) fn quad(value: &Value) -> Option<(f64, f64, f64, f64)> {
    match value {
        Value::Point4D(p) => Some((p.x, p.y, p.z, p.w)),
        Value::Padding(p) => Some((p.top, p.right, p.bottom, p.left)),
        Value::Point3D(p) => Some((p.x, p.y, p.z, 0.0)),
        Value::Position(_) | Value::Size(_) => pair(value).map(|(x, y)| (x, y, 0.0, 0.0)),
        other => scalar(other).map(|n| (n, n, n, n)),
    }
}

/// A layer dimension reading: keeps non-numeric dimensions intact.
pub(crate) fn dimension(value: &Value) -> Option<LayerDimension> {
    match value {
        Value::LayerDimension(d) => Some(*d),
        Value::Size(s) => Some(s.width),
        Value::String(s) => LayerDimension::parse(s),
        other => scalar(other).map(LayerDimension::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    #[test]
    fn test_scalar_takes_first_component() {
        assert_eq!(scalar(&Value::Position(Point2::new(4.0, 9.0))), Some(4.0));
        assert_eq!(scalar(&Value::Padding(Padding::new(1.0, 2.0, 3.0, 4.0))), Some(1.0));
        assert_eq!(scalar(&Value::Size(LayerSize { width: LayerDimension::Auto, height: LayerDimension::Number(3.0) })), None);
        assert_eq!(scalar(&Value::from(" 12 ")), Some(12.0));
        assert_eq!(scalar(&Value::from("inf")), None);
    }

    #[test]
    fn test_pair_rules() {
        assert_eq!(pair(&Value::Number(5.0)), Some((5.0, 5.0)));
        assert_eq!(pair(&Value::Padding(Padding::new(1.0, 2.0, 3.0, 4.0))), Some((2.0, 3.0)));
        assert_eq!(pair(&Value::Color(Color::WHITE)), None);
    }

    #[test]
    fn test_widening() {
        assert_eq!(triple(&Value::Position(Point2::new(1.0, 2.0))), Some((1.0, 2.0, 0.0)));
        assert_eq!(quad(&Value::Int(2)), Some((2.0, 2.0, 2.0, 2.0)));
    }
}
