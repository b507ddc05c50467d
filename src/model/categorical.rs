//! Enum-like port values.
//!
//! Every categorical type is a fieldless enum with a fixed, ordered case list.
//! They share one trait so the coercion engine can treat them uniformly:
//! parse by name, pick by index, and fall back to declared constants.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::{Value, ValueKind};

/// Shared behaviour of enum-like port values.
pub trait Categorical: Copy + PartialEq + Sized + 'static {
    /// Every case, in declaration order. Never empty.
    const ALL: &'static [Self];

    /// Stable display name of this case.
    fn name(&self) -> &'static str;

    /// The case used when a falsey value is coerced into this type.
    fn default_false() -> Self;

    /// The case used when a truthy value is coerced into this type: the case
    /// declared right after [`Categorical::default_false`].
    fn default_true() -> Self {
        let all = Self::ALL;
        let at = Self::default_false().index();
        all[(at + 1) % all.len()]
    }

    /// Case-insensitive lookup by name.
    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    /// Picks a case by index, wrapping in both directions.
    fn from_index(index: i64) -> Self {
        let len = Self::ALL.len() as i64;
        Self::ALL[index.rem_euclid(len) as usize]
    }

    /// Position of this case in [`Categorical::ALL`].
    fn index(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0)
    }
}

macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl Categorical for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            fn default_false() -> Self {
                $name::$default
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

categorical! {
    /// Which point of the parent a layer is pinned to.
    Anchoring {
        TopLeft => "topLeft",
        TopCenter => "topCenter",
        TopRight => "topRight",
        CenterLeft => "centerLeft",
        Center => "center",
        CenterRight => "centerRight",
        BottomLeft => "bottomLeft",
        BottomCenter => "bottomCenter",
        BottomRight => "bottomRight",
    }
    default TopLeft
}

categorical! {
    CameraDirection { Back => "back", Front => "front" }
    default Back
}

categorical! {
    ScrollMode { Free => "free", Paging => "paging", Disabled => "disabled" }
    default Free
}

categorical! {
    TextAlignment {
        Left => "left",
        Center => "center",
        Right => "right",
        Justify => "justify",
    }
    default Left
}

categorical! {
    TextVerticalAlignment { Top => "top", Center => "center", Bottom => "bottom" }
    default Top
}

categorical! {
    FitStyle { Fit => "fit", Fill => "fill", Stretch => "stretch" }
    default Fit
}

categorical! {
    /// Easing curve used by animation nodes.
    AnimationCurve {
        Linear => "linear",
        EaseIn => "easeIn",
        EaseOut => "easeOut",
        EaseInOut => "easeInOut",
        QuadraticIn => "quadraticIn",
        QuadraticOut => "quadraticOut",
        CubicIn => "cubicIn",
        CubicOut => "cubicOut",
    }
    default Linear
}

categorical! {
    LightType {
        Ambient => "ambient",
        Directional => "directional",
        Point => "point",
        Spot => "spot",
    }
    default Ambient
}

categorical! {
    LayerStroke { None => "none", Inside => "inside", Outside => "outside" }
    default None
}

categorical! {
    TextTransform {
        None => "none",
        Uppercase => "uppercase",
        Lowercase => "lowercase",
        Capitalize => "capitalize",
    }
    default None
}

categorical! {
    DateAndTimeFormat {
        None => "none",
        Short => "short",
        Medium => "medium",
        Long => "long",
        Full => "full",
    }
    default None
}

categorical! {
    ScrollJumpStyle { Animated => "animated", Instant => "instant" }
    default Animated
}

categorical! {
    ScrollDecelerationRate { Normal => "normal", Fast => "fast" }
    default Normal
}

categorical! {
    DelayStyle {
        Always => "always",
        Increasing => "increasing",
        Decreasing => "decreasing",
    }
    default Always
}

categorical! {
    ShapeCoordinates { Relative => "relative", Absolute => "absolute" }
    default Relative
}

categorical! {
    ShapeCommandType {
        MoveTo => "moveTo",
        LineTo => "lineTo",
        CurveTo => "curveTo",
        ClosePath => "closePath",
    }
    default MoveTo
}

categorical! {
    /// Stack direction of a group layer.
    Orientation {
        None => "none",
        Horizontal => "horizontal",
        Vertical => "vertical",
        Grid => "grid",
    }
    default None
}

categorical! {
    CameraOrientation {
        Portrait => "portrait",
        PortraitUpsideDown => "portraitUpsideDown",
        LandscapeLeft => "landscapeLeft",
        LandscapeRight => "landscapeRight",
    }
    default Portrait
}

categorical! {
    DeviceOrientation {
        Unknown => "unknown",
        Portrait => "portrait",
        PortraitUpsideDown => "portraitUpsideDown",
        LandscapeLeft => "landscapeLeft",
        LandscapeRight => "landscapeRight",
        FaceUp => "faceUp",
        FaceDown => "faceDown",
    }
    default Unknown
}

categorical! {
    TextDecoration {
        None => "none",
        Underline => "underline",
        Strikethrough => "strikethrough",
    }
    default None
}

categorical! {
    BlendMode {
        Normal => "normal",
        Darken => "darken",
        Multiply => "multiply",
        ColorBurn => "colorBurn",
        Lighten => "lighten",
        Screen => "screen",
        ColorDodge => "colorDodge",
        Overlay => "overlay",
        SoftLight => "softLight",
        HardLight => "hardLight",
        Difference => "difference",
        Exclusion => "exclusion",
        Hue => "hue",
        Saturation => "saturation",
        Color => "color",
        Luminosity => "luminosity",
    }
    default Normal
}

categorical! {
    MapType { Standard => "standard", Satellite => "satellite", Hybrid => "hybrid" }
    default Standard
}

categorical! {
    ProgressIndicatorStyle { Circular => "circular", Linear => "linear" }
    default Circular
}

categorical! {
    MobileHapticStyle {
        Heavy => "heavy",
        Light => "light",
        Medium => "medium",
        Rigid => "rigid",
        Soft => "soft",
    }
    default Heavy
}

categorical! {
    StrokeLineCap { Butt => "butt", Round => "round", Square => "square" }
    default Butt
}

categorical! {
    StrokeLineJoin { Miter => "miter", Round => "round", Bevel => "bevel" }
    default Miter
}

categorical! {
    ContentMode { Fit => "fit", Fill => "fill" }
    default Fit
}

categorical! {
    SizingScenario {
        Auto => "auto",
        ConstrainHeight => "constrainHeight",
        ConstrainWidth => "constrainWidth",
    }
    default Auto
}

categorical! {
    DeviceAppearance { System => "system", Light => "light", Dark => "dark" }
    default System
}

categorical! {
    MaterialThickness {
        UltraThin => "ultraThin",
        Thin => "thin",
        Regular => "regular",
        Thick => "thick",
        Chrome => "chrome",
    }
    default Regular
}

categorical! {
    /// HTTP method of a network request node.
    NetworkRequestType { Get => "get", Post => "post" }
    default Get
}

// ============================================================================
// Kind-level dispatch
// ============================================================================

/// Generic operation over "some categorical type", selected by [`ValueKind`].
///
/// Lets callers write one routine (parse by name, pick by index, fetch the
/// declared constants) instead of one match arm per enum.
pub trait CategoricalVisitor {
    type Output;

    fn visit<T: Categorical>(self, wrap: fn(T) -> Value) -> Self::Output;
}

/// Runs `visitor` for the categorical type behind `kind`. Returns `None` for
/// non-categorical kinds.
pub fn visit_categorical<V: CategoricalVisitor>(kind: ValueKind, visitor: V) -> Option<V::Output> {
    Some(match kind {
        ValueKind::Anchoring => visitor.visit(Value::Anchoring),
        ValueKind::CameraDirection => visitor.visit(Value::CameraDirection),
        ValueKind::ScrollMode => visitor.visit(Value::ScrollMode),
        ValueKind::TextAlignment => visitor.visit(Value::TextAlignment),
        ValueKind::TextVerticalAlignment => visitor.visit(Value::TextVerticalAlignment),
        ValueKind::FitStyle => visitor.visit(Value::FitStyle),
        ValueKind::AnimationCurve => visitor.visit(Value::AnimationCurve),
        ValueKind::LightType => visitor.visit(Value::LightType),
        ValueKind::LayerStroke => visitor.visit(Value::LayerStroke),
        ValueKind::TextTransform => visitor.visit(Value::TextTransform),
        ValueKind::DateAndTimeFormat => visitor.visit(Value::DateAndTimeFormat),
        ValueKind::ScrollJumpStyle => visitor.visit(Value::ScrollJumpStyle),
        ValueKind::ScrollDecelerationRate => visitor.visit(Value::ScrollDecelerationRate),
        ValueKind::DelayStyle => visitor.visit(Value::DelayStyle),
        ValueKind::ShapeCoordinates => visitor.visit(Value::ShapeCoordinates),
        ValueKind::ShapeCommandType => visitor.visit(Value::ShapeCommandType),
        ValueKind::Orientation => visitor.visit(Value::Orientation),
        ValueKind::CameraOrientation => visitor.visit(Value::CameraOrientation),
        ValueKind::DeviceOrientation => visitor.visit(Value::DeviceOrientation),
        ValueKind::TextDecoration => visitor.visit(Value::TextDecoration),
        ValueKind::BlendMode => visitor.visit(Value::BlendMode),
        ValueKind::MapType => visitor.visit(Value::MapType),
        ValueKind::ProgressIndicatorStyle => visitor.visit(Value::ProgressIndicatorStyle),
        ValueKind::MobileHapticStyle => visitor.visit(Value::MobileHapticStyle),
        ValueKind::StrokeLineCap => visitor.visit(Value::StrokeLineCap),
        ValueKind::StrokeLineJoin => visitor.visit(Value::StrokeLineJoin),
        ValueKind::ContentMode => visitor.visit(Value::ContentMode),
        ValueKind::SizingScenario => visitor.visit(Value::SizingScenario),
        ValueKind::DeviceAppearance => visitor.visit(Value::DeviceAppearance),
        ValueKind::MaterialThickness => visitor.visit(Value::MaterialThickness),
        ValueKind::NetworkRequestType => visitor.visit(Value::NetworkRequestType),
        _ => return None,
    })
}

struct DefaultFalse;

impl CategoricalVisitor for DefaultFalse {
    type Output = Value;

    fn visit<T: Categorical>(self, wrap: fn(T) -> Value) -> Value {
        wrap(T::default_false())
    }
}

struct DefaultTrue;

impl CategoricalVisitor for DefaultTrue {
    type Output = Value;

    fn visit<T: Categorical>(self, wrap: fn(T) -> Value) -> Value {
        wrap(T::default_true())
    }
}

/// Looks a case up by name.
pub(crate) struct ByName<'a>(pub &'a str);

impl CategoricalVisitor for ByName<'_> {
    type Output = Option<Value>;

    fn visit<T: Categorical>(self, wrap: fn(T) -> Value) -> Option<Value> {
        T::from_name(self.0).map(wrap)
    }
}

/// Picks a case by (wrapping) index.
pub(crate) struct ByIndex(pub i64);

impl CategoricalVisitor for ByIndex {
    type Output = Value;

    fn visit<T: Categorical>(self, wrap: fn(T) -> Value) -> Value {
        wrap(T::from_index(self.0))
    }
}

/// Declared falsey constant of a categorical kind.
pub fn categorical_default_false(kind: ValueKind) -> Option<Value> {
    visit_categorical(kind, DefaultFalse)
}

/// Declared truthy constant of a categorical kind.
pub fn categorical_default_true(kind: ValueKind) -> Option<Value> {
    visit_categorical(kind, DefaultTrue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(BlendMode::from_name("MULTIPLY"), Some(BlendMode::Multiply));
        assert_eq!(BlendMode::from_name(" screen "), Some(BlendMode::Screen));
        assert_eq!(BlendMode::from_name("glow"), None);
    }

    #[test]
    fn test_from_index_wraps() {
        assert_eq!(Orientation::from_index(1), Orientation::Horizontal);
        assert_eq!(Orientation::from_index(4), Orientation::None);
        assert_eq!(Orientation::from_index(-1), Orientation::Grid);
    }

    #[test]
    fn test_default_true_follows_default_false() {
        assert_eq!(MaterialThickness::default_false(), MaterialThickness::Regular);
        assert_eq!(MaterialThickness::default_true(), MaterialThickness::Thick);
        // Wraps past the last case.
        assert_eq!(CameraDirection::default_true(), CameraDirection::Front);
        assert_eq!(ContentMode::default_true(), ContentMode::Fill);
    }

    #[test]
    fn test_visit_categorical_dispatch() {
        assert_eq!(
            visit_categorical(ValueKind::BlendMode, ByName("overlay")),
            Some(Some(Value::BlendMode(BlendMode::Overlay)))
        );
        assert_eq!(
            visit_categorical(ValueKind::Orientation, ByIndex(2)),
            Some(Value::Orientation(Orientation::Vertical))
        );
        assert_eq!(visit_categorical(ValueKind::Number, ByIndex(0)), None);
        for kind in ValueKind::ALL.iter().filter(|k| k.is_categorical()) {
            let value = categorical_default_false(*kind).unwrap();
            assert_eq!(value.kind(), *kind);
        }
    }
}
