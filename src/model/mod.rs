//! # Value Model
//!
//! Plain data that crosses every boundary of the engine: values, declared
//! kinds, loops, port coordinates and the layer input catalog.
//!
//! Design rule: this module is pure data. No graph state, no I/O, no async.

pub mod categorical;
pub mod coordinate;
pub mod defaults;
pub mod geometry;
pub mod layer;
pub mod loops;
pub mod value;

pub use categorical::Categorical;
pub use coordinate::{
    Edge, InputCoordinate, LayerInputKeyPath, LayerInputPortion, NodeId, OutputCoordinate,
    PortId,
};
pub use geometry::{
    Color, CustomShape, LayerDimension, LayerSize, MediaObject, Padding, Point2, Point3, Point4,
    ShapeCommand, Spacing, TextFont, Transform3D,
};
pub use layer::{LayerInput, UnpackedFields};
pub use loops::{
    lengthen_arrays, lengthen_arrays_with, longest_loop_length, remap_values_by_loop,
    remap_values_by_loop_with, Loop, LoopAlignment,
};
pub use value::{GraphTime, Value, ValueKind};
