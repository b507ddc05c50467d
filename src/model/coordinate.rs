//! Port addressing.
//!
//! Patch ports are addressed by position, layer ports by key path. Both forms
//! live in one [`PortId`] so the topology never cares which style a node uses.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::layer::LayerInput;

/// Opaque node identifier, allocated by the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which representation of a layer input a key path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerInputPortion {
    /// The whole, multi-field value.
    Packed,
    /// One field of the unpacked representation (e.g. `0` = X of a position).
    Unpacked(usize),
}

/// Structured address of a layer input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerInputKeyPath {
    pub layer_input: LayerInput,
    pub portion: LayerInputPortion,
}

impl LayerInputKeyPath {
    pub const fn packed(layer_input: LayerInput) -> Self {
        Self { layer_input, portion: LayerInputPortion::Packed }
    }

    pub const fn unpacked(layer_input: LayerInput, field: usize) -> Self {
        Self { layer_input, portion: LayerInputPortion::Unpacked(field) }
    }
}

/// Port identifier: positional (patch nodes) or key path (layer nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortId {
    Index(usize),
    KeyPath(LayerInputKeyPath),
}

impl From<usize> for PortId {
    fn from(index: usize) -> Self {
        PortId::Index(index)
    }
}

impl From<LayerInputKeyPath> for PortId {
    fn from(path: LayerInputKeyPath) -> Self {
        PortId::KeyPath(path)
    }
}

impl From<LayerInput> for PortId {
    fn from(input: LayerInput) -> Self {
        PortId::KeyPath(LayerInputKeyPath::packed(input))
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortId::Index(i) => write!(f, "#{i}"),
            PortId::KeyPath(path) => match path.portion {
                LayerInputPortion::Packed => write!(f, "{}", path.layer_input),
                LayerInputPortion::Unpacked(field) => {
                    write!(f, "{}.{field}", path.layer_input)
                }
            },
        }
    }
}

/// An input port of a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputCoordinate {
    pub node_id: NodeId,
    pub port: PortId,
}

impl InputCoordinate {
    pub fn new(node_id: NodeId, port: impl Into<PortId>) -> Self {
        Self { node_id, port: port.into() }
    }
}

impl fmt::Display for InputCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:in{}", self.node_id, self.port)
    }
}

/// An output port of a specific node. Outputs are always positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputCoordinate {
    pub node_id: NodeId,
    pub port_index: usize,
}

impl OutputCoordinate {
    pub const fn new(node_id: NodeId, port_index: usize) -> Self {
        Self { node_id, port_index }
    }
}

impl fmt::Display for OutputCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:out#{}", self.node_id, self.port_index)
    }
}

/// A directed connection. Each input has at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: OutputCoordinate,
    pub to: InputCoordinate,
}

impl Edge {
    pub const fn new(from: OutputCoordinate, to: InputCoordinate) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
