//! Node records stored in the graph arena.

use std::sync::Arc;

use crate::eval::{NodeCategory, NodeDefinition};
use crate::graph::row::{InputPort, RowObserver};
use crate::model::{
    GraphTime, LayerInputKeyPath, LayerInputPortion, Loop, NodeId, PortId, ValueKind,
};

/// One node: its definition plus the live rows of every port.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub(crate) id: NodeId,
    pub(crate) definition: Arc<NodeDefinition>,
    pub(crate) node_type: Option<ValueKind>,
    pub(crate) inputs: Vec<InputPort>,
    pub(crate) outputs: Vec<RowObserver>,
}

impl NodeState {
    pub(crate) fn new(id: NodeId, definition: Arc<NodeDefinition>) -> Self {
        let node_type = definition.default_type;
        let inputs = definition
            .inputs
            .iter()
            .map(|def| {
                let kind = if def.generic { node_type.unwrap_or(def.kind) } else { def.kind };
                InputPort::new(kind, &def.default, def.layer_input)
            })
            .collect();
        let outputs = definition
            .outputs
            .iter()
            .map(|def| {
                let kind = if def.generic { node_type.unwrap_or(def.kind) } else { def.kind };
                RowObserver::new(kind, &kind.default_value())
            })
            .collect();
        Self { id, definition, node_type, inputs, outputs }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind_name(&self) -> &str {
        &self.definition.name
    }

    pub fn category(&self) -> NodeCategory {
        self.definition.category
    }

    pub fn definition(&self) -> &Arc<NodeDefinition> {
        &self.definition
    }

    /// Current type of a type-changeable node.
    pub fn node_type(&self) -> Option<ValueKind> {
        self.node_type
    }

    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[RowObserver] {
        &self.outputs
    }

    pub fn output_loops(&self) -> Vec<Loop> {
        self.outputs.iter().map(|r| r.current_loop().clone()).collect()
    }

    /// Maps a port address to `(input index, field)`.
    pub fn resolve_port(&self, port: &PortId) -> Option<(usize, Option<usize>)> {
        let (index, field) = match port {
            PortId::Index(i) => (*i, None),
            PortId::KeyPath(path) => {
                let index = self.definition.layer_input_index(path.layer_input)?;
                match path.portion {
                    LayerInputPortion::Packed => (index, None),
                    LayerInputPortion::Unpacked(f) => (index, Some(f)),
                }
            }
        };
        let input = self.inputs.get(index)?;
        input.is_addressable(field).then_some((index, field))
    }

    /// Canonical address of `(input index, field)`: key paths for layer
    /// inputs, indices for patch inputs.
    pub fn canonical_port(&self, index: usize, field: Option<usize>) -> PortId {
        match self.inputs.get(index).and_then(InputPort::layer_input) {
            Some(input) => PortId::KeyPath(match field {
                None => LayerInputKeyPath::packed(input),
                Some(f) => LayerInputKeyPath::unpacked(input, f),
            }),
            None => PortId::Index(index),
        }
    }

    /// Retypes every generic port.
    pub(crate) fn set_node_type(&mut self, kind: ValueKind, now: GraphTime) {
        self.node_type = Some(kind);
        for (port, def) in self.inputs.iter_mut().zip(&self.definition.inputs) {
            if def.generic {
                port.change_kind(kind, now);
            }
        }
        for (row, def) in self.outputs.iter_mut().zip(&self.definition.outputs) {
            if def.generic {
                row.change_kind(kind, now);
            }
        }
    }
}
