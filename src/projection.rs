//! Graph snapshots for the persistence collaborator.
//!
//! A snapshot captures the node set, each port's values and representation,
//! and the edges. Restoring one rebuilds nodes from the registry and puts the
//! saved values back without re-evaluating.
//!
//! ```text
//! GraphState → snapshot() → GraphSnapshot → export_json() → document
//! document → import_json() → GraphSnapshot → GraphState::restore()
//! ```
//!
//! In-flight requests are not persisted: restored async lanes come back
//! with `loading` cleared.

use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::eval::NodeRegistry;
use crate::graph::{GraphState, InputMode, NodeState};
use crate::model::{Edge, GraphTime, Loop, NodeId, Value, ValueKind};
use crate::{Error, Result};

// ============================================================================
// Snapshot types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub graph_time: GraphTime,
    pub next_node_id: u64,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<ValueKind>,
    pub inputs: Vec<InputSnapshot>,
    pub outputs: Vec<Loop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum InputSnapshot {
    Packed { values: Loop },
    Unpacked { fields: Vec<Loop> },
}

// ============================================================================
// Capture
// ============================================================================

impl GraphState {
    pub fn snapshot(&self) -> GraphSnapshot {
        let alignment = self.config.loop_alignment;
        let nodes = self
            .node_ids()
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .map(|node| NodeSnapshot {
                id: node.id(),
                kind: node.kind_name().to_string(),
                node_type: node.node_type(),
                inputs: node
                    .inputs()
                    .iter()
                    .map(|port| match port.mode() {
                        InputMode::Packed => InputSnapshot::Packed { values: port.current_loop(alignment) },
                        InputMode::Unpacked => InputSnapshot::Unpacked {
                            fields: (0..port.field_count())
                                .filter_map(|i| port.loop_at(Some(i), alignment))
                                .collect(),
                        },
                    })
                    .collect(),
                outputs: node.output_loops(),
            })
            .collect();

        GraphSnapshot {
            graph_time: self.graph_time,
            next_node_id: self.next_node_id,
            nodes,
            edges: self.edges(),
        }
    }

    /// Rebuilds a graph from `snapshot`. Every node kind must be registered
    /// and every port list must match its definition.
    pub fn restore(snapshot: GraphSnapshot, registry: Arc<NodeRegistry>, config: GraphConfig) -> Result<Self> {
        let mut state = GraphState::new(registry, config);
        state.graph_time = snapshot.graph_time;
        let (alignment, now) = (state.config.loop_alignment, state.graph_time);

        let mut max_id = 0;
        for saved in snapshot.nodes {
            let definition = state.registry.require(&saved.kind)?;
            if state.nodes.contains_key(&saved.id) {
                return Err(Error::Snapshot(format!("duplicate node id {}", saved.id)));
            }
            if saved.inputs.len() != definition.inputs.len() || saved.outputs.len() != definition.outputs.len() {
                return Err(Error::Snapshot(format!(
                    "node {} ({}) does not match its definition's ports",
                    saved.id, saved.kind
                )));
            }

            let mut node = NodeState::new(saved.id, definition);
            if let Some(kind) = saved.node_type {
                if !node.definition().is_type_changeable() {
                    return Err(Error::NotTypeChangeable(saved.kind));
                }
                node.set_node_type(kind, now);
            }
            for (port, input) in node.inputs.iter_mut().zip(saved.inputs) {
                match input {
                    InputSnapshot::Packed { values } => {
                        port.set_values(None, values, alignment, now);
                    }
                    InputSnapshot::Unpacked { fields } => {
                        port.set_mode(InputMode::Unpacked, alignment, now);
                        for (i, values) in fields.into_iter().enumerate() {
                            port.set_values(Some(i), values, alignment, now);
                        }
                    }
                }
            }
            for (row, values) in node.outputs.iter_mut().zip(saved.outputs) {
                row.set_values(values, now);
            }
            let async_ports = node.definition().async_ports;
            if let Some(ports) = async_ports {
                if let Some(row) = node.outputs.get_mut(ports.loading) {
                    let idle = row.current_loop().map(|_| Value::Bool(false));
                    row.set_values(idle, now);
                }
            }

            max_id = max_id.max(saved.id.0);
            state.nodes.insert(saved.id, node);
        }
        state.next_node_id = snapshot.next_node_id.max(max_id + 1);

        for edge in snapshot.edges {
            state.link(edge.from, edge.to)?;
        }
        state.changed_nodes.clear();
        tracing::debug!(nodes = state.node_count(), edges = state.topology.len(), "graph restored");
        Ok(state)
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Writes `state` as a pretty-printed JSON snapshot.
pub fn export_json(state: &GraphState, writer: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &state.snapshot())?;
    writeln!(writer)?;
    Ok(())
}

/// Reads a JSON snapshot and restores it.
pub fn import_json(reader: &mut dyn Read, registry: Arc<NodeRegistry>, config: GraphConfig) -> Result<GraphState> {
    let snapshot: GraphSnapshot = serde_json::from_reader(reader)?;
    GraphState::restore(snapshot, registry, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InputCoordinate, LayerInput, LayerInputKeyPath, OutputCoordinate, Point2};

    fn registry() -> Arc<NodeRegistry> {
        Arc::new(NodeRegistry::with_builtins())
    }

    #[test]
    fn test_snapshot_restores_values_and_edges() {
        let mut g = GraphState::new(registry(), GraphConfig::default());
        let a = g.add_node("add").unwrap();
        let rect = g.add_node("rectangle").unwrap();
        let v = g.add_node("value").unwrap();
        g.set_input_values(InputCoordinate::new(a, 0), Loop::new([1.0, 2.0]).unwrap()).unwrap();
        g.set_input_mode(rect, LayerInput::Position, InputMode::Unpacked).unwrap();
        g.connect(
            OutputCoordinate::new(a, 0),
            InputCoordinate::new(rect, LayerInputKeyPath::unpacked(LayerInput::Position, 1)),
        )
        .unwrap();
        g.set_node_kind(v, ValueKind::String).unwrap();

        let mut buf = Vec::new();
        export_json(&g, &mut buf).unwrap();
        let restored = import_json(&mut buf.as_slice(), registry(), GraphConfig::default()).unwrap();

        assert_eq!(restored.snapshot(), g.snapshot());
        assert_eq!(
            restored.current_loop(InputCoordinate::new(rect, LayerInput::Position)).unwrap(),
            Loop::new([Point2::new(0.0, 1.0), Point2::new(0.0, 2.0)]).unwrap()
        );
        assert_eq!(restored.node(v).and_then(|n| n.node_type()), Some(ValueKind::String));
    }

    #[test]
    fn test_new_ids_continue_after_restore() {
        let mut g = GraphState::new(registry(), GraphConfig::default());
        g.add_node("add").unwrap();
        let last = g.add_node("add").unwrap();
        let mut restored = GraphState::restore(g.snapshot(), registry(), GraphConfig::default()).unwrap();
        assert!(restored.add_node("add").unwrap() > last);
    }

    #[test]
    fn test_unknown_kind_fails_restore() {
        let snapshot = GraphSnapshot {
            graph_time: 0.0,
            next_node_id: 2,
            nodes: vec![NodeSnapshot {
                id: NodeId(1),
                kind: "teleporter".into(),
                node_type: None,
                inputs: Vec::new(),
                outputs: Vec::new(),
            }],
            edges: Vec::new(),
        };
        assert!(matches!(
            GraphState::restore(snapshot, registry(), GraphConfig::default()),
            Err(Error::UnknownNodeKind(_))
        ));
    }
}
