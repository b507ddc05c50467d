//! The graph arena.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use hashbrown::{HashMap, HashSet};

use crate::config::GraphConfig;
use crate::eval::NodeRegistry;
use crate::graph::node::NodeState;
use crate::graph::propagation::PropagationReport;
use crate::graph::row::InputMode;
use crate::graph::topology::Topology;
use crate::integrator::{IssuedRequest, PendingRequestLedger, RequestTime};
use crate::model::{
    Edge, GraphTime, InputCoordinate, LayerInput, Loop, NodeId, OutputCoordinate, ValueKind,
};
use crate::{Error, Result};

/// Owns every node, edge and pending request of one graph.
///
/// `GraphState` is a plain value: it is `Send`, never shared implicitly, and
/// every mutation is a `&mut self` call. Wrap it in a lock to share it (see
/// the `host` module).
#[derive(Debug, Clone)]
pub struct GraphState {
    pub(crate) registry: Arc<NodeRegistry>,
    pub(crate) config: GraphConfig,
    pub(crate) nodes: HashMap<NodeId, NodeState>,
    pub(crate) topology: Topology,
    pub(crate) ledger: PendingRequestLedger,
    pub(crate) graph_time: GraphTime,
    pub(crate) next_node_id: u64,
    pub(crate) changed_nodes: HashSet<NodeId>,
    pub(crate) outbox: Vec<IssuedRequest>,
    last_issued: Option<RequestTime>,
}

impl GraphState {
    pub fn new(registry: Arc<NodeRegistry>, config: GraphConfig) -> Self {
        Self {
            registry,
            config,
            nodes: HashMap::new(),
            topology: Topology::new(),
            ledger: PendingRequestLedger::new(),
            graph_time: 0.0,
            next_node_id: 1,
            changed_nodes: HashSet::new(),
            outbox: Vec::new(),
            last_issued: None,
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Creates a node of the registered kind `kind` and evaluates it once so
    /// its outputs reflect its default inputs.
    pub fn add_node(&mut self, kind: &str) -> Result<NodeId> {
        let definition = self.registry.require(kind)?;
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(id, NodeState::new(id, definition));
        tracing::debug!(node = %id, kind, "node added");

        self.changed_nodes.insert(id);
        self.propagate(&[id]);
        Ok(id)
    }

    /// Removes a node and every edge touching it. Downstream inputs keep
    /// their last values; in-flight requests for the node are forgotten.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.nodes.remove(&id).ok_or(Error::NodeNotFound(id))?;
        for edge in self.topology.remove_node(id) {
            if edge.to.node_id == id {
                continue;
            }
            self.clear_upstream(&edge.to);
        }
        self.ledger.forget_node(id);
        self.changed_nodes.remove(&id);
        self.outbox.retain(|r| r.node_id != id);
        tracing::debug!(node = %id, "node removed");
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeState> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Changes the type of a type-changeable node, coercing its generic
    /// ports, and re-evaluates it.
    pub fn set_node_kind(&mut self, id: NodeId, kind: ValueKind) -> Result<PropagationReport> {
        let now = self.graph_time;
        let node = self.nodes.get_mut(&id).ok_or(Error::NodeNotFound(id))?;
        if !node.definition.is_type_changeable() {
            return Err(Error::NotTypeChangeable(node.definition.name.clone()));
        }
        node.set_node_type(kind, now);
        self.changed_nodes.insert(id);
        Ok(self.propagate(&[id]))
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Connects an output to an input, replacing any existing edge into that
    /// input, then re-evaluates the consumer.
    pub fn connect(&mut self, from: OutputCoordinate, to: InputCoordinate) -> Result<PropagationReport> {
        self.link(from, to)?;
        Ok(self.propagate(&[to.node_id]))
    }

    /// Records an edge without evaluating anything.
    pub(crate) fn link(&mut self, from: OutputCoordinate, to: InputCoordinate) -> Result<()> {
        let source = self.nodes.get(&from.node_id).ok_or(Error::NodeNotFound(from.node_id))?;
        if from.port_index >= source.outputs.len() {
            return Err(Error::PortNotFound(from.to_string()));
        }
        let (index, field, canonical) = self.resolve_active(&to)?;

        if let Some(old) = self.topology.connect(from, canonical) {
            tracing::debug!(input = %canonical, replaced = %old, "edge replaced");
        }
        if let Some(node) = self.nodes.get_mut(&to.node_id) {
            node.inputs[index].set_upstream(field, Some(from));
        }
        tracing::debug!(from = %from, to = %canonical, "connected");
        Ok(())
    }

    /// Removes the edge into `to`. The input keeps its last values.
    pub fn disconnect(&mut self, to: InputCoordinate) -> Result<Option<Edge>> {
        let (_, _, canonical) = self.resolve(&to)?;
        let removed = self.topology.disconnect(&canonical);
        if removed.is_some() {
            self.clear_upstream(&canonical);
        }
        Ok(removed.map(|from| Edge::new(from, canonical)))
    }

    pub fn upstream_connection(&self, to: InputCoordinate) -> Result<Option<OutputCoordinate>> {
        let (_, _, canonical) = self.resolve(&to)?;
        Ok(self.topology.upstream_of(&canonical))
    }

    /// Nodes directly fed by `id`, sorted.
    pub fn shallow_downstream_nodes(&mut self, id: NodeId) -> Vec<NodeId> {
        self.topology.shallow_downstream_nodes(id)
    }

    pub fn upstream_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.topology.upstream_nodes(id).into_iter().collect();
        ids.sort_unstable();
        ids
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.topology.edges()
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Sets an unconnected input's values (coerced to its kind) and
    /// re-evaluates the node when they changed. A field of a connected packed
    /// input, or the packed value of an input with connected fields, counts
    /// as connected.
    pub fn set_input_values(&mut self, to: InputCoordinate, values: Loop) -> Result<PropagationReport> {
        let (index, field, canonical) = self.resolve(&to)?;
        if self.topology.upstream_of(&canonical).is_some() {
            return Err(Error::InputConnected(canonical));
        }
        // Packed and field addresses share one logical value, so an edge on
        // either side drives the address being written.
        let driven = self.nodes.get(&to.node_id).and_then(|node| {
            node.inputs[index]
                .active_upstreams()
                .into_iter()
                .find(|(edge_field, _)| edge_field.is_none() || field.is_none() || *edge_field == field)
                .map(|(edge_field, _)| InputCoordinate::new(to.node_id, node.canonical_port(index, edge_field)))
        });
        if let Some(connected) = driven {
            return Err(Error::InputConnected(connected));
        }

        let (alignment, now) = (self.config.loop_alignment, self.graph_time);
        let changed = match self.nodes.get_mut(&to.node_id) {
            Some(node) => node.inputs[index].set_values(field, values, alignment, now),
            None => false,
        };
        if !changed {
            return Ok(PropagationReport::default());
        }
        self.changed_nodes.insert(to.node_id);
        let mut report = self.propagate(&[to.node_id]);
        if !report.changed.contains(&to.node_id) {
            report.changed.insert(0, to.node_id);
        }
        Ok(report)
    }

    /// The input's current loop. Unpacked fields are readable in either mode.
    pub fn current_loop(&self, at: InputCoordinate) -> Result<Loop> {
        let (index, field, _) = self.resolve(&at)?;
        self.nodes
            .get(&at.node_id)
            .and_then(|n| n.inputs[index].loop_at(field, self.config.loop_alignment))
            .ok_or_else(|| Error::PortNotFound(at.to_string()))
    }

    pub fn output_loop(&self, at: OutputCoordinate) -> Result<&Loop> {
        let node = self.nodes.get(&at.node_id).ok_or(Error::NodeNotFound(at.node_id))?;
        node.outputs
            .get(at.port_index)
            .map(|r| r.current_loop())
            .ok_or_else(|| Error::PortNotFound(at.to_string()))
    }

    /// Switches a layer input between packed and unpacked form. Edges into
    /// the deactivated representation are removed; values carry over.
    pub fn set_input_mode(&mut self, id: NodeId, layer_input: LayerInput, mode: InputMode) -> Result<()> {
        let (alignment, now) = (self.config.loop_alignment, self.graph_time);
        let node = self.nodes.get_mut(&id).ok_or(Error::NodeNotFound(id))?;
        let index = node
            .definition
            .layer_input_index(layer_input)
            .ok_or_else(|| Error::PortNotFound(format!("{id}:in{layer_input}")))?;
        if mode == InputMode::Unpacked && !layer_input.is_unpackable() {
            return Err(Error::PortNotFound(format!("{id}:in{layer_input} has no unpacked form")));
        }

        let dropped = node.inputs[index].set_mode(mode, alignment, now);
        let dropped: Vec<InputCoordinate> = dropped
            .into_iter()
            .map(|field| InputCoordinate::new(id, node.canonical_port(index, field)))
            .collect();
        for coordinate in dropped {
            if let Some(from) = self.topology.disconnect(&coordinate) {
                tracing::debug!(from = %from, to = %coordinate, "edge dropped by mode change");
            }
        }
        Ok(())
    }

    // ========================================================================
    // Clock and change feed
    // ========================================================================

    pub fn graph_time(&self) -> GraphTime {
        self.graph_time
    }

    /// Advances the graph clock. Nothing is re-evaluated until the next
    /// mutation, so pulses stamped with this time fire on that evaluation.
    pub fn set_graph_time(&mut self, time: GraphTime) {
        self.graph_time = time;
    }

    /// Ids of nodes whose observable values changed since the last call,
    /// sorted.
    pub fn take_changed_nodes(&mut self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.changed_nodes.drain().collect();
        ids.sort_unstable();
        ids
    }

    /// Requests issued since the last call, in issue order.
    pub fn take_requests(&mut self) -> Vec<IssuedRequest> {
        std::mem::take(&mut self.outbox)
    }

    pub fn ledger(&self) -> &PendingRequestLedger {
        &self.ledger
    }

    /// A request start time strictly after every earlier one, so
    /// back-to-back requests stay ordered even within one clock tick.
    pub(crate) fn next_request_time(&mut self) -> RequestTime {
        let mut now = Utc::now();
        if let Some(last) = self.last_issued {
            if now <= last {
                now = last + TimeDelta::microseconds(1);
            }
        }
        self.last_issued = Some(now);
        now
    }

    // ========================================================================
    // Addressing
    // ========================================================================

    /// Resolves `at` to `(input index, field, canonical coordinate)`.
    pub(crate) fn resolve(&self, at: &InputCoordinate) -> Result<(usize, Option<usize>, InputCoordinate)> {
        let node = self.nodes.get(&at.node_id).ok_or(Error::NodeNotFound(at.node_id))?;
        let (index, field) = node
            .resolve_port(&at.port)
            .ok_or_else(|| Error::PortNotFound(at.to_string()))?;
        Ok((index, field, InputCoordinate::new(at.node_id, node.canonical_port(index, field))))
    }

    /// Like [`resolve`](Self::resolve), and also requires the address to be
    /// part of the active representation.
    fn resolve_active(&self, at: &InputCoordinate) -> Result<(usize, Option<usize>, InputCoordinate)> {
        let resolved = self.resolve(at)?;
        let active = self
            .nodes
            .get(&at.node_id)
            .is_some_and(|n| n.inputs[resolved.0].is_active(resolved.1));
        if !active {
            return Err(Error::InactivePort(resolved.2));
        }
        Ok(resolved)
    }

    fn clear_upstream(&mut self, at: &InputCoordinate) {
        let Some(node) = self.nodes.get_mut(&at.node_id) else {
            return;
        };
        if let Some((index, field)) = node.resolve_port(&at.port) {
            node.inputs[index].set_upstream(field, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerInputKeyPath, Point2, Value};
    use pretty_assertions::assert_eq;

    fn graph() -> GraphState {
        GraphState::new(Arc::new(NodeRegistry::with_builtins()), GraphConfig::default())
    }

    #[test]
    fn test_add_node_evaluates_defaults() {
        let mut g = graph();
        let add = g.add_node("add").unwrap();
        assert_eq!(g.output_loop(OutputCoordinate::new(add, 0)).unwrap(), &Loop::single(0.0));
        assert_eq!(g.take_changed_nodes(), vec![add]);
        assert!(g.take_changed_nodes().is_empty());
    }

    #[test]
    fn test_unknown_kind_and_missing_node() {
        let mut g = graph();
        assert!(matches!(g.add_node("nope"), Err(Error::UnknownNodeKind(_))));
        assert!(matches!(g.remove_node(NodeId(99)), Err(Error::NodeNotFound(NodeId(99)))));
        assert!(matches!(
            g.current_loop(InputCoordinate::new(NodeId(99), 0)),
            Err(Error::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_bad_ports_are_errors() {
        let mut g = graph();
        let a = g.add_node("add").unwrap();
        let b = g.add_node("add").unwrap();
        assert!(matches!(
            g.connect(OutputCoordinate::new(a, 5), InputCoordinate::new(b, 0)),
            Err(Error::PortNotFound(_))
        ));
        assert!(matches!(
            g.connect(OutputCoordinate::new(a, 0), InputCoordinate::new(b, 7)),
            Err(Error::PortNotFound(_))
        ));
    }

    #[test]
    fn test_set_input_values_coerces() {
        let mut g = graph();
        let a = g.add_node("add").unwrap();
        g.set_input_values(InputCoordinate::new(a, 0), Loop::single("4")).unwrap();
        assert_eq!(g.current_loop(InputCoordinate::new(a, 0)).unwrap(), Loop::single(4.0));
        assert_eq!(g.output_loop(OutputCoordinate::new(a, 0)).unwrap(), &Loop::single(4.0));
    }

    #[test]
    fn test_connected_input_rejects_edits() {
        let mut g = graph();
        let a = g.add_node("add").unwrap();
        let b = g.add_node("add").unwrap();
        g.connect(OutputCoordinate::new(a, 0), InputCoordinate::new(b, 0)).unwrap();
        assert!(matches!(
            g.set_input_values(InputCoordinate::new(b, 0), Loop::single(1.0)),
            Err(Error::InputConnected(_))
        ));

        let removed = g.disconnect(InputCoordinate::new(b, 0)).unwrap();
        assert_eq!(removed.map(|e| e.from), Some(OutputCoordinate::new(a, 0)));
        assert!(g.set_input_values(InputCoordinate::new(b, 0), Loop::single(1.0)).is_ok());
    }

    #[test]
    fn test_remove_node_keeps_downstream_values() {
        let mut g = graph();
        let a = g.add_node("add").unwrap();
        let b = g.add_node("add").unwrap();
        g.set_input_values(InputCoordinate::new(a, 0), Loop::single(3.0)).unwrap();
        g.connect(OutputCoordinate::new(a, 0), InputCoordinate::new(b, 0)).unwrap();

        g.remove_node(a).unwrap();
        assert_eq!(g.upstream_connection(InputCoordinate::new(b, 0)).unwrap(), None);
        assert_eq!(g.current_loop(InputCoordinate::new(b, 0)).unwrap(), Loop::single(3.0));
        assert!(g.edges().is_empty());
    }

    #[test]
    fn test_index_and_key_path_address_same_input() {
        let mut g = graph();
        let rect = g.add_node("rectangle").unwrap();
        let x = g.add_node("value").unwrap();
        g.set_node_kind(x, ValueKind::Position).unwrap();
        g.connect(OutputCoordinate::new(x, 0), InputCoordinate::new(rect, 0)).unwrap();

        let by_path = InputCoordinate::new(rect, LayerInputKeyPath::packed(LayerInput::Position));
        assert_eq!(g.upstream_connection(by_path).unwrap(), Some(OutputCoordinate::new(x, 0)));
        assert_eq!(g.edges().len(), 1);
    }

    #[test]
    fn test_mode_switch_drops_edges_to_inactive_side() {
        let mut g = graph();
        let rect = g.add_node("rectangle").unwrap();
        let v = g.add_node("value").unwrap();
        let field_x = InputCoordinate::new(rect, LayerInputKeyPath::unpacked(LayerInput::Position, 0));

        assert!(matches!(
            g.connect(OutputCoordinate::new(v, 0), field_x),
            Err(Error::InactivePort(_))
        ));

        g.set_input_mode(rect, LayerInput::Position, InputMode::Unpacked).unwrap();
        g.set_input_values(InputCoordinate::new(v, 0), Loop::single(7.0)).unwrap();
        g.connect(OutputCoordinate::new(v, 0), field_x).unwrap();
        assert_eq!(
            g.current_loop(InputCoordinate::new(rect, LayerInput::Position)).unwrap(),
            Loop::single(Point2::new(7.0, 0.0))
        );

        g.set_input_mode(rect, LayerInput::Position, InputMode::Packed).unwrap();
        assert!(g.edges().is_empty());
        assert_eq!(
            g.current_loop(InputCoordinate::new(rect, LayerInput::Position)).unwrap(),
            Loop::single(Value::Position(Point2::new(7.0, 0.0)))
        );
    }

    #[test]
    fn test_set_node_kind_requires_generic_definition() {
        let mut g = graph();
        let a = g.add_node("add").unwrap();
        assert!(matches!(g.set_node_kind(a, ValueKind::Color), Err(Error::NotTypeChangeable(_))));

        let v = g.add_node("value").unwrap();
        g.set_input_values(InputCoordinate::new(v, 0), Loop::single(2.0)).unwrap();
        g.set_node_kind(v, ValueKind::Position).unwrap();
        assert_eq!(
            g.output_loop(OutputCoordinate::new(v, 0)).unwrap(),
            &Loop::single(Point2::new(2.0, 2.0))
        );
    }

    #[test]
    fn test_request_times_are_strictly_increasing() {
        let mut g = graph();
        let first = g.next_request_time();
        let second = g.next_request_time();
        assert!(second > first);
    }
}
