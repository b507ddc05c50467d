//! Edge store.
//!
//! Each input has at most one upstream output, so edges are keyed by their
//! input coordinate. Downstream node sets are computed on demand and cached
//! per source node; any edge change touching a node invalidates its entry.

use hashbrown::{HashMap, HashSet};

use crate::model::{Edge, InputCoordinate, NodeId, OutputCoordinate};

#[derive(Debug, Clone, Default)]
pub struct Topology {
    incoming: HashMap<InputCoordinate, OutputCoordinate>,
    downstream_cache: HashMap<NodeId, HashSet<NodeId>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects `from` into `to`, returning the output it replaced.
    pub fn connect(&mut self, from: OutputCoordinate, to: InputCoordinate) -> Option<OutputCoordinate> {
        let replaced = self.incoming.insert(to, from);
        self.downstream_cache.remove(&from.node_id);
        if let Some(old) = replaced {
            self.downstream_cache.remove(&old.node_id);
        }
        replaced
    }

    pub fn disconnect(&mut self, to: &InputCoordinate) -> Option<OutputCoordinate> {
        let removed = self.incoming.remove(to);
        if let Some(old) = removed {
            self.downstream_cache.remove(&old.node_id);
        }
        removed
    }

    pub fn upstream_of(&self, to: &InputCoordinate) -> Option<OutputCoordinate> {
        self.incoming.get(to).copied()
    }

    /// Nodes directly fed by `node`, sorted by id.
    pub fn shallow_downstream_nodes(&mut self, node: NodeId) -> Vec<NodeId> {
        let incoming = &self.incoming;
        let set = self.downstream_cache.entry(node).or_insert_with(|| {
            incoming
                .iter()
                .filter(|(_, from)| from.node_id == node)
                .map(|(to, _)| to.node_id)
                .collect()
        });
        let mut nodes: Vec<NodeId> = set.iter().copied().collect();
        nodes.sort_unstable();
        nodes
    }

    /// Nodes directly feeding `node`.
    pub fn upstream_nodes(&self, node: NodeId) -> HashSet<NodeId> {
        self.incoming
            .iter()
            .filter(|(to, _)| to.node_id == node)
            .map(|(_, from)| from.node_id)
            .collect()
    }

    /// Removes every edge touching `node` and returns them.
    pub fn remove_node(&mut self, node: NodeId) -> Vec<Edge> {
        let mut removed = Vec::new();
        self.incoming.retain(|to, from| {
            let touches = to.node_id == node || from.node_id == node;
            if touches {
                removed.push(Edge::new(*from, *to));
            }
            !touches
        });
        self.downstream_cache.remove(&node);
        for edge in &removed {
            self.downstream_cache.remove(&edge.from.node_id);
        }
        removed
    }

    /// Edges ending at `node`.
    pub fn edges_into(&self, node: NodeId) -> Vec<Edge> {
        self.incoming
            .iter()
            .filter(|(to, _)| to.node_id == node)
            .map(|(to, from)| Edge::new(*from, *to))
            .collect()
    }

    /// Every edge, ordered by source then target node.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self.incoming.iter().map(|(to, from)| Edge::new(*from, *to)).collect();
        edges.sort_by(|a, b| {
            (a.from, a.to.node_id, a.to.port.to_string()).cmp(&(b.from, b.to.node_id, b.to.port.to_string()))
        });
        edges
    }

    pub fn len(&self) -> usize {
        self.incoming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(node: u64, port: usize) -> OutputCoordinate {
        OutputCoordinate::new(NodeId(node), port)
    }

    fn input(node: u64, port: usize) -> InputCoordinate {
        InputCoordinate::new(NodeId(node), port)
    }

    #[test]
    fn test_single_writer_per_input() {
        let mut topology = Topology::new();
        assert_eq!(topology.connect(out(1, 0), input(3, 0)), None);
        assert_eq!(topology.connect(out(2, 0), input(3, 0)), Some(out(1, 0)));
        assert_eq!(topology.len(), 1);
        assert_eq!(topology.upstream_of(&input(3, 0)), Some(out(2, 0)));
    }

    #[test]
    fn test_downstream_cache_invalidation() {
        let mut topology = Topology::new();
        topology.connect(out(1, 0), input(2, 0));
        assert_eq!(topology.shallow_downstream_nodes(NodeId(1)), vec![NodeId(2)]);

        topology.connect(out(1, 0), input(3, 1));
        assert_eq!(topology.shallow_downstream_nodes(NodeId(1)), vec![NodeId(2), NodeId(3)]);

        // Rewiring 2's input away from 1 must drop 2 from 1's cached set.
        topology.connect(out(4, 0), input(2, 0));
        assert_eq!(topology.shallow_downstream_nodes(NodeId(1)), vec![NodeId(3)]);
        assert_eq!(topology.shallow_downstream_nodes(NodeId(4)), vec![NodeId(2)]);

        topology.disconnect(&input(3, 1));
        assert!(topology.shallow_downstream_nodes(NodeId(1)).is_empty());
    }

    #[test]
    fn test_remove_node_drops_both_directions() {
        let mut topology = Topology::new();
        topology.connect(out(1, 0), input(2, 0));
        topology.connect(out(2, 0), input(3, 0));
        topology.connect(out(1, 0), input(3, 1));

        let removed = topology.remove_node(NodeId(2));
        assert_eq!(removed.len(), 2);
        assert_eq!(topology.shallow_downstream_nodes(NodeId(1)), vec![NodeId(3)]);
        assert_eq!(topology.upstream_nodes(NodeId(3)).len(), 1);
    }
}
