//! # Propagation
//!
//! One pass re-evaluates the part of the graph reachable from its seed
//! nodes:
//!
//! 1. **Discover**: breadth-first over shallow downstream sets.
//! 2. **Order**: topological order of the discovered subgraph. Feedback
//!    cycles are broken at the earliest-discovered node still waiting.
//! 3. **Evaluate**: walk the order, evaluating only dirty nodes. A node's
//!    downstream becomes dirty only when its outputs actually changed.
//!
//! Each node evaluates at most once per pass. A consumer already evaluated
//! earlier in the pass (the far side of a feedback edge) sees the new value
//! on the next pass.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use hashbrown::{HashMap, HashSet};

use crate::eval::EvalContext;
use crate::graph::{integrity_violation, GraphState};
use crate::integrator::IssuedRequest;
use crate::model::{longest_loop_length, Loop, NodeId};

/// What one propagation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    /// Nodes evaluated, in evaluation order.
    pub evaluated: Vec<NodeId>,
    /// Nodes whose inputs or outputs changed.
    pub changed: Vec<NodeId>,
    /// Requests issued during the pass.
    pub requests: Vec<IssuedRequest>,
}

impl PropagationReport {
    pub fn is_empty(&self) -> bool {
        self.evaluated.is_empty() && self.changed.is_empty() && self.requests.is_empty()
    }
}

struct NodeOutcome {
    inputs_changed: bool,
    outputs_changed: bool,
}

impl GraphState {
    /// Runs one pass seeded at `seeds`.
    pub(crate) fn propagate(&mut self, seeds: &[NodeId]) -> PropagationReport {
        let mut report = PropagationReport::default();
        let discovered = self.discover(seeds);
        if discovered.is_empty() {
            return report;
        }
        let order = self.evaluation_order(&discovered);

        let mut dirty: HashSet<NodeId> = seeds.iter().copied().collect();
        let mut evaluated: HashSet<NodeId> = HashSet::with_capacity(order.len());
        let limit = self.config.max_evaluations_per_pass;

        for id in order {
            if !dirty.contains(&id) {
                continue;
            }
            if evaluated.len() >= limit {
                tracing::warn!(limit, "evaluation limit reached; pass truncated");
                break;
            }
            evaluated.insert(id);
            report.evaluated.push(id);

            let Some(outcome) = self.evaluate_node(id, &mut report) else {
                continue;
            };
            if outcome.inputs_changed || outcome.outputs_changed {
                report.changed.push(id);
                self.changed_nodes.insert(id);
            }
            if !outcome.outputs_changed {
                continue;
            }
            for next in self.topology.shallow_downstream_nodes(id) {
                if evaluated.contains(&next) {
                    tracing::trace!(from = %id, to = %next, "feedback edge deferred to next pass");
                } else {
                    dirty.insert(next);
                }
            }
        }

        tracing::debug!(
            seeds = seeds.len(),
            evaluated = report.evaluated.len(),
            changed = report.changed.len(),
            requests = report.requests.len(),
            "propagation pass"
        );
        self.outbox.extend(report.requests.iter().cloned());
        report
    }

    /// Breadth-first discovery from existing seeds, in discovery order.
    fn discover(&mut self, seeds: &[NodeId]) -> Vec<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        let mut discovered = Vec::new();

        let mut roots: Vec<NodeId> = seeds.iter().copied().filter(|id| self.nodes.contains_key(id)).collect();
        roots.sort_unstable();
        for id in roots {
            if seen.insert(id) {
                queue.push_back(id);
            }
        }
        while let Some(id) = queue.pop_front() {
            discovered.push(id);
            for next in self.topology.shallow_downstream_nodes(id) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        discovered
    }

    /// Kahn's algorithm over the discovered subgraph. Ties and cycle breaks
    /// go to the earliest-discovered node, so the order is deterministic.
    fn evaluation_order(&mut self, discovered: &[NodeId]) -> Vec<NodeId> {
        let rank: HashMap<NodeId, usize> = discovered.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut waiting_on: Vec<usize> = discovered
            .iter()
            .map(|id| {
                self.topology
                    .upstream_nodes(*id)
                    .into_iter()
                    .filter(|up| up != id && rank.contains_key(up))
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = waiting_on
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut placed = vec![false; discovered.len()];
        let mut order = Vec::with_capacity(discovered.len());

        while order.len() < discovered.len() {
            let next = match ready.pop() {
                Some(Reverse(i)) if placed[i] => continue,
                Some(Reverse(i)) => i,
                None => {
                    let Some(i) = placed.iter().position(|p| !p) else {
                        break;
                    };
                    tracing::trace!(node = %discovered[i], "breaking feedback cycle");
                    i
                }
            };
            placed[next] = true;
            let id = discovered[next];
            order.push(id);

            for down in self.topology.shallow_downstream_nodes(id) {
                let Some(&j) = rank.get(&down) else {
                    continue;
                };
                if j == next || placed[j] {
                    continue;
                }
                waiting_on[j] = waiting_on[j].saturating_sub(1);
                if waiting_on[j] == 0 {
                    ready.push(Reverse(j));
                }
            }
        }
        order
    }

    /// Pulls connected inputs, evaluates, and stores outputs.
    fn evaluate_node(&mut self, id: NodeId, report: &mut PropagationReport) -> Option<NodeOutcome> {
        let (alignment, now) = (self.config.loop_alignment, self.graph_time);
        let max_lanes = self.config.max_loop_length.max(1);

        let node = self.nodes.get(&id)?;
        let mut pulls = Vec::new();
        for (index, port) in node.inputs.iter().enumerate() {
            for (field, from) in port.active_upstreams() {
                match self.nodes.get(&from.node_id).and_then(|n| n.outputs.get(from.port_index)) {
                    Some(row) => pulls.push((index, field, row.current_loop().clone())),
                    None => integrity_violation!("node {id} is connected to missing output {from}"),
                }
            }
        }

        let node = self.nodes.get_mut(&id)?;
        let mut inputs_changed = false;
        for (index, field, values) in pulls {
            inputs_changed |= node.inputs[index].set_values(field, values, alignment, now);
        }

        let inputs: Vec<Loop> = node.inputs.iter().map(|p| p.current_loop(alignment)).collect();
        let lanes = longest_loop_length(&inputs);
        if lanes > max_lanes {
            tracing::warn!(node = %id, lanes, max_lanes, "loop truncated");
        }
        let lanes = lanes.min(max_lanes);
        let inputs: Vec<Loop> = inputs.iter().map(|l| l.lengthened(lanes, alignment).truncated(lanes)).collect();

        let previous = node.output_loops();
        let ctx = EvalContext { node_id: id, time: now, alignment, previous_outputs: &previous };
        let result = node.definition.evaluator.evaluate(&inputs, &ctx);

        if result.outputs.len() != node.outputs.len() {
            integrity_violation!(
                "node {id} ({}) returned {} outputs, declared {}",
                node.definition.name,
                result.outputs.len(),
                node.outputs.len()
            );
        }
        let mut outputs_changed = false;
        let mut produced = result.outputs.into_iter();
        for row in node.outputs.iter_mut() {
            let values = produced.next().unwrap_or_else(|| Loop::single(row.kind().default_value()));
            outputs_changed |= row.set_values(values, now);
        }
        tracing::trace!(node = %id, kind = %node.definition.name, lanes, outputs_changed, "evaluated");

        for request in result.requests {
            let started_at = self.next_request_time();
            self.ledger.record(id, request.loop_index, started_at);
            tracing::debug!(node = %id, lane = request.loop_index, url = %request.request.url, "request issued");
            report.requests.push(IssuedRequest {
                node_id: id,
                loop_index: request.loop_index,
                started_at,
                request: request.request,
            });
        }

        Some(NodeOutcome { inputs_changed, outputs_changed })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::GraphConfig;
    use crate::eval::NodeRegistry;
    use crate::model::{InputCoordinate, OutputCoordinate, Value};

    fn graph() -> GraphState {
        GraphState::new(Arc::new(NodeRegistry::with_builtins()), GraphConfig::default())
    }

    fn link(g: &mut GraphState, from: NodeId, to: NodeId, port: usize) {
        g.connect(OutputCoordinate::new(from, 0), InputCoordinate::new(to, port)).unwrap();
    }

    #[test]
    fn test_chain_evaluates_in_order() {
        let mut g = graph();
        let a = g.add_node("add").unwrap();
        let b = g.add_node("add").unwrap();
        let c = g.add_node("add").unwrap();
        link(&mut g, a, b, 0);
        link(&mut g, b, c, 0);

        let report = g.set_input_values(InputCoordinate::new(a, 1), Loop::single(2.0)).unwrap();
        assert_eq!(report.evaluated, vec![a, b, c]);
        assert_eq!(g.output_loop(OutputCoordinate::new(c, 0)).unwrap(), &Loop::single(2.0));
    }

    #[test]
    fn test_diamond_evaluates_join_once_after_both_arms() {
        let mut g = graph();
        let a = g.add_node("add").unwrap();
        let b = g.add_node("add").unwrap();
        let c = g.add_node("add").unwrap();
        let d = g.add_node("add").unwrap();
        link(&mut g, a, b, 0);
        link(&mut g, a, c, 0);
        link(&mut g, b, d, 0);
        link(&mut g, c, d, 1);

        let report = g.set_input_values(InputCoordinate::new(a, 0), Loop::single(1.0)).unwrap();
        assert_eq!(report.evaluated.iter().filter(|id| **id == d).count(), 1);
        assert_eq!(report.evaluated.last(), Some(&d));
        assert_eq!(g.output_loop(OutputCoordinate::new(d, 0)).unwrap(), &Loop::single(2.0));
    }

    #[test]
    fn test_unchanged_outputs_stop_propagation() {
        let mut g = graph();
        let a = g.add_node("multiply").unwrap();
        let b = g.add_node("add").unwrap();
        link(&mut g, a, b, 0);

        // 0 * 5 is still 0, so b is not revisited.
        let report = g.set_input_values(InputCoordinate::new(a, 1), Loop::single(5.0)).unwrap();
        assert_eq!(report.evaluated, vec![a]);
        assert_eq!(report.changed, vec![a]);
    }

    #[test]
    fn test_feedback_cycle_terminates() {
        let mut g = graph();
        let a = g.add_node("add").unwrap();
        let b = g.add_node("add").unwrap();
        link(&mut g, a, b, 0);
        link(&mut g, b, a, 0);

        let report = g.set_input_values(InputCoordinate::new(a, 1), Loop::single(1.0)).unwrap();
        assert_eq!(report.evaluated, vec![a, b]);
        // a read b's previous output (0) this pass.
        assert_eq!(g.output_loop(OutputCoordinate::new(a, 0)).unwrap(), &Loop::single(1.0));
        assert_eq!(g.output_loop(OutputCoordinate::new(b, 0)).unwrap(), &Loop::single(1.0));

        let report = g.set_input_values(InputCoordinate::new(a, 1), Loop::single(2.0)).unwrap();
        assert_eq!(report.evaluated, vec![a, b]);
        assert_eq!(g.output_loop(OutputCoordinate::new(a, 0)).unwrap(), &Loop::single(3.0));
    }

    #[test]
    fn test_loops_are_aligned_and_capped() {
        let registry = Arc::new(NodeRegistry::with_builtins());
        let mut g = GraphState::new(registry, GraphConfig::default().with_max_loop_length(2));
        let a = g.add_node("add").unwrap();
        g.set_input_values(InputCoordinate::new(a, 0), Loop::new([1.0, 2.0, 3.0]).unwrap()).unwrap();
        g.set_input_values(InputCoordinate::new(a, 1), Loop::single(10.0)).unwrap();
        assert_eq!(
            g.output_loop(OutputCoordinate::new(a, 0)).unwrap(),
            &Loop::new([Value::Number(11.0), Value::Number(12.0)]).unwrap()
        );
    }
}
