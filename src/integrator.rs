//! # Async Result Integration
//!
//! Network and media requests leave the engine as [`IssuedRequest`]s and come
//! back as [`Completion`]s. A completion is accepted only when no later
//! request for the same node and lane has already been accepted, so the most
//! recently *started* request wins regardless of arrival order.
//!
//! ```text
//! evaluate ──► IssuedRequest { node, lane, started_at } ──► fetcher
//!                                                             │
//! propagate ◄── write outputs ◄── ledger.accepts? ◄── Completion
//! ```

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::coercion::coerce;
use crate::graph::{integrity_violation, GraphState, PropagationReport};
use crate::model::categorical::NetworkRequestType;
use crate::model::{MediaObject, NodeId, Value};

/// Wall-clock instant a request was issued.
pub type RequestTime = DateTime<Utc>;

// ============================================================================
// Requests and resources
// ============================================================================

/// What a request expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Json,
    Image,
    Text,
}

/// A request produced by an evaluator, to be carried out by a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub url: String,
    pub method: NetworkRequestType,
    pub body: Option<serde_json::Value>,
    pub expects: ResourceKind,
}

impl ResourceRequest {
    pub fn get(url: impl Into<String>, expects: ResourceKind) -> Self {
        Self { url: url.into(), method: NetworkRequestType::Get, body: None, expects }
    }
}

/// A request the engine has issued and is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedRequest {
    pub node_id: NodeId,
    pub loop_index: usize,
    pub started_at: RequestTime,
    pub request: ResourceRequest,
}

impl IssuedRequest {
    /// Pairs this request with its outcome. Decoded media is identified by
    /// the request's start time and named after the URL's file name.
    pub fn complete(&self, result: Result<Resource, AsyncError>) -> Completion {
        let result = result.map(|resource| match resource {
            Resource::Image(mut media) => {
                media.id = u64::try_from(self.started_at.timestamp_micros()).unwrap_or_default();
                if let Some(name) = url_file_name(&self.request.url) {
                    media.name = name.to_string();
                }
                Resource::Image(media)
            }
            other => other,
        });
        Completion {
            node_id: self.node_id,
            loop_index: self.loop_index,
            started_at: self.started_at,
            result,
        }
    }
}

/// Last non-empty path segment of `url`, ignoring query and fragment.
fn url_file_name(url: &str) -> Option<&str> {
    let url = url.split(['?', '#']).next().unwrap_or_default();
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let (_, path) = rest.split_once('/')?;
    path.rsplit('/').find(|segment| !segment.is_empty())
}

/// A fetched resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Json(serde_json::Value),
    Text(String),
    Image(MediaObject),
}

impl Resource {
    /// Interprets a raw response body by status and content type.
    pub fn from_response(
        status: u16,
        content_type: &str,
        body: Bytes,
        expects: ResourceKind,
    ) -> Result<Self, AsyncError> {
        if status >= 300 {
            return Err(AsyncError::BadStatus(status));
        }
        if body.is_empty() {
            return Err(AsyncError::NoData);
        }
        let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

        match expects {
            ResourceKind::Image if mime.starts_with("image/") => {
                let name = format!("image.{}", mime.trim_start_matches("image/"));
                Ok(Resource::Image(MediaObject::new(0, name, mime, body)))
            }
            ResourceKind::Json | ResourceKind::Text if mime.ends_with("json") => {
                serde_json::from_slice(&body)
                    .map(Resource::Json)
                    .map_err(|e| AsyncError::Decode(e.to_string()))
            }
            ResourceKind::Json | ResourceKind::Text if mime.starts_with("text/") => {
                String::from_utf8(body.to_vec())
                    .map(Resource::Text)
                    .map_err(|e| AsyncError::Decode(e.to_string()))
            }
            _ => Err(AsyncError::UnsupportedContentType(mime)),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Resource::Json(json) => Value::Json(json),
            Resource::Text(text) => Value::String(text),
            Resource::Image(media) => Value::AsyncMedia(Some(media)),
        }
    }
}

/// Why a request produced no resource. Carried as data into the node's
/// `errored` and `error` outputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AsyncError {
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Request failed with status {0}")]
    BadStatus(u16),

    #[error("Response contained no data")]
    NoData,

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// The outcome of one issued request.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub node_id: NodeId,
    pub loop_index: usize,
    pub started_at: RequestTime,
    pub result: Result<Resource, AsyncError>,
}

/// What [`GraphState::complete`] did with a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// Written to the node's outputs and propagated downstream.
    Applied(PropagationReport),
    /// Superseded by a later request that was already accepted.
    Stale,
    /// The node no longer exists or has no async outputs.
    Dropped,
}

// ============================================================================
// Ledger
// ============================================================================

type LaneKey = (NodeId, usize);

/// In-flight and accepted request start times per `(node, lane)`.
#[derive(Debug, Clone, Default)]
pub struct PendingRequestLedger {
    in_flight: HashMap<LaneKey, Vec<RequestTime>>,
    accepted: HashMap<LaneKey, RequestTime>,
}

impl PendingRequestLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node_id: NodeId, loop_index: usize, started_at: RequestTime) {
        self.in_flight.entry((node_id, loop_index)).or_default().push(started_at);
    }

    /// Number of requests issued for the lane and not yet completed.
    pub fn pending(&self, node_id: NodeId, loop_index: usize) -> usize {
        self.in_flight.get(&(node_id, loop_index)).map_or(0, Vec::len)
    }

    /// Whether a request for the lane started after `started_at` is still
    /// in flight.
    pub fn has_newer_pending(&self, node_id: NodeId, loop_index: usize, started_at: RequestTime) -> bool {
        self.in_flight
            .get(&(node_id, loop_index))
            .is_some_and(|starts| starts.iter().any(|t| *t > started_at))
    }

    pub fn total_pending(&self) -> usize {
        self.in_flight.values().map(Vec::len).sum()
    }

    pub fn last_accepted(&self, node_id: NodeId, loop_index: usize) -> Option<RequestTime> {
        self.accepted.get(&(node_id, loop_index)).copied()
    }

    /// Whether a completion started at `started_at` may be applied.
    pub fn accepts(&self, node_id: NodeId, loop_index: usize, started_at: RequestTime) -> bool {
        self.last_accepted(node_id, loop_index)
            .is_none_or(|last| started_at >= last)
    }

    /// Resolves the in-flight entry and, when accepted, records the start
    /// time as the lane's newest accepted request.
    pub fn settle(&mut self, node_id: NodeId, loop_index: usize, started_at: RequestTime) -> bool {
        let key = (node_id, loop_index);
        if let Some(starts) = self.in_flight.get_mut(&key) {
            starts.retain(|t| *t != started_at);
            if starts.is_empty() {
                self.in_flight.remove(&key);
            }
        }
        if !self.accepts(node_id, loop_index, started_at) {
            return false;
        }
        self.accepted.insert(key, started_at);
        true
    }

    pub fn forget_node(&mut self, node_id: NodeId) {
        self.in_flight.retain(|(id, _), _| *id != node_id);
        self.accepted.retain(|(id, _), _| *id != node_id);
    }
}

// ============================================================================
// Completion
// ============================================================================

impl GraphState {
    /// Applies an async completion.
    ///
    /// Success writes the resource, coerced to the result output's kind, at
    /// the request's lane and clears the lane's error state. Failure sets `errored` and the
    /// message. Either way `loading` drops to false unless a newer request
    /// for the lane is still in flight, and the node's downstream dependents
    /// are re-evaluated.
    pub fn complete(&mut self, completion: Completion) -> CompletionOutcome {
        let Completion { node_id, loop_index, started_at, result } = completion;

        let Some(ports) = self.nodes.get(&node_id).map(|n| n.definition.async_ports) else {
            tracing::debug!(node = %node_id, "completion for removed node dropped");
            return CompletionOutcome::Dropped;
        };
        let Some(ports) = ports else {
            tracing::warn!(node = %node_id, "completion for node without async outputs dropped");
            return CompletionOutcome::Dropped;
        };

        if !self.ledger.settle(node_id, loop_index, started_at) {
            tracing::debug!(node = %node_id, lane = loop_index, %started_at, "stale completion discarded");
            return CompletionOutcome::Stale;
        }

        let loading = Value::Bool(self.ledger.has_newer_pending(node_id, loop_index, started_at));
        let writes = match result {
            Ok(resource) => vec![
                (ports.result, resource.into_value()),
                (ports.loading, loading),
                (ports.errored, Value::Bool(false)),
                (ports.error, Value::String(String::new())),
            ],
            Err(error) => {
                tracing::debug!(node = %node_id, lane = loop_index, %error, "async request failed");
                vec![
                    (ports.loading, loading),
                    (ports.errored, Value::Bool(true)),
                    (ports.error, Value::String(error.to_string())),
                ]
            }
        };

        let now = self.graph_time;
        let mut changed = false;
        if let Some(node) = self.nodes.get_mut(&node_id) {
            for (port, value) in writes {
                match node.outputs.get_mut(port) {
                    Some(row) => {
                        let value = coerce(&value, row.kind(), now);
                        let values = row.current_loop().with_value_at(loop_index, value);
                        changed |= row.set_values(values, now);
                    }
                    None => integrity_violation!("async port {port} missing on node {node_id}"),
                }
            }
        }

        let mut report = if changed {
            let downstream = self.topology.shallow_downstream_nodes(node_id);
            self.propagate(&downstream)
        } else {
            PropagationReport::default()
        };
        if changed {
            report.changed.insert(0, node_id);
            self.changed_nodes.insert(node_id);
        }
        CompletionOutcome::Applied(report)
    }
}
