//! Tokio host for a graph.
//!
//! [`GraphHost`] owns a [`GraphState`] behind a lock and connects it to the
//! outside world:
//!
//! - requests issued by evaluation are fetched on spawned tasks through a
//!   [`ResourceFetcher`]
//! - finished fetches land in a completion inbox and are applied one at a
//!   time, in arrival order
//! - ids of changed nodes are broadcast after every mutation
//!
//! ## Limitations
//!
//! - **Runtime required**: `GraphHost::new` captures the current Tokio
//!   runtime handle and panics outside one.
//! - **No cancellation**: superseded requests still run; their completions
//!   are discarded as stale when they arrive.
//! - **Panicking fetchers** surface as a transport error on the node, like
//!   any other failed request.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::graph::GraphState;
use crate::integrator::{AsyncError, Completion, CompletionOutcome, IssuedRequest, Resource, ResourceRequest};
use crate::model::NodeId;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Carries out resource requests. Implemented by the network and media
/// collaborators.
#[async_trait]
pub trait ResourceFetcher: Send + Sync + 'static {
    async fn fetch(&self, request: ResourceRequest) -> Result<Resource, AsyncError>;
}

// ============================================================================
// GraphHost
// ============================================================================

/// Shared handle to a hosted graph. Clones refer to the same graph.
#[derive(Clone)]
pub struct GraphHost {
    inner: Arc<HostInner>,
}

struct HostInner {
    graph: RwLock<GraphState>,
    fetcher: Arc<dyn ResourceFetcher>,
    runtime: Handle,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: Mutex<mpsc::UnboundedReceiver<Completion>>,
    in_flight: AtomicUsize,
    changes: broadcast::Sender<Vec<NodeId>>,
}

impl GraphHost {
    /// Hosts `graph`. Requests already queued on it are dispatched on the
    /// next mutation.
    pub fn new(graph: GraphState, fetcher: impl ResourceFetcher) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(HostInner {
                graph: RwLock::new(graph),
                fetcher: Arc::new(fetcher),
                runtime: Handle::current(),
                completions_tx,
                completions_rx: Mutex::new(completions_rx),
                in_flight: AtomicUsize::new(0),
                changes,
            }),
        }
    }

    /// Runs `f` against a shared borrow of the graph.
    pub fn read<R>(&self, f: impl FnOnce(&GraphState) -> R) -> R {
        f(&self.inner.graph.read())
    }

    /// Runs `f` with exclusive access, then dispatches the requests it
    /// issued and broadcasts the nodes it changed.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut GraphState) -> R) -> R {
        let (result, requests, changed) = {
            let mut graph = self.inner.graph.write();
            let result = f(&mut graph);
            (result, graph.take_requests(), graph.take_changed_nodes())
        };
        for request in requests {
            self.dispatch(request);
        }
        if !changed.is_empty() {
            // No subscribers is fine.
            let _ = self.inner.changes.send(changed);
        }
        result
    }

    /// Stream of changed node ids, one batch per mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<NodeId>> {
        self.inner.changes.subscribe()
    }

    /// Requests dispatched whose completions have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    fn dispatch(&self, issued: IssuedRequest) {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        let fetcher = Arc::clone(&self.inner.fetcher);
        let inbox = self.inner.completions_tx.clone();
        tracing::debug!(node = %issued.node_id, lane = issued.loop_index, url = %issued.request.url, "dispatching request");

        let runtime = self.inner.runtime.clone();
        self.inner.runtime.spawn(async move {
            let request = issued.request.clone();
            // A panicking or aborted fetch still yields a completion, so the
            // node leaves its loading state and the in-flight count drains.
            let result = match runtime.spawn(async move { fetcher.fetch(request).await }).await {
                Ok(result) => result,
                Err(join_error) => {
                    tracing::warn!(node = %issued.node_id, lane = issued.loop_index, %join_error, "fetch task failed");
                    Err(AsyncError::Transport(format!("fetch task failed: {join_error}")))
                }
            };
            if inbox.send(issued.complete(result)).is_err() {
                tracing::debug!(node = %issued.node_id, "host dropped before completion arrived");
            }
        });
    }

    fn apply(&self, completion: Completion) -> CompletionOutcome {
        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.mutate(|graph| graph.complete(completion))
    }

    /// Applies every completion already waiting in the inbox without
    /// blocking. Returns how many were applied.
    pub fn pump(&self) -> usize {
        let mut ready = Vec::new();
        if let Ok(mut inbox) = self.inner.completions_rx.try_lock() {
            while let Ok(completion) = inbox.try_recv() {
                ready.push(completion);
            }
        }
        let count = ready.len();
        for completion in ready {
            self.apply(completion);
        }
        count
    }

    /// Waits for the next completion and applies it.
    pub async fn next_completion(&self) -> Option<CompletionOutcome> {
        let completion = {
            let mut inbox = self.inner.completions_rx.lock().await;
            inbox.recv().await
        }?;
        Some(self.apply(completion))
    }

    /// Applies completions until nothing is in flight, returning each
    /// outcome in arrival order.
    pub async fn run_until_idle(&self) -> Vec<CompletionOutcome> {
        let mut outcomes = Vec::new();
        while self.in_flight() > 0 {
            match self.next_completion().await {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        outcomes
    }
}
