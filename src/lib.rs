//! # stitch-core: Typed Dataflow Engine for the Stitch Node-Graph Editor
//!
//! Every node port carries a [`Loop`] of [`Value`]s of one declared
//! [`ValueKind`]. Edges connect outputs to inputs; changing a value re-evaluates
//! exactly the nodes that depend on it, including values that arrive later
//! from network or media collaborators.
//!
//! ## Design Principles
//!
//! 1. **Closed value model**: `Value` is one exhaustive enum; `coerce` is total
//! 2. **Arena, not pointers**: nodes live in `GraphState`, addressed by `NodeId`
//! 3. **Explicit context**: every mutation goes through a `GraphState` you own
//! 4. **Evaluation is pure**: evaluators return outputs plus requested effects
//! 5. **Last request wins**: async completions are filtered by request start time
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stitch_core::{GraphConfig, GraphState, InputCoordinate, Loop, NodeRegistry, OutputCoordinate, Value};
//!
//! # fn example() -> stitch_core::Result<()> {
//! let mut graph = GraphState::new(Arc::new(NodeRegistry::with_builtins()), GraphConfig::default());
//! let a = graph.add_node("add")?;
//! let b = graph.add_node("multiply")?;
//! graph.connect(OutputCoordinate::new(a, 0), InputCoordinate::new(b, 0))?;
//!
//! graph.set_input_values(InputCoordinate::new(a, 0), Loop::single(2.0))?;
//! graph.set_input_values(InputCoordinate::new(b, 1), Loop::single(10.0))?;
//! assert_eq!(graph.output_loop(OutputCoordinate::new(b, 0))?.first(), &Value::Number(20.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | `model` | values, kinds, loops, coordinates, layer inputs |
//! | `coercion` | total value conversion |
//! | `graph` | rows, topology, propagation, the `GraphState` arena |
//! | `eval` | evaluation contract, node registry, built-in catalog |
//! | `integrator` | async completions and the pending request ledger |
//! | `projection` | serde snapshot for the persistence collaborator |
//! | `host` | tokio host: task fan-out, completion inbox, change stream |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod coercion;
pub mod config;
pub mod graph;
pub mod eval;
pub mod integrator;
pub mod projection;
#[cfg(feature = "runtime")]
pub mod host;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Edge, GraphTime, InputCoordinate, LayerInput, LayerInputKeyPath, Loop, LoopAlignment, NodeId,
    OutputCoordinate, PortId, Value, ValueKind,
};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use coercion::{coerce, coerce_loop, is_truthy};
pub use config::GraphConfig;
pub use eval::{EvalContext, EvalResult, NodeDefinition, NodeEvaluator, NodeRegistry};
pub use graph::{GraphState, InputMode, PropagationReport};
pub use integrator::{AsyncError, Completion, CompletionOutcome, Resource, ResourceRequest};

// ============================================================================
// Error Types
// ============================================================================

/// Errors returned by the public graph API.
///
/// Coercion and evaluation never fail; async failures are data
/// ([`AsyncError`]) that flow into node outputs. What remains are invalid
/// addresses and structural misuse supplied by the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Unknown node kind: {0}")]
    UnknownNodeKind(String),

    #[error("Input {0} is fed by an edge; disconnect it before editing")]
    InputConnected(InputCoordinate),

    #[error("Input {0} addresses an inactive packed/unpacked representation")]
    InactivePort(InputCoordinate),

    #[error("Node kind '{0}' has a fixed type")]
    NotTypeChangeable(String),

    #[error("Loops must contain at least one value")]
    EmptyLoop,

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
