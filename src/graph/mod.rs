//! # Graph
//!
//! The [`GraphState`] arena owns every node, the edge [`Topology`], the
//! pending request ledger and the graph clock. Mutations go through it and
//! return a [`PropagationReport`] describing what was re-evaluated.

mod node;
mod propagation;
mod row;
mod state;
mod topology;

pub use node::NodeState;
pub use propagation::PropagationReport;
pub use row::{InputMode, InputPort, RowObserver};
pub use state::GraphState;
pub use topology::Topology;

/// Reports a broken internal invariant: logged in every build, fatal in
/// debug builds, skipped in release.
macro_rules! integrity_violation {
    ($($arg:tt)*) => {{
        tracing::error!($($arg)*);
        debug_assert!(false, $($arg)*);
    }};
}

pub(crate) use integrity_violation;
