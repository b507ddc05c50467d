//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::model::LoopAlignment;
use crate::Result;

/// Tunables for a [`GraphState`](crate::GraphState).
///
/// All fields have defaults, so a partial JSON document is a valid config:
///
/// ```rust
/// let config = stitch_core::GraphConfig::from_json(r#"{ "loopAlignment": "cycle" }"#).unwrap();
/// assert_eq!(config.max_loop_length, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// How shorter input loops are extended before evaluation.
    pub loop_alignment: LoopAlignment,
    /// Lanes beyond this count are dropped before evaluation.
    pub max_loop_length: usize,
    /// Upper bound on node evaluations in one propagation pass.
    pub max_evaluations_per_pass: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            loop_alignment: LoopAlignment::RepeatLast,
            max_loop_length: 10_000,
            max_evaluations_per_pass: 100_000,
        }
    }
}

impl GraphConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_loop_alignment(mut self, alignment: LoopAlignment) -> Self {
        self.loop_alignment = alignment;
        self
    }

    pub fn with_max_loop_length(mut self, len: usize) -> Self {
        self.max_loop_length = len.max(1);
        self
    }
}
