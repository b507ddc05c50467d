//! Loops: the ordered lanes of values a single port carries.
//!
//! A loop is never empty. When sibling inputs of one node carry loops of
//! different lengths they are aligned to the longest one before evaluation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::value::{Value, ValueKind};
use crate::{Error, Result};

/// How a shorter loop is extended to a longer sibling's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopAlignment {
    /// Repeat the final element.
    #[default]
    RepeatLast,
    /// Wrap around: lane `i` reads element `i % len`.
    Cycle,
}

/// An ordered, non-empty sequence of values. Single-lane loops (the common
/// case) are stored inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub struct Loop(SmallVec<[Value; 1]>);

impl Loop {
    /// A one-lane loop.
    pub fn single(value: impl Into<Value>) -> Self {
        let mut lanes = SmallVec::new();
        lanes.push(value.into());
        Loop(lanes)
    }

    /// Builds a loop from values. Fails on an empty sequence.
    pub fn new<I>(values: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let lanes: SmallVec<[Value; 1]> = values.into_iter().map(Into::into).collect();
        if lanes.is_empty() {
            return Err(Error::EmptyLoop);
        }
        Ok(Loop(lanes))
    }

    /// `len` copies of `value` (at least one).
    pub fn filled(value: Value, len: usize) -> Self {
        Loop(SmallVec::from_elem(value, len.max(1)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> &Value {
        // Non-empty by construction.
        &self.0[0]
    }

    pub fn last(&self) -> &Value {
        &self.0[self.0.len() - 1]
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Reads lane `index`, virtually lengthening the loop as `alignment` says.
    pub fn get_looped(&self, index: usize, alignment: LoopAlignment) -> &Value {
        match self.0.get(index) {
            Some(v) => v,
            None => match alignment {
                LoopAlignment::RepeatLast => self.last(),
                LoopAlignment::Cycle => &self.0[index % self.0.len()],
            },
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0.into_vec()
    }

    /// Kind of the first lane. All lanes of a port share the port's kind once
    /// coerced, so this is the loop's kind.
    pub fn kind(&self) -> ValueKind {
        self.first().kind()
    }

    pub fn map(&self, f: impl FnMut(&Value) -> Value) -> Loop {
        Loop(self.0.iter().map(f).collect())
    }

    /// The loop extended (never shortened) to `len` lanes.
    pub fn lengthened(&self, len: usize, alignment: LoopAlignment) -> Loop {
        if self.len() >= len {
            return self.clone();
        }
        Loop((0..len).map(|i| self.get_looped(i, alignment).clone()).collect())
    }

    /// The first `len` lanes (at least one).
    pub fn truncated(&self, len: usize) -> Loop {
        Loop(self.0.iter().take(len.max(1)).cloned().collect())
    }

    /// A copy with lane `index` replaced, growing the loop by repeating its
    /// last element when `index` is past the end.
    pub fn with_value_at(&self, index: usize, value: Value) -> Loop {
        let mut lanes = self.lengthened(index + 1, LoopAlignment::RepeatLast).0;
        lanes[index] = value;
        Loop(lanes)
    }
}

impl TryFrom<Vec<Value>> for Loop {
    type Error = Error;

    fn try_from(values: Vec<Value>) -> Result<Self> {
        Loop::new(values)
    }
}

impl From<Loop> for Vec<Value> {
    fn from(l: Loop) -> Self {
        l.into_vec()
    }
}

impl From<Value> for Loop {
    fn from(v: Value) -> Self {
        Loop::single(v)
    }
}

impl<'a> IntoIterator for &'a Loop {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Sibling alignment
// ============================================================================

/// Length of the longest loop, or 1 when there are none.
pub fn longest_loop_length(loops: &[Loop]) -> usize {
    loops.iter().map(Loop::len).max().unwrap_or(1)
}

/// Extends every loop to the longest sibling's length by repeating its final
/// element.
pub fn lengthen_arrays(loops: &[Loop]) -> Vec<Loop> {
    lengthen_arrays_with(loops, LoopAlignment::RepeatLast)
}

/// [`lengthen_arrays`] with an explicit alignment policy.
pub fn lengthen_arrays_with(loops: &[Loop], alignment: LoopAlignment) -> Vec<Loop> {
    let len = longest_loop_length(loops);
    loops.iter().map(|l| l.lengthened(len, alignment)).collect()
}

/// Transposes per-port loops into per-lane tuples: `result[i][p]` is lane `i`
/// of port `p`. Loops are aligned first.
pub fn remap_values_by_loop(loops: &[Loop]) -> Vec<Vec<Value>> {
    remap_values_by_loop_with(loops, LoopAlignment::RepeatLast)
}

/// [`remap_values_by_loop`] with an explicit alignment policy.
pub fn remap_values_by_loop_with(loops: &[Loop], alignment: LoopAlignment) -> Vec<Vec<Value>> {
    if loops.is_empty() {
        return Vec::new();
    }
    let len = longest_loop_length(loops);
    (0..len)
        .map(|i| loops.iter().map(|l| l.get_looped(i, alignment).clone()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Loop {
        Loop::new(values.iter().copied()).unwrap()
    }

    #[test]
    fn test_empty_loop_rejected() {
        assert!(matches!(Loop::new(Vec::<Value>::new()), Err(Error::EmptyLoop)));
        let parsed: std::result::Result<Loop, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_lengthen_repeats_last() {
        let out = lengthen_arrays(&[nums(&[1.0, 2.0, 3.0]), nums(&[10.0])]);
        assert_eq!(out[0], nums(&[1.0, 2.0, 3.0]));
        assert_eq!(out[1], nums(&[10.0, 10.0, 10.0]));
    }

    #[test]
    fn test_lengthen_is_idempotent() {
        let loops = [nums(&[1.0, 2.0]), nums(&[5.0, 6.0, 7.0, 8.0]), nums(&[9.0])];
        let once = lengthen_arrays(&loops);
        assert_eq!(lengthen_arrays(&once), once);
    }

    #[test]
    fn test_cycle_alignment() {
        let out = lengthen_arrays_with(&[nums(&[1.0, 2.0]), nums(&[0.0; 5])], LoopAlignment::Cycle);
        assert_eq!(out[0], nums(&[1.0, 2.0, 1.0, 2.0, 1.0]));
    }

    #[test]
    fn test_remap_transposes() {
        let rows = remap_values_by_loop(&[nums(&[1.0, 2.0]), nums(&[10.0])]);
        assert_eq!(
            rows,
            vec![
                vec![Value::Number(1.0), Value::Number(10.0)],
                vec![Value::Number(2.0), Value::Number(10.0)],
            ]
        );
        assert!(remap_values_by_loop(&[]).is_empty());
    }

    #[test]
    fn test_with_value_at_grows() {
        let l = nums(&[1.0]).with_value_at(2, Value::Number(5.0));
        assert_eq!(l, nums(&[1.0, 1.0, 5.0]));
        let l = l.with_value_at(0, Value::Number(0.0));
        assert_eq!(l, nums(&[0.0, 1.0, 5.0]));
    }
}
