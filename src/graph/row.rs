//! Port rows.
//!
//! A [`RowObserver`] holds the current loop of one port plus its upstream
//! connection. An [`InputPort`] wraps either one packed row or one row per
//! unpacked field; exactly one representation is active, and the logical
//! value of the port is always derivable from it.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::coercion::coerce_loop;
use crate::model::{
    longest_loop_length, GraphTime, LayerInput, Loop, LoopAlignment, OutputCoordinate, Value,
    ValueKind,
};

// ============================================================================
// RowObserver
// ============================================================================

/// Current values and connection of one port.
#[derive(Debug, Clone, PartialEq)]
pub struct RowObserver {
    kind: ValueKind,
    values: Loop,
    upstream: Option<OutputCoordinate>,
}

impl RowObserver {
    pub fn new(kind: ValueKind, initial: &Value) -> Self {
        Self {
            kind,
            values: coerce_loop(&Loop::single(initial.clone()), kind, 0.0),
            upstream: None,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn current_loop(&self) -> &Loop {
        &self.values
    }

    pub fn upstream(&self) -> Option<OutputCoordinate> {
        self.upstream
    }

    pub(crate) fn set_upstream(&mut self, upstream: Option<OutputCoordinate>) {
        self.upstream = upstream;
    }

    /// Stores `values` coerced to the row's kind. Returns whether the stored
    /// loop changed.
    pub(crate) fn set_values(&mut self, values: Loop, now: GraphTime) -> bool {
        let values = coerce_loop(&values, self.kind, now);
        if values == self.values {
            return false;
        }
        self.values = values;
        true
    }

    /// Retypes the row, coercing its values.
    pub(crate) fn change_kind(&mut self, kind: ValueKind, now: GraphTime) {
        if kind != self.kind {
            self.kind = kind;
            self.values = coerce_loop(&self.values, kind, now);
        }
    }
}

// ============================================================================
// InputPort
// ============================================================================

/// Which representation of a layer input is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputMode {
    #[default]
    Packed,
    Unpacked,
}

#[derive(Debug, Clone, PartialEq)]
enum PortRows {
    Packed(RowObserver),
    Unpacked(SmallVec<[RowObserver; 4]>),
}

/// An input port: a packed row, or one row per unpacked field.
///
/// `field` arguments address the representation: `None` is the packed value,
/// `Some(i)` is field `i`. Reads work in either mode; connections and
/// upstream lookups apply only to the active representation.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPort {
    layer_input: Option<LayerInput>,
    rows: PortRows,
}

impl InputPort {
    pub(crate) fn new(kind: ValueKind, default: &Value, layer_input: Option<LayerInput>) -> Self {
        Self {
            layer_input,
            rows: PortRows::Packed(RowObserver::new(kind, default)),
        }
    }

    pub fn layer_input(&self) -> Option<LayerInput> {
        self.layer_input
    }

    pub fn mode(&self) -> InputMode {
        match self.rows {
            PortRows::Packed(_) => InputMode::Packed,
            PortRows::Unpacked(_) => InputMode::Unpacked,
        }
    }

    /// Declared kind of the packed value.
    pub fn kind(&self) -> ValueKind {
        match (&self.rows, self.layer_input) {
            (PortRows::Packed(row), _) => row.kind(),
            (PortRows::Unpacked(_), Some(input)) => input.value_kind(),
            (PortRows::Unpacked(fields), None) => fields.first().map_or(ValueKind::None, RowObserver::kind),
        }
    }

    /// Number of unpacked fields this port supports.
    pub fn field_count(&self) -> usize {
        self.layer_input.map_or(0, |i| i.unpacked_kinds().len())
    }

    pub fn is_active(&self, field: Option<usize>) -> bool {
        match (&self.rows, field) {
            (PortRows::Packed(_), None) => true,
            (PortRows::Unpacked(fields), Some(i)) => i < fields.len(),
            _ => false,
        }
    }

    pub fn is_addressable(&self, field: Option<usize>) -> bool {
        field.is_none_or(|i| i < self.field_count())
    }

    /// The logical packed loop, assembled from fields when unpacked.
    pub fn current_loop(&self, alignment: LoopAlignment) -> Loop {
        match &self.rows {
            PortRows::Packed(row) => row.current_loop().clone(),
            PortRows::Unpacked(fields) => match self.layer_input {
                Some(input) => pack_fields(input, fields, alignment),
                None => fields.first().map_or_else(|| Loop::single(Value::None), |r| r.current_loop().clone()),
            },
        }
    }

    /// The loop at `field`, derived from the packed value when packed.
    pub fn loop_at(&self, field: Option<usize>, alignment: LoopAlignment) -> Option<Loop> {
        let Some(index) = field else {
            return Some(self.current_loop(alignment));
        };
        match (&self.rows, self.layer_input) {
            (PortRows::Unpacked(fields), _) => fields.get(index).map(|r| r.current_loop().clone()),
            (PortRows::Packed(row), Some(input)) => split_loop(input, row.current_loop()).into_iter().nth(index),
            (PortRows::Packed(_), None) => None,
        }
    }

    /// Row of the active representation at `field`.
    pub fn row(&self, field: Option<usize>) -> Option<&RowObserver> {
        match (&self.rows, field) {
            (PortRows::Packed(row), None) => Some(row),
            (PortRows::Unpacked(fields), Some(i)) => fields.get(i),
            _ => None,
        }
    }

    fn row_mut(&mut self, field: Option<usize>) -> Option<&mut RowObserver> {
        match (&mut self.rows, field) {
            (PortRows::Packed(row), None) => Some(row),
            (PortRows::Unpacked(fields), Some(i)) => fields.get_mut(i),
            _ => None,
        }
    }

    pub fn upstream(&self, field: Option<usize>) -> Option<OutputCoordinate> {
        self.row(field).and_then(RowObserver::upstream)
    }

    /// Every connection of the active representation.
    pub fn active_upstreams(&self) -> SmallVec<[(Option<usize>, OutputCoordinate); 1]> {
        match &self.rows {
            PortRows::Packed(row) => row.upstream().map(|up| (None, up)).into_iter().collect(),
            PortRows::Unpacked(fields) => fields
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.upstream().map(|up| (Some(i), up)))
                .collect(),
        }
    }

    /// Returns false when `field` is not part of the active representation.
    pub(crate) fn set_upstream(&mut self, field: Option<usize>, upstream: Option<OutputCoordinate>) -> bool {
        match self.row_mut(field) {
            Some(row) => {
                row.set_upstream(upstream);
                true
            }
            None => false,
        }
    }

    /// Writes `values` at `field`. Writing the packed value of an unpacked
    /// port splits it across fields; writing a field of a packed port merges
    /// it into the packed lanes. Returns whether anything changed.
    pub(crate) fn set_values(
        &mut self,
        field: Option<usize>,
        values: Loop,
        alignment: LoopAlignment,
        now: GraphTime,
    ) -> bool {
        let layer_input = self.layer_input;
        match (&mut self.rows, field, layer_input) {
            (PortRows::Packed(row), None, _) => row.set_values(values, now),
            (PortRows::Unpacked(fields), Some(i), _) => fields
                .get_mut(i)
                .is_some_and(|row| row.set_values(values, now)),
            (PortRows::Unpacked(fields), None, Some(input)) => {
                let mut changed = false;
                for (row, part) in fields.iter_mut().zip(split_loop(input, &values)) {
                    changed |= row.set_values(part, now);
                }
                changed
            }
            (PortRows::Packed(row), Some(i), Some(input)) => {
                let merged = merge_field(input, row.current_loop(), i, &values, alignment);
                row.set_values(merged, now)
            }
            _ => false,
        }
    }

    /// Switches representation, carrying the logical value across. Returns
    /// the addresses whose connections were dropped.
    pub(crate) fn set_mode(
        &mut self,
        mode: InputMode,
        alignment: LoopAlignment,
        now: GraphTime,
    ) -> SmallVec<[Option<usize>; 4]> {
        let Some(input) = self.layer_input else {
            return SmallVec::new();
        };
        if mode == self.mode() || (mode == InputMode::Unpacked && !input.is_unpackable()) {
            return SmallVec::new();
        }

        let dropped = self.active_upstreams().into_iter().map(|(field, _)| field).collect();
        let packed = self.current_loop(alignment);
        self.rows = match mode {
            InputMode::Packed => {
                let mut row = RowObserver::new(input.value_kind(), &input.default_value());
                row.set_values(packed, now);
                PortRows::Packed(row)
            }
            InputMode::Unpacked => PortRows::Unpacked(
                input
                    .unpacked_kinds()
                    .iter()
                    .zip(split_loop(input, &packed))
                    .map(|(kind, part)| {
                        let mut row = RowObserver::new(*kind, &kind.default_value());
                        row.set_values(part, now);
                        row
                    })
                    .collect(),
            ),
        };
        dropped
    }

    /// Retypes a packed port.
    pub(crate) fn change_kind(&mut self, kind: ValueKind, now: GraphTime) {
        if let PortRows::Packed(row) = &mut self.rows {
            row.change_kind(kind, now);
        }
    }
}

// ============================================================================
// Packing helpers
// ============================================================================

/// One loop per field, lane by lane.
fn split_loop(input: LayerInput, packed: &Loop) -> Vec<Loop> {
    let count = input.unpacked_kinds().len();
    let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(packed.len()); count];
    for value in packed {
        let fields = input.unpack(value);
        for (column, field) in columns.iter_mut().zip(fields) {
            column.push(field);
        }
    }
    columns
        .into_iter()
        .map(|c| Loop::new(c).unwrap_or_else(|_| Loop::single(Value::None)))
        .collect()
}

fn pack_fields(input: LayerInput, fields: &[RowObserver], alignment: LoopAlignment) -> Loop {
    let loops: Vec<Loop> = fields.iter().map(|r| r.current_loop().clone()).collect();
    let lanes = longest_loop_length(&loops);
    let packed: Vec<Value> = (0..lanes)
        .map(|lane| {
            let row: Vec<Value> = loops.iter().map(|l| l.get_looped(lane, alignment).clone()).collect();
            input.pack(&row)
        })
        .collect();
    Loop::new(packed).unwrap_or_else(|_| Loop::single(input.default_value()))
}

fn merge_field(input: LayerInput, packed: &Loop, field: usize, values: &Loop, alignment: LoopAlignment) -> Loop {
    let lanes = packed.len().max(values.len());
    let merged: Vec<Value> = (0..lanes)
        .map(|lane| {
            let mut fields = input.unpack(packed.get_looped(lane, alignment));
            if let Some(slot) = fields.get_mut(field) {
                *slot = values.get_looped(lane, alignment).clone();
            }
            input.pack(&fields)
        })
        .collect();
    Loop::new(merged).unwrap_or_else(|_| packed.clone())
}
