//! Module: executor::group::packed
//! Responsibility: bit-packed `u64` group keys built from per-column dictionary ids.
//! Does not own: mode selection or fallback policy.
//! Boundary: Dictionary key mode; layout is fixed before the first row is read.

use crate::{
    error::InternalError,
    executor::{
        group::{GroupColumn, GroupKey},
        projection::Block,
    },
    segment::{DictId, Segment},
    value::Value,
};
use thiserror::Error as ThisError;

/// Width of the packed key word.
pub const PACKED_KEY_BITS: u32 = u64::BITS;

/// Bits needed to represent every id in `[0, cardinality)`. Never less than one.
#[must_use]
pub const fn bits_for(cardinality: u64) -> u32 {
    if cardinality <= 1 {
        1
    } else {
        u64::BITS - (cardinality - 1).leading_zeros()
    }
}

///
/// OverflowError
///
/// Combined dictionary cardinalities do not fit into one packed key word.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
#[error("packed group key needs {required_bits} bits, only {available} available")]
pub struct OverflowError {
    pub required_bits: u32,
    pub available: u32,
}

///
/// KeyLayout
///
/// Per-column bit widths and shifts. The first group-by column occupies the
/// most significant used bits.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyLayout {
    widths: Vec<u32>,
    shifts: Vec<u32>,
    total_bits: u32,
}

impl KeyLayout {
    /// Build the layout for the given per-column cardinalities (dictionary
    /// size plus the null sentinel).
    pub fn for_cardinalities(cardinalities: &[u64]) -> Result<Self, OverflowError> {
        let widths: Vec<u32> = cardinalities.iter().map(|c| bits_for(*c)).collect();
        let total_bits = widths.iter().fold(0u32, |acc, w| acc.saturating_add(*w));
        if total_bits > PACKED_KEY_BITS {
            return Err(OverflowError {
                required_bits: total_bits,
                available: PACKED_KEY_BITS,
            });
        }

        let mut remaining = total_bits;
        let shifts = widths
            .iter()
            .map(|width| {
                remaining -= width;
                remaining
            })
            .collect();

        Ok(Self {
            widths,
            shifts,
            total_bits,
        })
    }

    #[must_use]
    pub const fn total_bits(&self) -> u32 {
        self.total_bits
    }

    /// Pack one id per column. Callers guarantee each id fits its width.
    #[must_use]
    pub fn pack(&self, ids: &[DictId]) -> u64 {
        ids.iter()
            .zip(&self.shifts)
            .fold(0u64, |key, (id, shift)| key | (u64::from(*id) << shift))
    }

    /// Extract the id stored for column `position`.
    #[must_use]
    pub fn unpack(&self, key: u64, position: usize) -> DictId {
        let width = self.widths[position];
        let mask = if width >= u64::BITS {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        let id = (key >> self.shifts[position]) & mask;

        // Widths come from u32 dictionary sizes, so ids always fit.
        DictId::try_from(id).unwrap_or(DictId::MAX)
    }
}

///
/// PackedKeyGenerator
///

#[derive(Debug)]
pub struct PackedKeyGenerator {
    columns: Vec<GroupColumn>,
    null_ids: Vec<DictId>,
    layout: KeyLayout,
    scratch: Vec<DictId>,
}

impl PackedKeyGenerator {
    pub(crate) fn new(
        segment: &dyn Segment,
        columns: Vec<GroupColumn>,
    ) -> Result<Self, InternalError> {
        let null_ids = super::null_sentinels(segment, &columns)?;
        let cardinalities: Vec<u64> = null_ids.iter().map(|id| u64::from(*id) + 1).collect();
        let layout = KeyLayout::for_cardinalities(&cardinalities).map_err(|err| {
            InternalError::executor_invariant(format!(
                "dictionary key mode selected for an overflowing layout: {err}"
            ))
        })?;
        let scratch = Vec::with_capacity(columns.len());

        Ok(Self {
            columns,
            null_ids,
            layout,
            scratch,
        })
    }

    pub(crate) fn generate(&mut self, block: &Block, keys: &mut Vec<GroupKey>) {
        keys.clear();
        for row in 0..block.len() {
            self.scratch.clear();
            for (column, null_id) in self.columns.iter().zip(&self.null_ids) {
                let id = block.column(column.position()).dict_id(row);
                self.scratch.push(id.unwrap_or(*null_id));
            }
            keys.push(GroupKey::Packed(self.layout.pack(&self.scratch)));
        }
    }

    pub(crate) fn decode(
        &self,
        key: u64,
        segment: &dyn Segment,
    ) -> Result<Vec<Value>, InternalError> {
        self.columns
            .iter()
            .zip(&self.null_ids)
            .enumerate()
            .map(|(position, (column, null_id))| {
                let id = self.layout.unpack(key, position);
                super::decode_dictionary_id(segment, column, id, *null_id)
            })
            .collect()
    }
}
