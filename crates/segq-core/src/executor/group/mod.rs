//! Module: executor::group
//! Responsibility: group-key modes, key generation and dense group assignment.
//! Does not own: aggregate state or result shaping.
//! Boundary: turns projected blocks into one dense group index per row.

mod packed;
mod raw;
mod table;
mod trie;

#[cfg(test)]
mod tests;

pub use packed::{KeyLayout, OverflowError, PACKED_KEY_BITS, PackedKeyGenerator, bits_for};
pub use raw::{RawKeyGenerator, decode_values, encode_value};
pub use table::{GroupError, GroupTable};
pub use trie::{DictionaryTrie, TrieKeyGenerator, TrieNodeId};

use crate::{
    error::{ConfigurationError, InternalError},
    executor::projection::Block,
    segment::{ColumnSlot, DictId, Segment},
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// GroupKeyMode
///
/// Strategy used to turn group-by values into hashable keys. Chosen once per
/// plan; a running query never switches modes.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKeyMode {
    /// Type-tagged byte encoding of raw values. Works for every column.
    NoDictionary,

    /// Dictionary ids packed into one `u64`.
    Dictionary,

    /// Dictionary-id paths in an arena trie; leaf handles are keys.
    DictionaryAndTrie,

    /// Pick the cheapest mode the group-by columns support.
    #[default]
    Auto,
}

impl GroupKeyMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoDictionary => "no_dictionary",
            Self::Dictionary => "dictionary",
            Self::DictionaryAndTrie => "dictionary_and_trie",
            Self::Auto => "auto",
        }
    }

    const fn requires_dictionary(self) -> bool {
        matches!(self, Self::Dictionary | Self::DictionaryAndTrie)
    }
}

impl fmt::Display for GroupKeyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// GroupKey
///
/// Two rows share a key iff their group-by values are equal under canonical
/// value equality.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum GroupKey {
    Packed(u64),
    Raw(Box<[u8]>),
    Trie(TrieNodeId),
}

///
/// GroupColumn
///
/// Group-by column resolved against the segment, plus its position in the
/// projected block.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupColumn {
    slot: ColumnSlot,
    position: usize,
}

impl GroupColumn {
    #[must_use]
    pub const fn new(slot: ColumnSlot, position: usize) -> Self {
        Self { slot, position }
    }

    #[must_use]
    pub const fn slot(&self) -> &ColumnSlot {
        &self.slot
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

///
/// KeyModeFallback
///
/// Recorded when the packed layout overflowed and another mode was used.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyModeFallback {
    pub resolved: GroupKeyMode,
    pub overflow: OverflowError,
}

impl fmt::Display for KeyModeFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dictionary key overflow ({} of {} bits), using {}",
            self.overflow.required_bits, self.overflow.available, self.resolved
        )
    }
}

///
/// ResolvedKeyMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ResolvedKeyMode {
    pub requested: GroupKeyMode,
    pub resolved: GroupKeyMode,
    pub fallback: Option<KeyModeFallback>,
}

/// Select the concrete key mode for `columns`.
///
/// Explicit dictionary modes reject columns without dictionaries. A packed
/// layout that does not fit 64 bits falls back to raw keys when Dictionary was
/// requested, and to the trie when the mode was left on Auto.
pub fn resolve_key_mode(
    segment: &dyn Segment,
    columns: &[ColumnSlot],
    requested: GroupKeyMode,
) -> Result<ResolvedKeyMode, ConfigurationError> {
    let missing = columns.iter().find(|column| {
        !column.has_dictionary() || segment.dictionary_size(column.index()).is_none()
    });

    if let Some(column) = missing {
        if requested.requires_dictionary() {
            return Err(ConfigurationError::MissingDictionary {
                column: column.name().to_string(),
                mode: requested,
            });
        }

        return Ok(ResolvedKeyMode {
            requested,
            resolved: GroupKeyMode::NoDictionary,
            fallback: None,
        });
    }

    let plain = |resolved| ResolvedKeyMode {
        requested,
        resolved,
        fallback: None,
    };

    match requested {
        GroupKeyMode::NoDictionary | GroupKeyMode::DictionaryAndTrie => Ok(plain(requested)),
        GroupKeyMode::Dictionary | GroupKeyMode::Auto => {
            let cardinalities: Vec<u64> = columns
                .iter()
                .map(|column| {
                    let size = segment.dictionary_size(column.index()).unwrap_or(0);
                    u64::try_from(size).unwrap_or(u64::MAX).saturating_add(1)
                })
                .collect();

            match KeyLayout::for_cardinalities(&cardinalities) {
                Ok(_) => Ok(plain(GroupKeyMode::Dictionary)),
                Err(overflow) => {
                    let target = if requested == GroupKeyMode::Auto {
                        GroupKeyMode::DictionaryAndTrie
                    } else {
                        GroupKeyMode::NoDictionary
                    };
                    let fallback = KeyModeFallback {
                        resolved: target,
                        overflow,
                    };
                    tracing::warn!(
                        segment = segment.name(),
                        requested = %requested,
                        %fallback,
                        "group key mode fell back"
                    );

                    Ok(ResolvedKeyMode {
                        requested,
                        resolved: target,
                        fallback: Some(fallback),
                    })
                }
            }
        }
    }
}

///
/// GroupKeyGenerator
///

#[derive(Debug)]
pub enum GroupKeyGenerator {
    NoDictionary(RawKeyGenerator),
    Dictionary(PackedKeyGenerator),
    DictionaryAndTrie(TrieKeyGenerator),
}

impl GroupKeyGenerator {
    /// Build the generator for an already resolved mode.
    pub fn new(
        mode: GroupKeyMode,
        segment: &dyn Segment,
        columns: Vec<GroupColumn>,
    ) -> Result<Self, InternalError> {
        match mode {
            GroupKeyMode::NoDictionary => Ok(Self::NoDictionary(RawKeyGenerator::new(columns))),
            GroupKeyMode::Dictionary => Ok(Self::Dictionary(PackedKeyGenerator::new(
                segment, columns,
            )?)),
            GroupKeyMode::DictionaryAndTrie => Ok(Self::DictionaryAndTrie(
                TrieKeyGenerator::new(segment, columns)?,
            )),
            GroupKeyMode::Auto => Err(InternalError::executor_invariant(
                "group key generator requires a resolved mode",
            )),
        }
    }

    #[must_use]
    pub const fn mode(&self) -> GroupKeyMode {
        match self {
            Self::NoDictionary(_) => GroupKeyMode::NoDictionary,
            Self::Dictionary(_) => GroupKeyMode::Dictionary,
            Self::DictionaryAndTrie(_) => GroupKeyMode::DictionaryAndTrie,
        }
    }

    /// Trie built so far, when keys are trie nodes.
    #[must_use]
    pub const fn trie(&self) -> Option<&DictionaryTrie> {
        match self {
            Self::DictionaryAndTrie(generator) => Some(generator.trie()),
            _ => None,
        }
    }

    /// Replace `keys` with one key per row of `block`.
    pub fn generate(
        &mut self,
        block: &Block,
        keys: &mut Vec<GroupKey>,
    ) -> Result<(), InternalError> {
        match self {
            Self::NoDictionary(generator) => generator.generate(block, keys),
            Self::Dictionary(generator) => {
                generator.generate(block, keys);
                Ok(())
            }
            Self::DictionaryAndTrie(generator) => generator.generate(block, keys),
        }
    }

    /// Decode one key back into its group-by values.
    pub fn decode(
        &self,
        key: &GroupKey,
        segment: &dyn Segment,
    ) -> Result<Vec<Value>, InternalError> {
        match (self, key) {
            (Self::NoDictionary(generator), GroupKey::Raw(bytes)) => generator.decode(bytes),
            (Self::Dictionary(generator), GroupKey::Packed(word)) => {
                generator.decode(*word, segment)
            }
            (Self::DictionaryAndTrie(generator), GroupKey::Trie(leaf)) => {
                generator.decode(*leaf, segment)
            }
            _ => Err(InternalError::executor_invariant(format!(
                "{} key generator cannot decode {key:?}",
                self.mode()
            ))),
        }
    }
}

// Null sentinel per column: the dictionary size, one past the last real id.
fn null_sentinels(
    segment: &dyn Segment,
    columns: &[GroupColumn],
) -> Result<Vec<DictId>, InternalError> {
    columns
        .iter()
        .map(|column| {
            let size = segment
                .dictionary_size(column.slot().index())
                .ok_or_else(|| {
                    InternalError::executor_invariant(format!(
                        "group-by column '{}' has no dictionary",
                        column.slot().name()
                    ))
                })?;

            DictId::try_from(size).map_err(|_| {
                InternalError::segment_corruption(format!(
                    "dictionary of column '{}' holds {size} entries",
                    column.slot().name()
                ))
            })
        })
        .collect()
}

fn decode_dictionary_id(
    segment: &dyn Segment,
    column: &GroupColumn,
    id: DictId,
    null_id: DictId,
) -> Result<Value, InternalError> {
    if id == null_id {
        return Ok(Value::Null);
    }

    segment
        .dictionary_value(column.slot().index(), id)
        .ok_or_else(|| {
            InternalError::segment_corruption(format!(
                "column '{}' has no dictionary entry {id}",
                column.slot().name()
            ))
        })
}
