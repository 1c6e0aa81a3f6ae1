//! Module: executor::group::table
//! Responsibility: map group keys to dense group indexes under a group-count guard.
//! Does not own: key generation or aggregate state.
//! Boundary: the only owner of group cardinality during one run.

use crate::{error::InternalError, executor::group::GroupKey};
use std::collections::{HashMap, hash_map::Entry};
use thiserror::Error as ThisError;
use xxhash_rust::xxh3::Xxh3Builder;

///
/// GroupError
///
/// GroupError is the grouped-execution error surface.
/// Hard-limit failures stay typed so callers can tell a guard trip apart from
/// an internal fault.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum GroupError {
    #[error(
        "grouped execution limit exceeded ({resource}): attempted={attempted}, limit={limit}"
    )]
    GroupLimitExceeded {
        resource: &'static str,
        attempted: u64,
        limit: u64,
    },

    #[error("{0}")]
    Internal(#[from] InternalError),
}

///
/// GroupTable
///
/// Dense index assignment in first-seen order. Index `i` always refers to
/// `keys()[i]`.
///

#[derive(Debug)]
pub struct GroupTable {
    index: HashMap<GroupKey, u32, Xxh3Builder>,
    keys: Vec<GroupKey>,
    max_groups: u64,
}

impl GroupTable {
    #[must_use]
    pub fn new(max_groups: u64) -> Self {
        Self {
            index: HashMap::with_hasher(Xxh3Builder::new()),
            keys: Vec::new(),
            max_groups,
        }
    }

    /// Return the dense index of `key`, assigning the next index on first sight.
    pub fn group_index(&mut self, key: GroupKey) -> Result<u32, GroupError> {
        let next = self.keys.len();
        match self.index.entry(key) {
            Entry::Occupied(slot) => Ok(*slot.get()),
            Entry::Vacant(slot) => {
                let attempted = u64::try_from(next).unwrap_or(u64::MAX).saturating_add(1);
                if attempted > self.max_groups {
                    return Err(GroupError::GroupLimitExceeded {
                        resource: "groups",
                        attempted,
                        limit: self.max_groups,
                    });
                }
                let group = u32::try_from(next).map_err(|_| {
                    InternalError::executor_invariant("group table exceeded u32 group indexes")
                })?;
                self.keys.push(slot.key().clone());
                slot.insert(group);

                Ok(group)
            }
        }
    }

    /// Map one block of keys to group indexes, reusing `groups` as output.
    pub fn assign(
        &mut self,
        keys: &mut Vec<GroupKey>,
        groups: &mut Vec<u32>,
    ) -> Result<(), GroupError> {
        groups.clear();
        for key in keys.drain(..) {
            groups.push(self.group_index(key)?);
        }

        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    /// Drop every group and release the backing storage.
    pub fn clear(&mut self) {
        self.index = HashMap::with_hasher(Xxh3Builder::new());
        self.keys = Vec::new();
    }
}
