//! Module: executor::group::trie
//! Responsibility: arena trie over per-column dictionary ids for wide group keys.
//! Does not own: dictionary decoding beyond the id path.
//! Boundary: DictionaryAndTrie key mode; cost scales with observed paths only.

use crate::{
    error::InternalError,
    executor::{
        group::{GroupColumn, GroupKey},
        projection::Block,
    },
    segment::{DictId, Segment},
    value::Value,
};
use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3Builder;

const ROOT: u32 = 0;

///
/// TrieNodeId
///
/// Handle of one trie node. Leaf handles at full depth are group keys.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TrieNodeId(u32);

impl TrieNodeId {
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug)]
struct TrieNode {
    parent: u32,
    label: DictId,
}

///
/// DictionaryTrie
///
/// Nodes live in one vector and are addressed by index; edges live in one
/// hash map keyed by `(parent, label)`. Node 0 is the root.
///

#[derive(Clone, Debug)]
pub struct DictionaryTrie {
    nodes: Vec<TrieNode>,
    edges: HashMap<(u32, DictId), u32, Xxh3Builder>,
}

impl DictionaryTrie {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode {
                parent: ROOT,
                label: 0,
            }],
            edges: HashMap::with_hasher(Xxh3Builder::new()),
        }
    }

    /// Insert `path` if absent and return its leaf. Inserting an existing
    /// path returns the same leaf and allocates nothing.
    pub fn insert_path(&mut self, path: &[DictId]) -> Result<TrieNodeId, InternalError> {
        let mut node = ROOT;
        for label in path {
            node = match self.edges.get(&(node, *label)) {
                Some(child) => *child,
                None => {
                    let child = u32::try_from(self.nodes.len()).map_err(|_| {
                        InternalError::executor_invariant("group trie exceeded u32 node handles")
                    })?;
                    self.nodes.push(TrieNode {
                        parent: node,
                        label: *label,
                    });
                    self.edges.insert((node, *label), child);
                    child
                }
            };
        }

        Ok(TrieNodeId(node))
    }

    #[must_use]
    pub fn lookup_path(&self, path: &[DictId]) -> Option<TrieNodeId> {
        path.iter()
            .try_fold(ROOT, |node, label| self.edges.get(&(node, *label)).copied())
            .map(TrieNodeId)
    }

    /// Labels from the root down to `leaf`.
    pub fn path(&self, leaf: TrieNodeId) -> Result<Vec<DictId>, InternalError> {
        let mut labels = Vec::new();
        let mut node = leaf.0;
        while node != ROOT {
            let entry = self.nodes.get(node as usize).ok_or_else(|| {
                InternalError::executor_invariant(format!("group trie has no node {node}"))
            })?;
            labels.push(entry.label);
            node = entry.parent;
        }
        labels.reverse();

        Ok(labels)
    }

    /// Number of nodes including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for DictionaryTrie {
    fn default() -> Self {
        Self::new()
    }
}

///
/// TrieKeyGenerator
///

#[derive(Debug)]
pub struct TrieKeyGenerator {
    columns: Vec<GroupColumn>,
    null_ids: Vec<DictId>,
    trie: DictionaryTrie,
    scratch: Vec<DictId>,
}

impl TrieKeyGenerator {
    pub(crate) fn new(
        segment: &dyn Segment,
        columns: Vec<GroupColumn>,
    ) -> Result<Self, InternalError> {
        let null_ids = super::null_sentinels(segment, &columns)?;
        let scratch = Vec::with_capacity(columns.len());

        Ok(Self {
            columns,
            null_ids,
            trie: DictionaryTrie::new(),
            scratch,
        })
    }

    #[must_use]
    pub const fn trie(&self) -> &DictionaryTrie {
        &self.trie
    }

    pub(crate) fn generate(
        &mut self,
        block: &Block,
        keys: &mut Vec<GroupKey>,
    ) -> Result<(), InternalError> {
        keys.clear();
        for row in 0..block.len() {
            self.scratch.clear();
            for (column, null_id) in self.columns.iter().zip(&self.null_ids) {
                let id = block.column(column.position()).dict_id(row);
                self.scratch.push(id.unwrap_or(*null_id));
            }
            keys.push(GroupKey::Trie(self.trie.insert_path(&self.scratch)?));
        }

        Ok(())
    }

    pub(crate) fn decode(
        &self,
        leaf: TrieNodeId,
        segment: &dyn Segment,
    ) -> Result<Vec<Value>, InternalError> {
        let path = self.trie.path(leaf)?;
        if path.len() != self.columns.len() {
            return Err(InternalError::executor_invariant(format!(
                "group trie leaf {} has depth {}, expected {}",
                leaf.0,
                path.len(),
                self.columns.len()
            )));
        }

        path.iter()
            .zip(self.columns.iter().zip(&self.null_ids))
            .map(|(id, (column, null_id))| {
                super::decode_dictionary_id(segment, column, *id, *null_id)
            })
            .collect()
    }
}
