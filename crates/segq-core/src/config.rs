//! Module: config
//! Responsibility: per-query execution policy (block size, group guard, key mode).
//! Does not own: locating or reading configuration files.
//! Boundary: policy values consumed by the plan builder and orchestrator.

use crate::{DEFAULT_MAX_DOCS_PER_BLOCK, error::ConfigurationError, executor::group::GroupKeyMode};
use serde::Deserialize;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid execution config toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

///
/// ExecutionConfig
///
/// ExecutionConfig carries execution policy selected by the caller.
/// `max_docs_per_block` is a batch size for block iteration and never
/// changes results; `max_groups` is a hard guard that aborts the query.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    max_docs_per_block: usize,
    max_groups: u64,
    group_key_mode: GroupKeyMode,
}

impl ExecutionConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_docs_per_block: DEFAULT_MAX_DOCS_PER_BLOCK,
            max_groups: u64::MAX,
            group_key_mode: GroupKeyMode::Auto,
        }
    }

    #[must_use]
    pub const fn with_max_docs_per_block(mut self, max_docs_per_block: usize) -> Self {
        self.max_docs_per_block = max_docs_per_block;
        self
    }

    #[must_use]
    pub const fn with_max_groups(mut self, max_groups: u64) -> Self {
        self.max_groups = max_groups;
        self
    }

    #[must_use]
    pub const fn with_group_key_mode(mut self, group_key_mode: GroupKeyMode) -> Self {
        self.group_key_mode = group_key_mode;
        self
    }

    #[must_use]
    pub const fn max_docs_per_block(&self) -> usize {
        self.max_docs_per_block
    }

    #[must_use]
    pub const fn max_groups(&self) -> u64 {
        self.max_groups
    }

    #[must_use]
    pub const fn group_key_mode(&self) -> GroupKeyMode {
        self.group_key_mode
    }

    pub const fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_docs_per_block == 0 {
            return Err(ConfigurationError::ZeroBlockSize);
        }

        Ok(())
    }

    /// Parse and validate one TOML fragment, for example:
    ///
    /// ```toml
    /// max_docs_per_block = 4096
    /// group_key_mode = "dictionary_and_trie"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_standard_block_size_and_no_group_guard() {
        let config = ExecutionConfig::default();

        assert_eq!(config.max_docs_per_block(), 10_000);
        assert_eq!(config.max_groups(), u64::MAX);
        assert_eq!(config.group_key_mode(), GroupKeyMode::Auto);
    }

    #[test]
    fn toml_overrides_only_named_fields() {
        let config = ExecutionConfig::from_toml_str(
            "max_docs_per_block = 128\ngroup_key_mode = \"dictionary_and_trie\"\n",
        )
        .expect("config");

        assert_eq!(config.max_docs_per_block(), 128);
        assert_eq!(config.max_groups(), u64::MAX);
        assert_eq!(config.group_key_mode(), GroupKeyMode::DictionaryAndTrie);
    }

    #[test]
    fn toml_rejects_zero_block_size_and_unknown_keys() {
        assert!(matches!(
            ExecutionConfig::from_toml_str("max_docs_per_block = 0"),
            Err(ConfigError::Invalid(ConfigurationError::ZeroBlockSize))
        ));
        assert!(matches!(
            ExecutionConfig::from_toml_str("block = 5"),
            Err(ConfigError::Toml(_))
        ));
    }
}
