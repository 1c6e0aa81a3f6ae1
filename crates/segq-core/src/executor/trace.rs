//! Executor query tracing boundary.
//!
//! Tracing is optional, injected by the caller, and must not affect execution semantics.

use crate::{error::QueryErrorKind, executor::group::GroupKeyMode};
use sha2::{Digest, Sha256};
use std::{fmt, sync::Arc};

///
/// QueryTraceSink
///

pub trait QueryTraceSink: Send + Sync {
    fn on_event(&self, event: QueryTraceEvent);
}

///
/// PlanFingerprint
///
/// SHA-256 over the rendered explain tree. Two plans with the same
/// fingerprint compile to the same operator pipeline.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct PlanFingerprint([u8; 32]);

impl PlanFingerprint {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub(crate) fn from_explain(explain: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"planfp:v1");
        let len = u32::try_from(explain.len()).unwrap_or(u32::MAX);
        hasher.update(len.to_be_bytes());
        hasher.update(explain.as_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);

        Self(out)
    }
}

impl fmt::Display for PlanFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

///
/// QueryTraceEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryTraceEvent {
    Start {
        fingerprint: PlanFingerprint,
        requested: GroupKeyMode,
        resolved: GroupKeyMode,
    },
    Block {
        fingerprint: PlanFingerprint,
        block: u64,
        docs: u64,
        groups: u64,
    },
    Finish {
        fingerprint: PlanFingerprint,
        blocks: u64,
        docs: u64,
        groups: u64,
    },
    Error {
        fingerprint: PlanFingerprint,
        kind: QueryErrorKind,
    },
}

///
/// TraceScope
///

pub(crate) struct TraceScope {
    sink: Arc<dyn QueryTraceSink>,
    fingerprint: PlanFingerprint,
}

impl TraceScope {
    pub(crate) fn start(
        sink: Option<&Arc<dyn QueryTraceSink>>,
        fingerprint: PlanFingerprint,
        requested: GroupKeyMode,
        resolved: GroupKeyMode,
    ) -> Option<Self> {
        let sink = Arc::clone(sink?);
        sink.on_event(QueryTraceEvent::Start {
            fingerprint,
            requested,
            resolved,
        });

        Some(Self { sink, fingerprint })
    }

    pub(crate) fn block(&self, block: u64, docs: u64, groups: u64) {
        self.sink.on_event(QueryTraceEvent::Block {
            fingerprint: self.fingerprint,
            block,
            docs,
            groups,
        });
    }

    pub(crate) fn finish(self, blocks: u64, docs: u64, groups: u64) {
        self.sink.on_event(QueryTraceEvent::Finish {
            fingerprint: self.fingerprint,
            blocks,
            docs,
            groups,
        });
    }

    pub(crate) fn error(self, kind: QueryErrorKind) {
        self.sink.on_event(QueryTraceEvent::Error {
            fingerprint: self.fingerprint,
            kind,
        });
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let left = PlanFingerprint::from_explain("Operator: A\n");
        let right = PlanFingerprint::from_explain("Operator: A\n");
        let other = PlanFingerprint::from_explain("Operator: B\n");

        assert_eq!(left, right);
        assert_ne!(left, other);
        assert_eq!(left.to_string().len(), 16);
    }
}
