//! Integer handles used by the external handler domain.
//!
//! Pipeline IDs and node IDs are chosen by the caller and live in independent
//! namespaces; the same number may name a pipeline and a node at once.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Caller-chosen handle for a pipeline's bus occurrences.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub i32);

impl From<i32> for PipelineId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Debug for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineId({})", self.0)
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Caller-chosen handle for a node's dynamic-connector notifications.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub i32);

impl From<i32> for NodeId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identifies one pad-added connection on a node. Process-unique.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SignalHandlerId(u64);

impl SignalHandlerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}
