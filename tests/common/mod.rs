//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod recorder;

use mediabridge_rs::{NodeId, PipelineId};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

/// Start the engine with defaults. Safe to call from every test.
pub fn init() {
    mediabridge_rs::init();
}

/// Upper bound for waiting on an asynchronous occurrence
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// How long to keep listening when asserting that nothing more arrives
pub fn settle_time() -> Duration {
    Duration::from_millis(100)
}

static NEXT_ID: AtomicI32 = AtomicI32::new(1000);

/// Tests share the process-wide registry, so each one takes fresh IDs.
pub fn next_pipeline_id() -> PipelineId {
    PipelineId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

pub fn next_node_id() -> NodeId {
    NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// A pipeline name no other test uses
pub fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, NEXT_ID.fetch_add(1, Ordering::Relaxed))
}
