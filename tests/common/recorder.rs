//! Handlers that forward what they see into channels

use crossbeam_channel::{unbounded, Receiver};
use mediabridge_rs::{Connector, NodeId, Occurrence, PipelineId, State};
use std::time::{Duration, Instant};

/// Registers a bus handler for one ID and records every occurrence.
pub struct BusRecorder {
    pub id: PipelineId,
    rx: Receiver<(PipelineId, Occurrence)>,
}

impl BusRecorder {
    pub fn register(id: PipelineId) -> Self {
        let (tx, rx) = unbounded();
        mediabridge_rs::register_bus_handler(id, move |occ: &Occurrence, id: PipelineId| {
            let _ = tx.send((id, occ.clone()));
        })
        .unwrap();
        Self { id, rx }
    }

    /// Wait for the first occurrence matching `pred`, returning everything seen up to it.
    pub fn wait_for(
        &self,
        pred: impl Fn(&Occurrence) -> bool,
        timeout: Duration,
    ) -> Option<Vec<Occurrence>> {
        let deadline = Instant::now() + timeout;
        let mut seen = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let (id, occ) = self.rx.recv_timeout(remaining).ok()?;
            assert_eq!(id, self.id, "occurrence delivered under a foreign ID");
            let done = pred(&occ);
            seen.push(occ);
            if done {
                return Some(seen);
            }
        }
    }

    pub fn wait_for_state(&self, source: &str, state: State, timeout: Duration) -> bool {
        self.wait_for(|o| o.is_state_change_to(source, state), timeout)
            .is_some()
    }

    /// Everything that arrives until nothing has for `quiet`.
    pub fn drain(&self, quiet: Duration) -> Vec<Occurrence> {
        let mut seen = Vec::new();
        while let Ok((id, occ)) = self.rx.recv_timeout(quiet) {
            assert_eq!(id, self.id, "occurrence delivered under a foreign ID");
            seen.push(occ);
        }
        seen
    }
}

/// A pad-added notification as seen by the handler
#[derive(Debug, Clone)]
pub struct PadAdded {
    pub node_id: NodeId,
    pub connector: String,
    pub linked: bool,
}

/// Registers a pad-added handler that links each new connector to `target`.
pub struct PadRecorder {
    pub id: NodeId,
    rx: Receiver<PadAdded>,
}

impl PadRecorder {
    pub fn linking_to(id: NodeId, target: Option<Connector>) -> Self {
        let (tx, rx) = unbounded();
        mediabridge_rs::register_pad_added_handler(id, move |node_id: NodeId, c: &Connector| {
            let linked = target
                .as_ref()
                .map(|t| mediabridge_rs::link_connectors(c, t))
                .unwrap_or(false);
            let _ = tx.send(PadAdded {
                node_id,
                connector: c.name().to_string(),
                linked,
            });
        })
        .unwrap();
        Self { id, rx }
    }

    pub fn next(&self, timeout: Duration) -> Option<PadAdded> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn drain(&self, quiet: Duration) -> Vec<PadAdded> {
        let mut seen = Vec::new();
        while let Ok(p) = self.rx.recv_timeout(quiet) {
            seen.push(p);
        }
        seen
    }
}
