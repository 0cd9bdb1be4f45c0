//! Process-wide integer-ID to handler table.
//!
//! Two independent namespaces: pipeline IDs map to bus handlers, node IDs to
//! pad-added handlers. Lookups take a read lock just long enough to clone the
//! handler `Arc`; the handler runs with no registry lock held, so a handler
//! may register or unregister handles itself.
//!
//! Besides handlers, the registry tracks claims. A pipeline ID is claimed by
//! at most one live bus watch, and a node ID by connections from at most one
//! live node, so two sources never deliver under the same ID.

use crate::dispatch::bus_watch::BusHandler;
use crate::dispatch::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::dispatch::occurrence::Occurrence;
use crate::dispatch::pad_signal::PadAddedHandler;
use crate::error::{BridgeError, Result};
use crate::graph::connector::Connector;
use crate::graph::id::{NodeId, PipelineId};
use crate::sync::{lock, read, write};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

/// Connections one node holds under a node ID.
#[derive(Debug)]
struct PadClaim {
    owner: usize,
    connections: usize,
}

pub struct HandleRegistry {
    bus_handlers: RwLock<HashMap<PipelineId, Arc<dyn BusHandler>>>,
    pad_handlers: RwLock<HashMap<NodeId, Arc<dyn PadAddedHandler>>>,
    watch_claims: Mutex<HashSet<PipelineId>>,
    pad_claims: Mutex<HashMap<NodeId, PadClaim>>,
    diagnostics: RwLock<Arc<dyn DiagnosticSink>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            bus_handlers: RwLock::new(HashMap::new()),
            pad_handlers: RwLock::new(HashMap::new()),
            watch_claims: Mutex::new(HashSet::new()),
            pad_claims: Mutex::new(HashMap::new()),
            diagnostics: RwLock::new(Arc::new(TracingDiagnostics)),
        }
    }

    /// The registry shared by every pipeline in the process.
    pub fn global() -> Arc<HandleRegistry> {
        static GLOBAL: OnceLock<Arc<HandleRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(HandleRegistry::new())))
    }

    // ── Bus handlers ──

    pub fn register_bus_handler(
        &self,
        id: PipelineId,
        handler: impl BusHandler + 'static,
    ) -> Result<()> {
        let mut handlers = write(&self.bus_handlers);
        if handlers.contains_key(&id) {
            return Err(BridgeError::DuplicateHandle {
                namespace: "pipeline",
                id: id.0,
            });
        }
        handlers.insert(id, Arc::new(handler));
        tracing::debug!("Registered bus handler for {}", id);
        Ok(())
    }

    pub fn unregister_bus_handler(&self, id: PipelineId) -> bool {
        let removed = write(&self.bus_handlers).remove(&id).is_some();
        if removed {
            tracing::debug!("Unregistered bus handler for {}", id);
        }
        removed
    }

    pub fn has_bus_handler(&self, id: PipelineId) -> bool {
        read(&self.bus_handlers).contains_key(&id)
    }

    /// Invoke the handler for `id`. Returns false if none is registered.
    pub fn deliver_bus_occurrence(&self, occurrence: &Occurrence, id: PipelineId) -> bool {
        let handler = read(&self.bus_handlers).get(&id).cloned();
        match handler {
            Some(handler) => {
                handler.on_bus_occurrence(occurrence, id);
                true
            }
            None => {
                tracing::trace!("No bus handler for {}, dropped {}", id, occurrence);
                false
            }
        }
    }

    // ── Pad-added handlers ──

    pub fn register_pad_added_handler(
        &self,
        id: NodeId,
        handler: impl PadAddedHandler + 'static,
    ) -> Result<()> {
        let mut handlers = write(&self.pad_handlers);
        if handlers.contains_key(&id) {
            return Err(BridgeError::DuplicateHandle {
                namespace: "connector",
                id: id.0,
            });
        }
        handlers.insert(id, Arc::new(handler));
        tracing::debug!("Registered pad-added handler for {}", id);
        Ok(())
    }

    pub fn unregister_pad_added_handler(&self, id: NodeId) -> bool {
        let removed = write(&self.pad_handlers).remove(&id).is_some();
        if removed {
            tracing::debug!("Unregistered pad-added handler for {}", id);
        }
        removed
    }

    pub fn has_pad_added_handler(&self, id: NodeId) -> bool {
        read(&self.pad_handlers).contains_key(&id)
    }

    pub fn deliver_pad_added(&self, id: NodeId, connector: &Connector) -> bool {
        let handler = read(&self.pad_handlers).get(&id).cloned();
        match handler {
            Some(handler) => {
                handler.on_pad_added(id, connector);
                true
            }
            None => {
                tracing::trace!("No pad-added handler for {}, dropped '{}'", id, connector.name());
                false
            }
        }
    }

    // ── Claims ──

    /// Reserve `id` for one bus watch.
    pub fn claim_watch(&self, id: PipelineId) -> Result<()> {
        if !lock(&self.watch_claims).insert(id) {
            tracing::warn!("{} is already watched by another pipeline", id);
            return Err(BridgeError::WatchAlreadyInstalled(id.0));
        }
        Ok(())
    }

    pub fn is_watch_claimed(&self, id: PipelineId) -> bool {
        lock(&self.watch_claims).contains(&id)
    }

    /// Drop the claim on `id`, unregistering its handler first if asked.
    /// False if `id` was not claimed.
    pub fn release_watch(&self, id: PipelineId, unregister: bool) -> bool {
        let mut claims = lock(&self.watch_claims);
        if !claims.contains(&id) {
            return false;
        }
        if unregister {
            self.unregister_bus_handler(id);
        }
        claims.remove(&id)
    }

    /// Record one more connection from `owner` under `id`. Fails if another
    /// live node holds the ID.
    pub fn claim_pad_added(&self, id: NodeId, owner: usize) -> Result<()> {
        let mut claims = lock(&self.pad_claims);
        match claims.get_mut(&id) {
            Some(claim) if claim.owner != owner => Err(BridgeError::DuplicateHandle {
                namespace: "connector",
                id: id.0,
            }),
            Some(claim) => {
                claim.connections += 1;
                Ok(())
            }
            None => {
                claims.insert(
                    id,
                    PadClaim {
                        owner,
                        connections: 1,
                    },
                );
                Ok(())
            }
        }
    }

    /// Drop one of `owner`'s connections under `id`. When it was the last one
    /// the ID is free again and, if asked, its handler is unregistered.
    /// Returns true when the last connection went away.
    pub fn release_pad_added(&self, id: NodeId, owner: usize, unregister: bool) -> bool {
        let mut claims = lock(&self.pad_claims);
        let Some(claim) = claims.get_mut(&id).filter(|c| c.owner == owner) else {
            return false;
        };
        claim.connections = claim.connections.saturating_sub(1);
        if claim.connections > 0 {
            return false;
        }
        if unregister {
            self.unregister_pad_added_handler(id);
        }
        claims.remove(&id);
        true
    }

    // ── Diagnostics ──

    pub fn set_diagnostic_sink(&self, sink: impl DiagnosticSink + 'static) {
        *write(&self.diagnostics) = Arc::new(sink);
    }

    pub fn reset_diagnostic_sink(&self) {
        *write(&self.diagnostics) = Arc::new(TracingDiagnostics);
    }

    pub fn diagnostic(&self, message: &str) {
        let sink = Arc::clone(&read(&self.diagnostics));
        sink.on_diagnostic(message);
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::bus_watch::MockBusHandler;
    use crate::dispatch::diagnostics::MockDiagnosticSink;
    use mockall::predicate::*;

    #[test]
    fn test_namespaces_are_independent() {
        let registry = HandleRegistry::new();
        registry
            .register_bus_handler(PipelineId(1), |_: &Occurrence, _: PipelineId| {})
            .unwrap();
        registry
            .register_pad_added_handler(NodeId(1), |_: NodeId, _: &Connector| {})
            .unwrap();
        assert!(registry.has_bus_handler(PipelineId(1)));
        assert!(registry.has_pad_added_handler(NodeId(1)));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = HandleRegistry::new();
        registry
            .register_bus_handler(PipelineId(4), |_: &Occurrence, _: PipelineId| {})
            .unwrap();
        let err = registry
            .register_bus_handler(PipelineId(4), |_: &Occurrence, _: PipelineId| {})
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::DuplicateHandle {
                namespace: "pipeline",
                id: 4
            }
        ));

        assert!(registry.unregister_bus_handler(PipelineId(4)));
        assert!(!registry.unregister_bus_handler(PipelineId(4)));
        registry
            .register_bus_handler(PipelineId(4), |_: &Occurrence, _: PipelineId| {})
            .unwrap();
    }

    #[test]
    fn test_delivery_reaches_only_matching_id() {
        let registry = HandleRegistry::new();
        let mut mock = MockBusHandler::new();
        mock.expect_on_bus_occurrence()
            .with(eq(Occurrence::EndOfStream), eq(PipelineId(9)))
            .times(1)
            .return_const(());
        registry.register_bus_handler(PipelineId(9), mock).unwrap();

        assert!(registry.deliver_bus_occurrence(&Occurrence::EndOfStream, PipelineId(9)));
        assert!(!registry.deliver_bus_occurrence(&Occurrence::EndOfStream, PipelineId(10)));
    }

    #[test]
    fn test_handler_may_unregister_itself() {
        let registry = Arc::new(HandleRegistry::new());
        let inner = Arc::clone(&registry);
        registry
            .register_bus_handler(PipelineId(2), move |_: &Occurrence, id: PipelineId| {
                inner.unregister_bus_handler(id);
            })
            .unwrap();
        assert!(registry.deliver_bus_occurrence(&Occurrence::EndOfStream, PipelineId(2)));
        assert!(!registry.has_bus_handler(PipelineId(2)));
    }

    #[test]
    fn test_watch_claim_is_exclusive() {
        let registry = HandleRegistry::new();
        registry
            .register_bus_handler(PipelineId(11), |_: &Occurrence, _: PipelineId| {})
            .unwrap();
        registry.claim_watch(PipelineId(11)).unwrap();
        assert!(matches!(
            registry.claim_watch(PipelineId(11)),
            Err(BridgeError::WatchAlreadyInstalled(11))
        ));

        assert!(registry.release_watch(PipelineId(11), true));
        assert!(!registry.has_bus_handler(PipelineId(11)));
        assert!(!registry.release_watch(PipelineId(11), true));
        registry.claim_watch(PipelineId(11)).unwrap();
    }

    #[test]
    fn test_pad_claim_belongs_to_one_owner() {
        let registry = HandleRegistry::new();
        registry
            .register_pad_added_handler(NodeId(12), |_: NodeId, _: &Connector| {})
            .unwrap();
        registry.claim_pad_added(NodeId(12), 1).unwrap();
        registry.claim_pad_added(NodeId(12), 1).unwrap();
        assert!(matches!(
            registry.claim_pad_added(NodeId(12), 2),
            Err(BridgeError::DuplicateHandle {
                namespace: "connector",
                id: 12
            })
        ));

        // A foreign owner cannot release, and the first of two releases keeps the handler.
        assert!(!registry.release_pad_added(NodeId(12), 2, true));
        assert!(!registry.release_pad_added(NodeId(12), 1, true));
        assert!(registry.has_pad_added_handler(NodeId(12)));
        assert!(registry.release_pad_added(NodeId(12), 1, true));
        assert!(!registry.has_pad_added_handler(NodeId(12)));
        registry.claim_pad_added(NodeId(12), 2).unwrap();
    }

    #[test]
    fn test_diagnostic_sink_swap() {
        let registry = HandleRegistry::new();
        let mut sink = MockDiagnosticSink::new();
        sink.expect_on_diagnostic()
            .with(eq("Resource not found."))
            .times(1)
            .return_const(());
        registry.set_diagnostic_sink(sink);
        registry.diagnostic("Resource not found.");
        registry.reset_diagnostic_sink();
        registry.diagnostic("goes to tracing");
    }
}
