//! Dynamic-connector signal bridge.
//!
//! A node keeps one [`PadAddedConnection`] per `connect_pad_added` call. The
//! streaming thread emits through every live connection when it creates a
//! sometimes-connector; the connection resolves the handler by node ID at
//! delivery time and never links anything itself.

use crate::dispatch::context::{CallbackContext, CallbackSource};
use crate::dispatch::registry::HandleRegistry;
use crate::graph::connector::Connector;
use crate::graph::id::{NodeId, SignalHandlerId};
use std::sync::Arc;

/// External handler notified when a node exposes a new connector.
///
/// Runs on the pipeline's streaming thread. Linking the new connector from
/// inside the handler is the expected use.
#[cfg_attr(test, mockall::automock)]
pub trait PadAddedHandler: Send + Sync {
    fn on_pad_added(&self, node_id: NodeId, connector: &Connector);
}

impl<F> PadAddedHandler for F
where
    F: Fn(NodeId, &Connector) + Send + Sync,
{
    fn on_pad_added(&self, node_id: NodeId, connector: &Connector) {
        self(node_id, connector)
    }
}

pub struct PadAddedConnection {
    handler_id: SignalHandlerId,
    context: Arc<CallbackContext>,
    registry: Arc<HandleRegistry>,
}

impl PadAddedConnection {
    pub fn new(node_id: NodeId, registry: Arc<HandleRegistry>) -> Self {
        Self {
            handler_id: SignalHandlerId::next(),
            context: CallbackContext::new(node_id.0, CallbackSource::PadAdded),
            registry,
        }
    }

    pub fn handler_id(&self) -> SignalHandlerId {
        self.handler_id
    }

    pub fn node_id(&self) -> NodeId {
        NodeId(self.context.id())
    }

    /// Relay one new connector. Returns true if a handler ran.
    pub fn emit(&self, connector: &Connector) -> bool {
        let Some(_guard) = self.context.enter() else {
            return false;
        };
        self.registry.deliver_pad_added(self.node_id(), connector)
    }

    /// Teardown barrier for this connection. See [`CallbackContext::close`].
    pub fn close(&self) {
        self.context.close();
    }
}

impl std::fmt::Debug for PadAddedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PadAddedConnection")
            .field("handler_id", &self.handler_id)
            .field("node_id", &self.node_id())
            .finish()
    }
}
