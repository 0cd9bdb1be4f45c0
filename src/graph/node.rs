//! Nodes: processing units created from an [`ElementFactory`].
//!
//! A `Node` is a cloneable handle. Its lifetime is tied to its pipeline: when
//! the pipeline is torn down every child is released, which closes its
//! signal connections, unlinks its connectors and detaches it. Handles the
//! caller still holds afterwards refuse further work.

use crate::dispatch::pad_signal::PadAddedConnection;
use crate::dispatch::registry::HandleRegistry;
use crate::engine::caps::Caps;
use crate::engine::factory::{ConnectorTemplate, ElementFactory};
use crate::engine::message::Message;
use crate::error::{BridgeError, Result};
use crate::graph::connector::{Connector, ConnectorDirection, ConnectorPresence};
use crate::graph::id::{NodeId, SignalHandlerId};
use crate::graph::property::PropertyValue;
use crate::pipeline::state::State;
use crate::pipeline::PipelineShared;
use crate::sync::lock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

pub(crate) struct NodeInner {
    factory: &'static ElementFactory,
    name: String,
    connectors: Mutex<Vec<Connector>>,
    properties: Mutex<HashMap<String, PropertyValue>>,
    parent: Mutex<Option<Weak<PipelineShared>>>,
    signals: Mutex<Vec<Arc<PadAddedConnection>>>,
    /// Messages posted before the node had a bus to post them on.
    pending_messages: Mutex<Vec<Message>>,
    next_dynamic_index: AtomicU32,
    next_request_index: AtomicU32,
    state: Mutex<State>,
    released: AtomicBool,
    registry: Arc<HandleRegistry>,
}

impl NodeInner {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Both unparented, or both children of the same live pipeline.
    pub(crate) fn shares_parent_with(&self, other: &NodeInner) -> bool {
        let mine = lock(&self.parent).clone();
        let theirs = lock(&other.parent).clone();
        match (mine, theirs) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(&b) && a.strong_count() > 0,
            _ => false,
        }
    }

    /// Identity under which this node claims node IDs in the registry.
    fn claim_key(&self) -> usize {
        self as *const NodeInner as usize
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }

        let connections = std::mem::take(&mut *lock(&self.signals));
        for connection in &connections {
            connection.close();
            self.registry
                .release_pad_added(connection.node_id(), self.claim_key(), true);
        }

        let connectors = lock(&self.connectors).clone();
        for connector in &connectors {
            connector.unlink();
        }

        *lock(&self.parent) = None;
        lock(&self.pending_messages).clear();
        tracing::debug!("Released '{}'", self.name);
    }
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle to a processing node.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Create a node of `kind`. Without a name, one is generated as `<kind><n>`.
    pub fn new(kind: &str, name: Option<&str>) -> Result<Node> {
        let engine = crate::engine::get()?;
        let factory = engine
            .factories()
            .find(kind)
            .ok_or_else(|| BridgeError::UnknownKind(kind.to_string()))?;
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => engine.next_instance_name(factory.kind),
        };
        Ok(Self::from_factory(factory, name, engine.registry()))
    }

    pub(crate) fn from_factory(
        factory: &'static ElementFactory,
        name: String,
        registry: Arc<HandleRegistry>,
    ) -> Node {
        let inner = Arc::new_cyclic(|weak: &Weak<NodeInner>| {
            let connectors = factory
                .templates
                .iter()
                .filter(|t| t.presence == ConnectorPresence::Always)
                .map(|t| {
                    Connector::new(
                        t.instance_name(0),
                        t.direction,
                        t.presence,
                        t.caps(),
                        weak.clone(),
                    )
                })
                .collect();

            NodeInner {
                factory,
                name,
                connectors: Mutex::new(connectors),
                properties: Mutex::new(HashMap::new()),
                parent: Mutex::new(None),
                signals: Mutex::new(Vec::new()),
                pending_messages: Mutex::new(Vec::new()),
                next_dynamic_index: AtomicU32::new(0),
                next_request_index: AtomicU32::new(0),
                state: Mutex::new(State::Null),
                released: AtomicBool::new(false),
                registry,
            }
        });
        tracing::debug!("Created {} '{}'", factory.kind, inner.name);
        Node { inner }
    }

    pub(crate) fn from_inner(inner: Arc<NodeInner>) -> Node {
        Node { inner }
    }

    // ── Accessors ──

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kind(&self) -> &'static str {
        self.inner.factory.kind
    }

    pub(crate) fn factory(&self) -> &'static ElementFactory {
        self.inner.factory
    }

    pub fn state(&self) -> State {
        *lock(&self.inner.state)
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_released()
    }

    /// Name of the owning pipeline, if any.
    pub fn parent_name(&self) -> Option<String> {
        lock(&self.inner.parent)
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|p| p.name().to_string())
    }

    pub fn connectors(&self) -> Vec<Connector> {
        lock(&self.inner.connectors).clone()
    }

    /// Any existing connector named `name`.
    pub fn connector(&self, name: &str) -> Option<Connector> {
        lock(&self.inner.connectors)
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// An always-present connector by name, e.g. `"src"` or `"sink"`.
    pub fn static_connector(&self, name: &str) -> Option<Connector> {
        self.connector(name)
            .filter(|c| c.presence() == ConnectorPresence::Always)
    }

    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        lock(&self.inner.properties).get(key).cloned()
    }

    // ── Configuration ──

    /// Set a property. Unknown keys and values of the wrong type are reported
    /// as an `Error` on the owning pipeline's bus, not returned.
    pub fn set_property(&self, key: &str, value: impl Into<PropertyValue>) {
        let value = value.into();
        if self.is_released() {
            tracing::warn!("set_property('{}') on released node '{}'", key, self.name());
            return;
        }

        let Some(spec) = self.inner.factory.property(key) else {
            tracing::warn!("'{}' ({}) has no property '{}'", self.name(), self.kind(), key);
            self.post_message(Message::Error {
                source: self.name().to_string(),
                description: format!("No such property '{}'", key),
                debug: Some(format!(
                    "node '{}' of kind {} has no property named '{}'",
                    self.name(),
                    self.kind(),
                    key
                )),
            });
            return;
        };

        let Some(value) = value.clone().coerce(spec.kind) else {
            tracing::warn!(
                "Property '{}' on '{}' expects {:?}, got {}",
                key,
                self.name(),
                spec.kind,
                value
            );
            self.post_message(Message::Error {
                source: self.name().to_string(),
                description: format!("Could not set property '{}'", key),
                debug: Some(format!("expected {:?}, got {}", spec.kind, value)),
            });
            return;
        };

        if key == "caps" {
            self.apply_caps_property(value.as_str().unwrap_or_default());
        }
        tracing::debug!("{}.{} = {}", self.name(), key, value);
        lock(&self.inner.properties).insert(key.to_string(), value);
    }

    /// Filters restrict their fixed connectors; decoders restrict the
    /// connectors they will create.
    fn apply_caps_property(&self, caps: &str) {
        if self.inner.factory.has_dynamic_outputs() {
            return;
        }
        let caps = Caps::from_string(caps);
        for connector in lock(&self.inner.connectors).iter() {
            connector.set_caps(caps.clone());
        }
    }

    fn caps_for_template(&self, template: &ConnectorTemplate) -> Caps {
        let restricted = match template.presence {
            ConnectorPresence::Sometimes => self
                .property("caps")
                .and_then(|v| v.as_str().map(Caps::from_string)),
            _ => None,
        };
        match restricted {
            Some(caps) => template.caps().intersect(&caps),
            None => template.caps(),
        }
    }

    // ── Linking ──

    /// Link the first compatible pair of free connectors, requesting a new
    /// input on `dest` if it has request templates.
    pub fn link(&self, dest: &Node) -> Result<()> {
        self.ensure_live()?;
        dest.ensure_live()?;

        let outputs: Vec<Connector> = self
            .connectors()
            .into_iter()
            .filter(|c| c.direction() == ConnectorDirection::Output)
            .collect();

        let already_linked = outputs.iter().any(|c| {
            c.peer()
                .and_then(|p| p.parent())
                .is_some_and(|n| n == *dest)
        });
        if already_linked {
            return Ok(());
        }

        let free_outputs: Vec<Connector> =
            outputs.into_iter().filter(|c| !c.is_linked()).collect();
        let free_inputs: Vec<Connector> = dest
            .connectors()
            .into_iter()
            .filter(|c| c.direction() == ConnectorDirection::Input && !c.is_linked())
            .collect();

        for src in &free_outputs {
            for sink in &free_inputs {
                if src.link(sink) {
                    return Ok(());
                }
            }
        }

        let templates = dest
            .factory()
            .templates_with(ConnectorDirection::Input, ConnectorPresence::Request);
        for template in templates {
            for src in &free_outputs {
                if !src.caps().can_intersect(&template.caps()) {
                    continue;
                }
                let sink = dest.add_connector(template);
                if src.link(&sink) {
                    return Ok(());
                }
                dest.remove_connector(&sink);
            }
        }

        Err(BridgeError::IncompatibleCapabilities {
            src: self.name().to_string(),
            dest: dest.name().to_string(),
        })
    }

    /// Break every link from this node's outputs to `dest`.
    pub fn unlink(&self, dest: &Node) -> bool {
        let mut any = false;
        for connector in self.connectors() {
            let to_dest = connector
                .peer()
                .and_then(|p| p.parent())
                .is_some_and(|n| n == *dest);
            if to_dest {
                any |= connector.unlink();
            }
        }
        any
    }

    /// Create an input from a request template such as `"sink_%u"`.
    pub fn request_connector(&self, template: &str) -> Result<Connector> {
        self.ensure_live()?;
        let template = self
            .inner
            .factory
            .template(template)
            .filter(|t| t.presence == ConnectorPresence::Request)
            .ok_or_else(|| BridgeError::NoSuchConnector {
                node: self.name().to_string(),
                name: template.to_string(),
            })?;
        Ok(self.add_connector(template))
    }

    // ── Dynamic-connector signal ──

    /// Relay this node's pad-added events to the handler registered for `node_id`.
    ///
    /// Fails with [`BridgeError::DuplicateHandle`] while another live node is
    /// connected under the same `node_id`.
    pub fn connect_pad_added(&self, node_id: NodeId) -> Result<SignalHandlerId> {
        self.ensure_live()?;
        self.inner
            .registry
            .claim_pad_added(node_id, self.inner.claim_key())?;
        let connection = Arc::new(PadAddedConnection::new(
            node_id,
            Arc::clone(&self.inner.registry),
        ));
        let id = connection.handler_id();
        lock(&self.inner.signals).push(connection);
        tracing::debug!("'{}' pad-added connected to {}", self.name(), node_id);
        Ok(id)
    }

    /// Close one connection. Once this returns its handler is not running
    /// and will not run again through it.
    pub fn disconnect_pad_added(&self, handler_id: SignalHandlerId) -> bool {
        let removed = {
            let mut signals = lock(&self.inner.signals);
            signals
                .iter()
                .position(|c| c.handler_id() == handler_id)
                .map(|pos| signals.remove(pos))
        };
        match removed {
            Some(connection) => {
                connection.close();
                self.inner.registry.release_pad_added(
                    connection.node_id(),
                    self.inner.claim_key(),
                    false,
                );
                true
            }
            None => false,
        }
    }

    pub(crate) fn emit_pad_added(&self, connector: &Connector) {
        let connections = lock(&self.inner.signals).clone();
        if connections.is_empty() {
            tracing::debug!("'{}' added {} with nobody listening", self.name(), connector.name());
        }
        for connection in &connections {
            connection.emit(connector);
        }
    }

    // ── Engine-side operations ──

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_released() {
            Err(BridgeError::Released(self.name().to_string()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn set_parent(&self, pipeline: &Arc<PipelineShared>) -> Result<()> {
        self.ensure_live()?;
        let pending = {
            let mut parent = lock(&self.inner.parent);
            if let Some(existing) = parent.as_ref().and_then(Weak::upgrade) {
                return Err(BridgeError::AlreadyParented {
                    node: self.name().to_string(),
                    parent: existing.name().to_string(),
                });
            }
            *parent = Some(Arc::downgrade(pipeline));
            std::mem::take(&mut *lock(&self.inner.pending_messages))
        };
        for message in pending {
            pipeline.bus().post(message);
        }
        Ok(())
    }

    pub(crate) fn clear_parent(&self) {
        *lock(&self.inner.parent) = None;
    }

    pub(crate) fn is_child_of(&self, pipeline: &Arc<PipelineShared>) -> bool {
        lock(&self.inner.parent)
            .as_ref()
            .is_some_and(|p| p.as_ptr() == Arc::as_ptr(pipeline))
    }

    /// Post on the owning pipeline's bus, or hold until the node is added.
    pub(crate) fn post_message(&self, message: Message) {
        let parent = lock(&self.inner.parent);
        let pipeline = parent.as_ref().and_then(Weak::upgrade);
        match pipeline {
            Some(pipeline) => {
                drop(parent);
                pipeline.bus().post(message);
            }
            None => lock(&self.inner.pending_messages).push(message),
        }
    }

    pub(crate) fn set_state(&self, state: State) -> State {
        std::mem::replace(&mut *lock(&self.inner.state), state)
    }

    pub(crate) fn missing_required_property(&self) -> Option<&'static str> {
        let properties = lock(&self.inner.properties);
        self.inner
            .factory
            .required_properties()
            .find(|p| !properties.contains_key(p.name))
            .map(|p| p.name)
    }

    pub(crate) fn add_connector(&self, template: &ConnectorTemplate) -> Connector {
        let index = match template.presence {
            ConnectorPresence::Request => self.inner.next_request_index.fetch_add(1, Ordering::Relaxed),
            _ => self.inner.next_dynamic_index.fetch_add(1, Ordering::Relaxed),
        };
        let connector = Connector::new(
            template.instance_name(index),
            template.direction,
            template.presence,
            self.caps_for_template(template),
            Arc::downgrade(&self.inner),
        );
        lock(&self.inner.connectors).push(connector.clone());
        tracing::debug!("'{}' added connector {}", self.name(), connector.name());
        connector
    }

    pub(crate) fn remove_connector(&self, connector: &Connector) {
        connector.unlink();
        lock(&self.inner.connectors).retain(|c| !c.ptr_eq(connector));
    }

    /// Drop every sometimes-connector, so the next preroll announces them again.
    pub(crate) fn remove_dynamic_connectors(&self) {
        let removed: Vec<Connector> = {
            let mut connectors = lock(&self.inner.connectors);
            let (dynamic, fixed): (Vec<Connector>, Vec<Connector>) = connectors
                .drain(..)
                .partition(|c| c.presence() == ConnectorPresence::Sometimes);
            *connectors = fixed;
            dynamic
        };
        for connector in &removed {
            connector.unlink();
        }
        self.inner.next_dynamic_index.store(0, Ordering::Relaxed);
    }

    pub(crate) fn release(&self) {
        self.inner.release();
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.inner.name)
            .field("kind", &self.inner.factory.kind)
            .field("state", &self.state())
            .field("released", &self.is_released())
            .finish()
    }
}
