//! Connectors: directional attachment points on a node.
//!
//! A connector holds a weak reference to its node and to its peer, so a
//! caller holding a `Connector` never keeps a released node alive. All link
//! and unlink operations are serialized by one process-wide lock.

use crate::engine::caps::Caps;
use crate::graph::node::{Node, NodeInner};
use crate::sync::lock;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

static LINK_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorDirection {
    /// Data flows into the node.
    Input,
    /// Data flows out of the node.
    Output,
}

impl fmt::Display for ConnectorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorDirection::Input => write!(f, "sink"),
            ConnectorDirection::Output => write!(f, "src"),
        }
    }
}

/// When a connector exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorPresence {
    /// Created with the node.
    Always,
    /// Appears while the node negotiates its stream format.
    Sometimes,
    /// Created on demand from a template.
    Request,
}

/// Why a connector link was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkRefusal {
    WrongDirection,
    SameNode,
    Released,
    AlreadyLinkedTogether,
    LinkedElsewhere,
    HierarchyMismatch,
    NoCommonFormat,
}

impl fmt::Display for LinkRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            LinkRefusal::WrongDirection => "wrong direction",
            LinkRefusal::SameNode => "both connectors are on the same node",
            LinkRefusal::Released => "node released",
            LinkRefusal::AlreadyLinkedTogether => "already linked",
            LinkRefusal::LinkedElsewhere => "a connector is already linked elsewhere",
            LinkRefusal::HierarchyMismatch => "nodes are in different pipelines",
            LinkRefusal::NoCommonFormat => "no common format",
        };
        f.write_str(reason)
    }
}

pub(crate) struct ConnectorInner {
    name: String,
    direction: ConnectorDirection,
    presence: ConnectorPresence,
    caps: Mutex<Caps>,
    parent: Weak<NodeInner>,
    peer: Mutex<Weak<ConnectorInner>>,
}

/// Handle to a connector. Clones refer to the same connector.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<ConnectorInner>,
}

impl Connector {
    pub(crate) fn new(
        name: String,
        direction: ConnectorDirection,
        presence: ConnectorPresence,
        caps: Caps,
        parent: Weak<NodeInner>,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectorInner {
                name,
                direction,
                presence,
                caps: Mutex::new(caps),
                parent,
                peer: Mutex::new(Weak::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn direction(&self) -> ConnectorDirection {
        self.inner.direction
    }

    pub fn presence(&self) -> ConnectorPresence {
        self.inner.presence
    }

    pub fn caps(&self) -> Caps {
        lock(&self.inner.caps).clone()
    }

    pub(crate) fn set_caps(&self, caps: Caps) {
        *lock(&self.inner.caps) = caps;
    }

    /// The owning node, unless it has been dropped.
    pub fn parent(&self) -> Option<Node> {
        self.inner.parent.upgrade().map(Node::from_inner)
    }

    /// `node:connector`, for log lines.
    pub fn full_name(&self) -> String {
        match self.inner.parent.upgrade() {
            Some(node) => format!("{}:{}", node.name(), self.inner.name),
            None => format!("<gone>:{}", self.inner.name),
        }
    }

    pub fn is_linked(&self) -> bool {
        lock(&self.inner.peer).strong_count() > 0
    }

    pub fn peer(&self) -> Option<Connector> {
        lock(&self.inner.peer)
            .upgrade()
            .map(|inner| Connector { inner })
    }

    /// Link this output connector to `dest`, an input connector on another node.
    ///
    /// Returns whether the link exists afterwards. Relinking the same pair
    /// returns `true`; a refused link is an ordinary outcome, not an error.
    pub fn link(&self, dest: &Connector) -> bool {
        // Keep both nodes alive past the guard: a last drop inside it would
        // re-enter LINK_LOCK through release.
        let src_node = self.inner.parent.upgrade();
        let dest_node = dest.inner.parent.upgrade();

        let _serial = lock(&LINK_LOCK);
        let outcome = match (&src_node, &dest_node) {
            (Some(src_node), Some(dest_node)) => self.check_link(dest, src_node, dest_node),
            _ => Err(LinkRefusal::Released),
        };
        match outcome {
            Ok(()) => {
                *lock(&self.inner.peer) = Arc::downgrade(&dest.inner);
                *lock(&dest.inner.peer) = Arc::downgrade(&self.inner);
                tracing::debug!("Linked {} -> {}", self.full_name(), dest.full_name());
                true
            }
            Err(LinkRefusal::AlreadyLinkedTogether) => true,
            Err(reason) => {
                tracing::debug!(
                    "Link {} -> {} refused: {}",
                    self.full_name(),
                    dest.full_name(),
                    reason
                );
                false
            }
        }
    }

    /// Break this connector's link. Returns false if it was not linked.
    pub fn unlink(&self) -> bool {
        let _node = self.inner.parent.upgrade();
        let _serial = lock(&LINK_LOCK);

        let peer = std::mem::take(&mut *lock(&self.inner.peer));
        match peer.upgrade() {
            Some(peer) => {
                *lock(&peer.peer) = Weak::new();
                tracing::debug!("Unlinked {} from {}", self.full_name(), peer.name);
                true
            }
            None => false,
        }
    }

    fn check_link(
        &self,
        dest: &Connector,
        src_node: &Arc<NodeInner>,
        dest_node: &Arc<NodeInner>,
    ) -> Result<(), LinkRefusal> {
        if self.direction() != ConnectorDirection::Output
            || dest.direction() != ConnectorDirection::Input
        {
            return Err(LinkRefusal::WrongDirection);
        }
        if Arc::ptr_eq(src_node, dest_node) {
            return Err(LinkRefusal::SameNode);
        }
        if src_node.is_released() || dest_node.is_released() {
            return Err(LinkRefusal::Released);
        }

        let src_peer = lock(&self.inner.peer).upgrade();
        let dest_peer = lock(&dest.inner.peer).upgrade();
        if let Some(peer) = &src_peer {
            if Arc::ptr_eq(peer, &dest.inner) {
                return Err(LinkRefusal::AlreadyLinkedTogether);
            }
        }
        if src_peer.is_some() || dest_peer.is_some() {
            return Err(LinkRefusal::LinkedElsewhere);
        }

        if !src_node.shares_parent_with(dest_node) {
            return Err(LinkRefusal::HierarchyMismatch);
        }
        if !self.caps().can_intersect(&dest.caps()) {
            return Err(LinkRefusal::NoCommonFormat);
        }
        Ok(())
    }

    pub(crate) fn ptr_eq(&self, other: &Connector) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Connector {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Connector {}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("name", &self.full_name())
            .field("direction", &self.inner.direction)
            .field("presence", &self.inner.presence)
            .field("linked", &self.is_linked())
            .finish()
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
