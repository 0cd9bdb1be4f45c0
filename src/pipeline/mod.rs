//! Pipelines: a set of child nodes driven through one lifecycle.
//!
//! All transition requests are queued on the pipeline's streaming thread and
//! return immediately. Completion is reported as `StateChanged` occurrences on
//! the bus; failures arrive as `Error` occurrences. Nothing here fails
//! synchronously except graph bookkeeping (adding, removing, watching).
//!
//! Teardown (`destroy` or drop) runs in this order:
//! 1. Return to NULL and join the streaming thread.
//! 2. Remove the bus watch. No bus handler runs after this.
//! 3. Release every child, closing its pad-added connections.
//! 4. Flush the bus.

pub mod state;

use crate::config::{BusConfig, DiagnosticsConfig, RewatchPolicy};
use crate::dispatch::bus_watch::BusWatch;
use crate::dispatch::registry::HandleRegistry;
use crate::engine::bus::Bus;
use crate::engine::message::Message;
use crate::engine::streaming::{Request, StreamingThread};
use crate::error::{BridgeError, Result, ResultExt};
use crate::graph::id::PipelineId;
use crate::graph::node::Node;
use crate::sync::lock;
use state::State;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct StateSnapshot {
    current: State,
    pending: Option<State>,
    eos_sent: bool,
    eos_deferred: bool,
}

/// Pipeline state shared with its streaming thread and, weakly, its children.
pub(crate) struct PipelineShared {
    name: String,
    bus: Bus,
    children: Mutex<Vec<Node>>,
    state: Mutex<StateSnapshot>,
}

impl PipelineShared {
    fn new(name: String) -> Self {
        Self {
            bus: Bus::new(name.clone()),
            name,
            children: Mutex::new(Vec::new()),
            state: Mutex::new(StateSnapshot::default()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.bus
    }

    pub(crate) fn children(&self) -> Vec<Node> {
        lock(&self.children).clone()
    }

    pub(crate) fn post(&self, message: Message) {
        self.bus.post(message);
    }

    pub(crate) fn current_state(&self) -> State {
        lock(&self.state).current
    }

    pub(crate) fn set_pending(&self, pending: Option<State>) {
        lock(&self.state).pending = pending;
    }

    pub(crate) fn commit_state(&self, current: State, pending: Option<State>) {
        let mut state = lock(&self.state);
        state.current = current;
        state.pending = pending;
        if current == State::Null {
            state.eos_sent = false;
            state.eos_deferred = false;
        }
    }

    /// Remember an EOS requested in PAUSED. False if one is already sent or waiting.
    pub(crate) fn defer_eos(&self) -> bool {
        let mut state = lock(&self.state);
        if state.eos_sent || state.eos_deferred {
            return false;
        }
        state.eos_deferred = true;
        true
    }

    pub(crate) fn take_deferred_eos(&self) -> bool {
        let mut state = lock(&self.state);
        if state.eos_deferred && !state.eos_sent {
            state.eos_deferred = false;
            state.eos_sent = true;
            return true;
        }
        false
    }

    /// Claim the one EOS this run may send.
    pub(crate) fn mark_eos_sent(&self) -> bool {
        let mut state = lock(&self.state);
        if state.eos_sent {
            return false;
        }
        state.eos_sent = true;
        state.eos_deferred = false;
        true
    }
}

/// A pipeline and its engine-side threads.
pub struct Pipeline {
    shared: Arc<PipelineShared>,
    streaming: StreamingThread,
    watch: Option<BusWatch>,
    registry: Arc<HandleRegistry>,
    bus_config: BusConfig,
    diagnostics: DiagnosticsConfig,
    destroyed: bool,
}

impl Pipeline {
    /// Create an empty pipeline in NULL. An empty name is replaced by `pipeline<n>`.
    pub fn new(name: &str) -> Result<Pipeline> {
        let engine = crate::engine::get()?;
        let name = if name.is_empty() {
            engine.next_instance_name("pipeline")
        } else {
            name.to_string()
        };

        let shared = Arc::new(PipelineShared::new(name));
        let streaming = StreamingThread::spawn(Arc::clone(&shared), engine.config().engine.clone())
            .map_err(BridgeError::from)
            .with_context(|| format!("Failed to start streaming thread for '{}'", shared.name()))?;

        tracing::info!("Created pipeline '{}'", shared.name());
        Ok(Pipeline {
            shared,
            streaming,
            watch: None,
            registry: engine.registry(),
            bus_config: engine.config().bus.clone(),
            diagnostics: engine.config().diagnostics.clone(),
            destroyed: false,
        })
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// The bus, for posting or for polling when no watch is installed.
    pub fn bus(&self) -> Bus {
        self.shared.bus().clone()
    }

    /// Last state the streaming thread committed.
    pub fn state(&self) -> State {
        self.shared.current_state()
    }

    /// Target of the transition in progress, if any.
    pub fn pending_state(&self) -> Option<State> {
        lock(&self.shared.state).pending
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.shared.children()
    }

    // ── Graph ──

    /// Take ownership of `node`. It is released when this pipeline is torn down.
    pub fn add_node(&self, node: &Node) -> Result<()> {
        node.set_parent(&self.shared)?;
        lock(&self.shared.children).push(node.clone());
        tracing::debug!("Added '{}' to '{}'", node.name(), self.name());
        Ok(())
    }

    /// Hand `node` back to the caller, unlinked and in NULL.
    pub fn remove_node(&self, node: &Node) -> Result<()> {
        if !node.is_child_of(&self.shared) {
            return Err(BridgeError::WrongParent {
                node: node.name().to_string(),
                pipeline: self.name().to_string(),
            });
        }
        lock(&self.shared.children).retain(|c| c != node);
        for connector in node.connectors() {
            connector.unlink();
        }
        node.remove_dynamic_connectors();
        node.set_state(State::Null);
        node.clear_parent();
        tracing::debug!("Removed '{}' from '{}'", node.name(), self.name());
        Ok(())
    }

    // ── Lifecycle requests ──

    pub fn start(&self) {
        self.request(Request::SetState(State::Playing));
    }

    pub fn pause(&self) {
        self.request(Request::SetState(State::Paused));
    }

    pub fn stop(&self) {
        self.request(Request::SetState(State::Null));
    }

    pub fn send_eos(&self) {
        self.request(Request::SendEos);
    }

    fn request(&self, request: Request) {
        if !self.streaming.request(request) {
            tracing::warn!("'{}' dropped {:?}: streaming thread gone", self.name(), request);
        }
    }

    // ── Bus watch ──

    /// Deliver this pipeline's occurrences to the bus handler registered
    /// under `pipeline_id`, from a dedicated pump thread.
    ///
    /// A second call replaces the watch, or fails with
    /// [`BridgeError::WatchAlreadyInstalled`] under [`RewatchPolicy::Reject`].
    /// It also fails, leaving any current watch in place, when another
    /// pipeline is watching under `pipeline_id`.
    pub fn watch_bus(&mut self, pipeline_id: PipelineId) -> Result<()> {
        if let Some(existing) = &self.watch {
            if self.bus_config.rewatch_policy == RewatchPolicy::Reject {
                return Err(BridgeError::WatchAlreadyInstalled(existing.pipeline_id().0));
            }
            let previous = existing.pipeline_id();
            if previous != pipeline_id && self.registry.is_watch_claimed(pipeline_id) {
                return Err(BridgeError::WatchAlreadyInstalled(pipeline_id.0));
            }
            self.remove_watch(previous != pipeline_id);
            tracing::debug!("'{}' replacing watch {} with {}", self.name(), previous, pipeline_id);
        }

        let watch = BusWatch::install(
            self.shared.bus(),
            pipeline_id,
            Arc::clone(&self.registry),
            &self.bus_config,
            self.diagnostics.clone(),
        )?;
        self.watch = Some(watch);
        Ok(())
    }

    /// Remove the watch and its handler registration. False if none was installed.
    pub fn unwatch_bus(&mut self) -> bool {
        self.remove_watch(true)
    }

    pub fn watched_id(&self) -> Option<PipelineId> {
        self.watch.as_ref().map(BusWatch::pipeline_id)
    }

    pub fn set_rewatch_policy(&mut self, policy: RewatchPolicy) {
        self.bus_config.rewatch_policy = policy;
    }

    fn remove_watch(&mut self, unregister: bool) -> bool {
        let Some(watch) = self.watch.take() else {
            return false;
        };
        watch.remove(unregister);
        true
    }

    // ── Teardown ──

    /// Tear the pipeline down now. Dropping it does the same.
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        self.streaming.request(Request::SetState(State::Null));
        self.streaming.shutdown();

        self.remove_watch(true);

        let children = std::mem::take(&mut *lock(&self.shared.children));
        for child in &children {
            child.release();
        }

        self.shared.bus().set_flushing(true);
        tracing::info!("Destroyed pipeline '{}'", self.name());
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("children", &lock(&self.shared.children).len())
            .field("watch", &self.watched_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eos_claimed_once_per_run() {
        let shared = PipelineShared::new("p".to_string());
        assert!(shared.mark_eos_sent());
        assert!(!shared.mark_eos_sent());
        assert!(!shared.defer_eos());

        shared.commit_state(State::Null, None);
        assert!(shared.defer_eos());
        assert!(!shared.defer_eos());
        assert!(shared.take_deferred_eos());
        assert!(!shared.take_deferred_eos());
        assert!(!shared.mark_eos_sent());
    }

    #[test]
    fn test_commit_tracks_pending() {
        let shared = PipelineShared::new("p".to_string());
        shared.set_pending(Some(State::Playing));
        shared.commit_state(State::Paused, Some(State::Playing));
        assert_eq!(shared.current_state(), State::Paused);
        assert_eq!(lock(&shared.state).pending, Some(State::Playing));
        shared.commit_state(State::Playing, None);
        assert_eq!(lock(&shared.state).pending, None);
    }
}
