//! Per-pipeline streaming thread.
//!
//! State changes and EOS requests are queued here and executed in order,
//! off the caller's thread. Each step:
//! 1. Update the children and post their state changes.
//! 2. Do the step's work (preroll, clock, reset).
//! 3. Commit the pipeline state and post its state change.
//!
//! Pad-added handlers run on this thread.

use crate::config::EngineConfig;
use crate::engine::message::Message;
use crate::graph::connector::{ConnectorDirection, ConnectorPresence};
use crate::graph::node::Node;
use crate::pipeline::state::State;
use crate::pipeline::PipelineShared;
use crossbeam_channel::{unbounded, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
    SetState(State),
    SendEos,
    Shutdown,
}

pub(crate) struct StreamingThread {
    tx: Sender<Request>,
    handle: Option<JoinHandle<()>>,
}

impl StreamingThread {
    pub(crate) fn spawn(shared: Arc<PipelineShared>, config: EngineConfig) -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let name = format!("{}{}", config.streaming_thread_name_prefix, shared.name());

        let handle = thread::Builder::new().name(name).spawn(move || {
            let streamer = Streamer { shared, config };
            for request in rx.iter() {
                match request {
                    Request::SetState(target) => streamer.change_state(target),
                    Request::SendEos => streamer.send_eos(),
                    Request::Shutdown => break,
                }
            }
            tracing::debug!("Streaming thread for '{}' exiting", streamer.shared.name());
        })?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Queue a request. False once the thread has stopped.
    pub(crate) fn request(&self, request: Request) -> bool {
        self.tx.send(request).is_ok()
    }

    /// Finish queued requests, then stop. Joins unless called from the
    /// streaming thread itself.
    pub(crate) fn shutdown(&mut self) {
        let _ = self.tx.send(Request::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("Streaming thread panicked");
            }
        }
    }
}

struct Streamer {
    shared: Arc<PipelineShared>,
    config: EngineConfig,
}

impl Streamer {
    fn change_state(&self, target: State) {
        let mut state = self.shared.current_state();
        if state == target {
            tracing::trace!("'{}' already {}", self.shared.name(), target);
            return;
        }
        self.shared.set_pending(Some(target));
        tracing::info!("'{}' changing state {} -> {}", self.shared.name(), state, target);

        while let Some(next) = state.step_toward(target) {
            pause(self.config.state_change_delay());

            let children = self.shared.children();
            let completed = match (state, next) {
                (State::Null, State::Paused) => self.preroll(&children),
                (State::Paused, State::Playing) => {
                    self.set_children_state(&children, State::Playing);
                    self.shared.post(Message::NewClock {
                        source: self.shared.name().to_string(),
                    });
                    self.shared.post(Message::StreamStart {
                        source: self.shared.name().to_string(),
                    });
                    true
                }
                (State::Playing, State::Paused) => {
                    self.set_children_state(&children, State::Paused);
                    true
                }
                (State::Paused, State::Null) => {
                    self.set_children_state(&children, State::Null);
                    for child in &children {
                        child.remove_dynamic_connectors();
                    }
                    true
                }
                _ => true,
            };

            if !completed {
                self.shared.set_pending(None);
                tracing::warn!("'{}' failed to reach {}", self.shared.name(), next);
                return;
            }

            let pending = (next != target).then_some(target);
            self.shared.commit_state(next, pending);
            self.shared.post(Message::StateChanged {
                source: self.shared.name().to_string(),
                old: state,
                new: next,
                pending,
            });
            state = next;

            if next == State::Playing && self.shared.take_deferred_eos() {
                self.post_eos();
            }
        }
    }

    /// NULL -> PAUSED. False if a child cannot leave NULL.
    fn preroll(&self, children: &[Node]) -> bool {
        for child in children {
            if let Some(property) = child.missing_required_property() {
                tracing::warn!("'{}' cannot start: '{}' is not set", child.name(), property);
                self.shared.post(Message::Error {
                    source: child.name().to_string(),
                    description: "Resource not found.".to_string(),
                    debug: Some(format!(
                        "{}: required property '{}' is not set",
                        child.name(),
                        property
                    )),
                });
                return false;
            }
        }

        self.set_children_state(children, State::Paused);

        for child in children {
            let templates =
                child
                    .factory()
                    .templates_with(ConnectorDirection::Output, ConnectorPresence::Sometimes);
            for template in templates {
                pause(self.config.dynamic_pad_delay());
                let connector = child.add_connector(template);
                child.emit_pad_added(&connector);
                if !connector.is_linked() {
                    self.shared.post(Message::Warning {
                        source: child.name().to_string(),
                        description: format!("Connector {} was not linked", connector.name()),
                    });
                }
            }

            if child.factory().posts_buffering {
                for &percent in &self.config.buffering_steps {
                    self.shared.post(Message::Buffering {
                        source: child.name().to_string(),
                        percent,
                    });
                }
            }
        }

        for child in children {
            let unlinked = child.connectors().into_iter().filter(|c| {
                c.direction() == ConnectorDirection::Output
                    && c.presence() == ConnectorPresence::Always
                    && !c.is_linked()
            });
            for connector in unlinked {
                self.shared.post(Message::Error {
                    source: child.name().to_string(),
                    description: "Internal data stream error.".to_string(),
                    debug: Some(format!(
                        "streaming stopped, reason not-linked ({})",
                        connector.full_name()
                    )),
                });
            }
        }

        self.shared.post(Message::AsyncDone {
            source: self.shared.name().to_string(),
        });
        true
    }

    fn set_children_state(&self, children: &[Node], state: State) {
        for child in children {
            let old = child.set_state(state);
            if old != state {
                self.shared.post(Message::StateChanged {
                    source: child.name().to_string(),
                    old,
                    new: state,
                    pending: None,
                });
            }
        }
    }

    fn send_eos(&self) {
        match self.shared.current_state() {
            State::Null => {
                tracing::debug!("EOS on '{}' ignored in NULL", self.shared.name());
            }
            State::Paused => {
                if self.shared.defer_eos() {
                    tracing::debug!("EOS on '{}' deferred until PLAYING", self.shared.name());
                }
            }
            State::Playing => {
                if self.shared.mark_eos_sent() {
                    self.post_eos();
                } else {
                    tracing::debug!("EOS on '{}' already sent", self.shared.name());
                }
            }
        }
    }

    fn post_eos(&self) {
        tracing::info!("'{}' reached end of stream", self.shared.name());
        self.shared.post(Message::Eos {
            source: self.shared.name().to_string(),
        });
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
