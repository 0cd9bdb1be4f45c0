//! Bus watch: drains one pipeline's bus and delivers occurrences.
//!
//! The watch owns a pump thread that blocks on the bus FIFO and hands each
//! message to a [`BusDispatcher`]. Messages are delivered in the order they
//! were posted. Removing the watch closes its callback context first (the
//! teardown barrier), then stops and joins the pump.
//!
//! A watch holds the registry claim on its pipeline ID for its whole life,
//! so no other pipeline can watch under the same ID meanwhile.

use crate::config::{BusConfig, DiagnosticsConfig};
use crate::dispatch::context::{CallbackContext, CallbackSource};
use crate::dispatch::diagnostics::format_error;
use crate::dispatch::occurrence::Occurrence;
use crate::dispatch::registry::HandleRegistry;
use crate::engine::bus::Bus;
use crate::engine::message::Message;
use crate::error::Result;
use crate::graph::id::PipelineId;
use crossbeam_channel::{bounded, select, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// External handler for a pipeline's occurrences.
///
/// Invoked from the bus pump thread, never from the caller's thread. It must
/// be safe to call from an arbitrary thread, or hand the occurrence off to a
/// queue of its own.
#[cfg_attr(test, mockall::automock)]
pub trait BusHandler: Send + Sync {
    fn on_bus_occurrence(&self, occurrence: &Occurrence, pipeline_id: PipelineId);
}

impl<F> BusHandler for F
where
    F: Fn(&Occurrence, PipelineId) + Send + Sync,
{
    fn on_bus_occurrence(&self, occurrence: &Occurrence, pipeline_id: PipelineId) {
        self(occurrence, pipeline_id)
    }
}

/// Classifies bus messages and forwards them under one pipeline ID.
pub struct BusDispatcher {
    context: Arc<CallbackContext>,
    registry: Arc<HandleRegistry>,
    diagnostics: DiagnosticsConfig,
}

impl BusDispatcher {
    pub fn new(
        context: Arc<CallbackContext>,
        registry: Arc<HandleRegistry>,
        diagnostics: DiagnosticsConfig,
    ) -> Self {
        Self {
            context,
            registry,
            diagnostics,
        }
    }

    pub fn pipeline_id(&self) -> PipelineId {
        PipelineId(self.context.id())
    }

    /// Deliver one message. Returns true if a handler was invoked.
    pub fn dispatch(&self, message: &Message) -> bool {
        let Some(_guard) = self.context.enter() else {
            return false;
        };
        let Some(occurrence) = Occurrence::classify(message) else {
            tracing::trace!(
                "Dropped {} from '{}'",
                message.type_name(),
                message.source()
            );
            return false;
        };

        if let Occurrence::Error {
            description, debug, ..
        } = &occurrence
        {
            if self.diagnostics.forward_errors {
                let text = format_error(
                    description,
                    debug.as_deref(),
                    self.diagnostics.include_debug_info,
                );
                self.registry.diagnostic(&text);
            }
        }

        self.registry
            .deliver_bus_occurrence(&occurrence, self.pipeline_id())
    }
}

/// An installed watch on one pipeline's bus.
pub struct BusWatch {
    context: Arc<CallbackContext>,
    registry: Arc<HandleRegistry>,
    bus: Bus,
    shutdown_tx: Sender<()>,
    pump: Option<JoinHandle<()>>,
    claimed: bool,
}

impl BusWatch {
    pub fn install(
        bus: &Bus,
        pipeline_id: PipelineId,
        registry: Arc<HandleRegistry>,
        bus_config: &BusConfig,
        diagnostics: DiagnosticsConfig,
    ) -> Result<Self> {
        registry.claim_watch(pipeline_id)?;

        let context = CallbackContext::new(pipeline_id.0, CallbackSource::BusWatch);
        let dispatcher =
            BusDispatcher::new(Arc::clone(&context), Arc::clone(&registry), diagnostics);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let messages = bus.receiver();
        let gate = Arc::clone(&context);

        let spawned = thread::Builder::new()
            .name(format!("{}{}", bus_config.pump_thread_name_prefix, pipeline_id.0))
            .spawn(move || loop {
                // Closed from inside a handler: stop before taking another message.
                if gate.is_closed() {
                    break;
                }
                select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(messages) -> msg => match msg {
                        Ok(msg) => {
                            dispatcher.dispatch(&msg);
                        }
                        Err(_) => break,
                    },
                }
            });
        let pump = match spawned {
            Ok(pump) => pump,
            Err(e) => {
                registry.release_watch(pipeline_id, false);
                return Err(e.into());
            }
        };

        bus.set_watched(true);
        tracing::debug!("Bus watch installed on '{}' as {}", bus.owner(), pipeline_id);
        Ok(Self {
            context,
            registry,
            bus: bus.clone(),
            shutdown_tx,
            pump: Some(pump),
            claimed: true,
        })
    }

    pub fn pipeline_id(&self) -> PipelineId {
        PipelineId(self.context.id())
    }

    /// Stop delivering and give up the claim on the pipeline ID, also
    /// unregistering its handler when `unregister` is set. When this returns,
    /// no handler call through this watch is running or will start, except
    /// one the calling thread is itself inside.
    pub fn remove(mut self, unregister: bool) {
        self.shutdown(unregister);
    }

    fn shutdown(&mut self, unregister: bool) {
        self.context.close();
        if std::mem::take(&mut self.claimed) {
            self.registry.release_watch(self.pipeline_id(), unregister);
        }
        let _ = self.shutdown_tx.try_send(());
        if let Some(pump) = self.pump.take() {
            if pump.thread().id() != thread::current().id() && pump.join().is_err() {
                tracing::warn!("Bus pump for {} panicked", self.pipeline_id());
            }
            // From inside a handler the pump exits once the handler returns.
            self.bus.set_watched(false);
        }
    }
}

impl Drop for BusWatch {
    fn drop(&mut self) {
        self.shutdown(false);
    }
}

impl std::fmt::Debug for BusWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusWatch")
            .field("pipeline_id", &self.pipeline_id())
            .field("closed", &self.context.is_closed())
            .finish()
    }
}
