//! Per-pipeline message bus.
//!
//! A FIFO fed by the streaming thread and by nodes. Either a bus watch drains
//! it on its pump thread, or the caller polls it with `pop`/`timed_pop`.
//! Polling a watched bus yields nothing; the watch owns every message.

use crate::engine::message::Message;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct BusInner {
    owner: String,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    flushing: AtomicBool,
    watched: AtomicBool,
}

/// Cloneable handle to a pipeline's bus.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    pub(crate) fn new(owner: impl Into<String>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            inner: Arc::new(BusInner {
                owner: owner.into(),
                tx,
                rx,
                flushing: AtomicBool::new(false),
                watched: AtomicBool::new(false),
            }),
        }
    }

    /// Name of the pipeline that owns this bus.
    pub fn owner(&self) -> &str {
        &self.inner.owner
    }

    /// Queue a message. Returns false if the bus is flushing.
    pub fn post(&self, message: Message) -> bool {
        if self.inner.flushing.load(Ordering::Acquire) {
            tracing::trace!(
                "Bus '{}' flushing, dropped {}",
                self.inner.owner,
                message.type_name()
            );
            return false;
        }
        self.inner.tx.send(message).is_ok()
    }

    pub fn have_pending(&self) -> bool {
        !self.inner.rx.is_empty()
    }

    /// Next queued message. Always `None` while a watch is installed.
    pub fn pop(&self) -> Option<Message> {
        if self.is_watched() {
            tracing::trace!("Bus '{}' is watched, pop ignored", self.inner.owner);
            return None;
        }
        self.inner.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for a message. Returns `None` at once while a
    /// watch is installed.
    pub fn timed_pop(&self, timeout: Duration) -> Option<Message> {
        if self.is_watched() {
            tracing::trace!("Bus '{}' is watched, timed_pop ignored", self.inner.owner);
            return None;
        }
        self.inner.rx.recv_timeout(timeout).ok()
    }

    pub fn is_watched(&self) -> bool {
        self.inner.watched.load(Ordering::Acquire)
    }

    pub(crate) fn set_watched(&self, watched: bool) {
        self.inner.watched.store(watched, Ordering::Release);
    }

    /// While flushing, posts are refused and queued messages are discarded.
    pub fn set_flushing(&self, flushing: bool) {
        self.inner.flushing.store(flushing, Ordering::Release);
        if flushing {
            let dropped = self.inner.rx.try_iter().count();
            if dropped > 0 {
                tracing::debug!("Bus '{}' flushed {} messages", self.inner.owner, dropped);
            }
        }
    }

    pub(crate) fn receiver(&self) -> Receiver<Message> {
        self.inner.rx.clone()
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("owner", &self.inner.owner)
            .field("pending", &self.inner.rx.len())
            .field("watched", &self.is_watched())
            .finish()
    }
}
