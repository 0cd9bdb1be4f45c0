//! Callback contexts and the teardown barrier.
//!
//! A [`CallbackContext`] binds an integer handle to the source that delivers
//! on its behalf. Every delivery holds a [`DeliveryGuard`] for its duration.
//! [`CallbackContext::close`] refuses new deliveries and blocks until the
//! in-flight ones have returned, so once it returns nothing can reach the
//! handler through this context again.
//!
//! A handler may tear down its own pipeline from inside a delivery. The
//! deliveries the closing thread is itself nested in are not waited for,
//! otherwise the barrier would wait on its own stack frame.

use crate::sync::lock;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Which bridge a context belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackSource {
    BusWatch,
    PadAdded,
}

impl fmt::Display for CallbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackSource::BusWatch => write!(f, "bus-watch"),
            CallbackSource::PadAdded => write!(f, "pad-added"),
        }
    }
}

#[derive(Default)]
struct Gate {
    closed: bool,
    in_flight: usize,
}

thread_local! {
    /// Contexts the current thread is delivering through, innermost last.
    static ACTIVE: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

pub struct CallbackContext {
    id: i32,
    source: CallbackSource,
    gate: Mutex<Gate>,
    idle: Condvar,
}

impl CallbackContext {
    pub fn new(id: i32, source: CallbackSource) -> Arc<Self> {
        Arc::new(Self {
            id,
            source,
            gate: Mutex::new(Gate::default()),
            idle: Condvar::new(),
        })
    }

    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    #[inline]
    pub fn source(&self) -> CallbackSource {
        self.source
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.gate).closed
    }

    /// Begin a delivery. `None` once the context is closed.
    pub fn enter(self: &Arc<Self>) -> Option<DeliveryGuard> {
        {
            let mut gate = lock(&self.gate);
            if gate.closed {
                return None;
            }
            gate.in_flight += 1;
        }
        ACTIVE.with(|active| active.borrow_mut().push(self.key()));
        Some(DeliveryGuard {
            context: Arc::clone(self),
        })
    }

    /// Refuse further deliveries and wait for the in-flight ones to finish.
    pub fn close(&self) {
        let key = self.key();
        let own = ACTIVE.with(|active| active.borrow().iter().filter(|&&k| k == key).count());

        let mut gate = lock(&self.gate);
        gate.closed = true;
        while gate.in_flight > own {
            gate = self
                .idle
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(gate);

        tracing::trace!("{} context {} closed", self.source, self.id);
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }
}

impl fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gate = lock(&self.gate);
        f.debug_struct("CallbackContext")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("closed", &gate.closed)
            .field("in_flight", &gate.in_flight)
            .finish()
    }
}

/// Held for the duration of one delivery.
pub struct DeliveryGuard {
    context: Arc<CallbackContext>,
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        let key = self.context.key();
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|&k| k == key) {
                active.remove(pos);
            }
        });

        let mut gate = lock(&self.context.gate);
        gate.in_flight -= 1;
        drop(gate);
        self.context.idle.notify_all();
    }
}
