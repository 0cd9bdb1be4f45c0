//! Event delivery from engine threads to external handlers.
//!
//! - [`bus_watch`] relays a pipeline's bus occurrences by pipeline ID.
//! - [`pad_signal`] relays dynamic-connector appearances by node ID.
//! - [`registry`] is the shared ID-to-handler table both resolve through.
//! - [`context`] holds the per-registration teardown barrier.

pub mod bus_watch;
pub mod context;
pub mod diagnostics;
pub mod occurrence;
pub mod pad_signal;
pub mod registry;

pub use bus_watch::{BusDispatcher, BusHandler, BusWatch};
pub use context::{CallbackContext, CallbackSource, DeliveryGuard};
pub use diagnostics::{DiagnosticSink, TracingDiagnostics};
pub use occurrence::Occurrence;
pub use pad_signal::{PadAddedConnection, PadAddedHandler};
pub use registry::HandleRegistry;
