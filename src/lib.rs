//! # mediabridge-rs: control-plane bridge for a streaming-media engine
//!
//! Builds a graph of processing nodes, drives it through the
//! `NULL -> PAUSED -> PLAYING` lifecycle, and relays what the engine's own
//! threads report back to handlers identified by plain integers.
//!
//! ## Architecture
//!
//! - **Graph**: nodes and their connectors, created from the engine's factories
//! - **Pipeline**: owns child nodes; transitions run on a per-pipeline streaming thread
//! - **Dispatch**: bus watches and pad-added connections resolve handlers through a
//!   shared [`HandleRegistry`]; every registration carries a teardown barrier
//! - **Communication**: crossbeam channels between the caller, the streaming
//!   thread and the bus pump thread
//!
//! ## Threading
//!
//! Bus handlers run on the pipeline's bus pump thread. Pad-added handlers run on
//! the pipeline's streaming thread. Within one pipeline, occurrences arrive in
//! the order they were posted; nothing is ordered across pipelines.
//!
//! ## Example
//!
//! ```ignore
//! use mediabridge_rs::{Connector, NodeId, Occurrence, PipelineId};
//!
//! mediabridge_rs::init();
//!
//! let source = mediabridge_rs::create_node("source", None)?;
//! let decoder = mediabridge_rs::create_node("decoder", None)?;
//! let sink = mediabridge_rs::create_node("sink", None)?;
//! mediabridge_rs::link_nodes(&source, &decoder)?;
//!
//! let mut pipeline = mediabridge_rs::create_pipeline("demo")?;
//! for node in [&source, &decoder, &sink] {
//!     mediabridge_rs::add_node(&pipeline, node)?;
//! }
//!
//! let sink_input = sink.static_connector("sink").unwrap();
//! mediabridge_rs::register_pad_added_handler(NodeId(1), move |_: NodeId, connector: &Connector| {
//!     mediabridge_rs::link_connectors(connector, &sink_input);
//! })?;
//! mediabridge_rs::connect_dynamic_connector_signal(&decoder, NodeId(1))?;
//!
//! mediabridge_rs::register_bus_handler(PipelineId(1), |occ: &Occurrence, id: PipelineId| {
//!     println!("{id}: {occ}");
//! })?;
//! mediabridge_rs::watch_bus(&mut pipeline, PipelineId(1))?;
//! mediabridge_rs::start(&pipeline);
//! ```

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod graph;
pub mod pipeline;
mod sync;

// Re-export commonly used types
pub use config::{BridgeConfig, RewatchPolicy};
pub use dispatch::{BusHandler, DiagnosticSink, HandleRegistry, Occurrence, PadAddedHandler};
pub use engine::bus::Bus;
pub use engine::caps::Caps;
pub use error::{BridgeError, Result, ResultExt};
pub use graph::{
    Connector, ConnectorDirection, ConnectorPresence, Node, NodeId, PipelineId, PropertyValue,
    SignalHandlerId,
};
pub use pipeline::state::State;
pub use pipeline::Pipeline;

/// Start the engine with default configuration. Idempotent.
pub fn init() {
    init_with_config(BridgeConfig::default());
}

/// Start the engine with `config`. Only the first call's config takes effect.
pub fn init_with_config(config: BridgeConfig) {
    engine::init(config);
}

pub fn is_initialized() -> bool {
    engine::is_initialized()
}

// ── Graph ──

pub fn create_node(kind: &str, name: Option<&str>) -> Result<Node> {
    Node::new(kind, name)
}

pub fn link_nodes(src: &Node, dest: &Node) -> Result<()> {
    src.link(dest)
}

pub fn unlink_nodes(src: &Node, dest: &Node) -> bool {
    src.unlink(dest)
}

/// Link two connectors. Refusal is a normal outcome and returns `false`.
pub fn link_connectors(src: &Connector, dest: &Connector) -> bool {
    src.link(dest)
}

pub fn set_property(node: &Node, key: &str, value: impl Into<PropertyValue>) {
    node.set_property(key, value)
}

// ── Pipelines ──

pub fn create_pipeline(name: &str) -> Result<Pipeline> {
    Pipeline::new(name)
}

pub fn add_node(pipeline: &Pipeline, node: &Node) -> Result<()> {
    pipeline.add_node(node)
}

pub fn start(pipeline: &Pipeline) {
    pipeline.start()
}

pub fn pause(pipeline: &Pipeline) {
    pipeline.pause()
}

pub fn stop(pipeline: &Pipeline) {
    pipeline.stop()
}

pub fn send_eos(pipeline: &Pipeline) {
    pipeline.send_eos()
}

// ── Events ──

pub fn watch_bus(pipeline: &mut Pipeline, pipeline_id: PipelineId) -> Result<()> {
    pipeline.watch_bus(pipeline_id)
}

pub fn connect_dynamic_connector_signal(node: &Node, node_id: NodeId) -> Result<SignalHandlerId> {
    node.connect_pad_added(node_id)
}

pub fn register_bus_handler(
    pipeline_id: PipelineId,
    handler: impl BusHandler + 'static,
) -> Result<()> {
    HandleRegistry::global().register_bus_handler(pipeline_id, handler)
}

pub fn unregister_bus_handler(pipeline_id: PipelineId) -> bool {
    HandleRegistry::global().unregister_bus_handler(pipeline_id)
}

pub fn register_pad_added_handler(
    node_id: NodeId,
    handler: impl PadAddedHandler + 'static,
) -> Result<()> {
    HandleRegistry::global().register_pad_added_handler(node_id, handler)
}

pub fn unregister_pad_added_handler(node_id: NodeId) -> bool {
    HandleRegistry::global().unregister_pad_added_handler(node_id)
}

/// Replace the process-wide diagnostic sink (default: `tracing::error!`).
pub fn set_diagnostic_sink(sink: impl DiagnosticSink + 'static) {
    HandleRegistry::global().set_diagnostic_sink(sink)
}

pub fn reset_diagnostic_sink() {
    HandleRegistry::global().reset_diagnostic_sink()
}
