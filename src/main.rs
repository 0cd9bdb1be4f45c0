//! mediabridge demo - Main Entry Point
//!
//! Builds `source -> decoder -> sink`, links the decoder's dynamic output from
//! its pad-added handler, runs the pipeline until it reports PLAYING, then
//! stops it.

use anyhow::Context;
use crossbeam_channel::unbounded;
use mediabridge_rs::config::{BridgeConfig, LoggingConfig};
use mediabridge_rs::{Connector, NodeId, Occurrence, PipelineId, State};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEMO_PIPELINE: PipelineId = PipelineId(1);
const DEMO_DECODER: NodeId = NodeId(1);
const PLAYING_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    let config = BridgeConfig::load_or_default();
    let _log_guard = init_logging(&config.logging)?;

    tracing::info!("Starting mediabridge demo");
    mediabridge_rs::init_with_config(config);

    let source = mediabridge_rs::create_node("source", Some("camera"))?;
    let decoder = mediabridge_rs::create_node("decoder", None)?;
    let sink = mediabridge_rs::create_node("sink", None)?;
    mediabridge_rs::link_nodes(&source, &decoder).context("Failed to link source to decoder")?;

    let mut pipeline = mediabridge_rs::create_pipeline("demo")?;
    for node in [&source, &decoder, &sink] {
        mediabridge_rs::add_node(&pipeline, node)?;
    }

    let sink_input = sink
        .static_connector("sink")
        .context("sink has no input connector")?;
    mediabridge_rs::register_pad_added_handler(
        DEMO_DECODER,
        move |node_id: NodeId, connector: &Connector| {
            let linked = mediabridge_rs::link_connectors(connector, &sink_input);
            tracing::info!("{}: new connector {}, linked: {}", node_id, connector, linked);
        },
    )?;
    mediabridge_rs::connect_dynamic_connector_signal(&decoder, DEMO_DECODER)?;

    let (tx, rx) = unbounded();
    mediabridge_rs::register_bus_handler(
        DEMO_PIPELINE,
        move |occurrence: &Occurrence, _: PipelineId| {
            let _ = tx.send(occurrence.clone());
        },
    )?;
    mediabridge_rs::watch_bus(&mut pipeline, DEMO_PIPELINE)?;

    mediabridge_rs::start(&pipeline);

    let deadline = Instant::now() + PLAYING_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let occurrence = rx
            .recv_timeout(remaining)
            .context("Timed out waiting for PLAYING")?;
        println!("{}: {}", DEMO_PIPELINE, occurrence);
        if occurrence.is_state_change_to(pipeline.name(), State::Playing) {
            break;
        }
    }

    mediabridge_rs::stop(&pipeline);
    // Already heading to NULL, so this is ignored.
    mediabridge_rs::send_eos(&pipeline);

    pipeline.destroy();
    tracing::info!("Shutting down...");
    Ok(())
}

/// Console logging, plus a plain-text file when `log_file` is set.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let (file_layer, guard) = match &logging.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path.file_name().context("log_file has no file name")?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
