//! Graph builders for the common test topologies

use super::recorder::{BusRecorder, PadRecorder};
use super::{next_node_id, next_pipeline_id, unique_name};
use mediabridge_rs::{Node, Pipeline};

/// `source -> decoder -> sink`, with the decoder's dynamic output linked to
/// the sink by its pad-added handler.
pub struct DecodeScenario {
    pub source: Node,
    pub decoder: Node,
    pub sink: Node,
    pub pipeline: Pipeline,
    pub bus: BusRecorder,
    pub pads: PadRecorder,
}

impl DecodeScenario {
    pub fn build() -> Self {
        let source = mediabridge_rs::create_node("source", None).unwrap();
        let decoder = mediabridge_rs::create_node("decoder", None).unwrap();
        let sink = mediabridge_rs::create_node("sink", None).unwrap();
        mediabridge_rs::link_nodes(&source, &decoder).unwrap();

        let mut pipeline = mediabridge_rs::create_pipeline(&unique_name("decode")).unwrap();
        for node in [&source, &decoder, &sink] {
            mediabridge_rs::add_node(&pipeline, node).unwrap();
        }

        let pads = PadRecorder::linking_to(next_node_id(), sink.static_connector("sink"));
        mediabridge_rs::connect_dynamic_connector_signal(&decoder, pads.id).unwrap();

        let bus = BusRecorder::register(next_pipeline_id());
        mediabridge_rs::watch_bus(&mut pipeline, bus.id).unwrap();

        Self {
            source,
            decoder,
            sink,
            pipeline,
            bus,
            pads,
        }
    }
}

/// `videotestsrc -> fakesink` with a bus watch.
pub struct SimplePipeline {
    pub pipeline: Pipeline,
    pub bus: BusRecorder,
}

impl SimplePipeline {
    pub fn build() -> Self {
        let src = mediabridge_rs::create_node("videotestsrc", None).unwrap();
        let sink = mediabridge_rs::create_node("fakesink", None).unwrap();
        mediabridge_rs::link_nodes(&src, &sink).unwrap();

        let mut pipeline = mediabridge_rs::create_pipeline(&unique_name("simple")).unwrap();
        mediabridge_rs::add_node(&pipeline, &src).unwrap();
        mediabridge_rs::add_node(&pipeline, &sink).unwrap();

        let bus = BusRecorder::register(next_pipeline_id());
        mediabridge_rs::watch_bus(&mut pipeline, bus.id).unwrap();
        Self { pipeline, bus }
    }
}
