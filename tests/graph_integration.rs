//! Integration tests for the graph model
//!
//! These tests validate node creation and linking through the public API:
//! - Recognized and unrecognized kinds
//! - Connector direction and relink semantics
//! - Request connectors on mixers
//! - Asynchronous reporting of bad properties

mod common;

use common::recorder::BusRecorder;
use common::{next_pipeline_id, settle_time, test_timeout, unique_name};
use mediabridge_rs::engine::factory::FactoryRegistry;
use mediabridge_rs::{BridgeError, ConnectorDirection, Occurrence, PropertyValue};
use proptest::prelude::*;

#[test]
fn test_every_builtin_kind_creates_a_node() {
    common::init();
    for kind in FactoryRegistry::builtin().kinds() {
        let node = mediabridge_rs::create_node(kind, None).unwrap();
        assert_eq!(node.kind(), kind);
        assert!(node.name().starts_with(kind));
    }
}

#[test]
fn test_explicit_name_is_kept() {
    common::init();
    let node = mediabridge_rs::create_node("queue", Some("buffer")).unwrap();
    assert_eq!(node.name(), "buffer");
}

proptest! {
    #[test]
    fn test_unknown_kinds_are_rejected(kind in "[a-z]{1,12}-unknown") {
        common::init();
        match mediabridge_rs::create_node(&kind, None) {
            Err(BridgeError::UnknownKind(k)) => prop_assert_eq!(k, kind),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }
}

#[test]
fn test_link_connectors_direction_matters() {
    common::init();
    let src = mediabridge_rs::create_node("videotestsrc", None).unwrap();
    let sink = mediabridge_rs::create_node("autovideosink", None).unwrap();
    let a = src.static_connector("src").unwrap();
    let b = sink.static_connector("sink").unwrap();

    assert!(!mediabridge_rs::link_connectors(&b, &a));
    assert!(mediabridge_rs::link_connectors(&a, &b));
    assert!(mediabridge_rs::link_connectors(&a, &b));
    assert_eq!(a.peer(), Some(b.clone()));
    assert_eq!(b.peer(), Some(a.clone()));
}

#[test]
fn test_link_nodes_is_idempotent_and_unlinkable() {
    common::init();
    let src = mediabridge_rs::create_node("source", None).unwrap();
    let queue = mediabridge_rs::create_node("queue", None).unwrap();
    mediabridge_rs::link_nodes(&src, &queue).unwrap();
    mediabridge_rs::link_nodes(&src, &queue).unwrap();

    assert!(mediabridge_rs::unlink_nodes(&src, &queue));
    assert!(!mediabridge_rs::unlink_nodes(&src, &queue));
    assert!(!src.static_connector("src").unwrap().is_linked());
}

#[test]
fn test_incompatible_nodes() {
    common::init();
    let audio = mediabridge_rs::create_node("audiotestsrc", None).unwrap();
    let video = mediabridge_rs::create_node("autovideosink", None).unwrap();
    let err = mediabridge_rs::link_nodes(&audio, &video).unwrap_err();
    assert!(matches!(err, BridgeError::IncompatibleCapabilities { .. }));
}

#[test]
fn test_nodes_in_different_pipelines_do_not_link() {
    common::init();
    let a = mediabridge_rs::create_pipeline(&unique_name("a")).unwrap();
    let b = mediabridge_rs::create_pipeline(&unique_name("b")).unwrap();
    let src = mediabridge_rs::create_node("source", None).unwrap();
    let sink = mediabridge_rs::create_node("sink", None).unwrap();
    a.add_node(&src).unwrap();
    b.add_node(&sink).unwrap();
    assert!(mediabridge_rs::link_nodes(&src, &sink).is_err());
}

#[test]
fn test_node_cannot_join_two_pipelines() {
    common::init();
    let a = mediabridge_rs::create_pipeline(&unique_name("a")).unwrap();
    let b = mediabridge_rs::create_pipeline(&unique_name("b")).unwrap();
    let node = mediabridge_rs::create_node("queue", None).unwrap();
    a.add_node(&node).unwrap();
    assert!(matches!(
        b.add_node(&node),
        Err(BridgeError::AlreadyParented { .. })
    ));
    assert_eq!(node.parent_name().as_deref(), Some(a.name()));
}

#[test]
fn test_mixer_grows_request_connectors() {
    common::init();
    let mixer = mediabridge_rs::create_node("compositor", None).unwrap();
    mixer.set_property("background", 1);

    for _ in 0..3 {
        let src = mediabridge_rs::create_node("videotestsrc", None).unwrap();
        let scale = mediabridge_rs::create_node("videoscale", None).unwrap();
        let boxed = mediabridge_rs::create_node("videobox", None).unwrap();
        boxed.set_property("top", -10);
        mediabridge_rs::link_nodes(&src, &scale).unwrap();
        mediabridge_rs::link_nodes(&scale, &boxed).unwrap();
        mediabridge_rs::link_nodes(&boxed, &mixer).unwrap();
    }

    let inputs: Vec<String> = mixer
        .connectors()
        .iter()
        .filter(|c| c.direction() == ConnectorDirection::Input)
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(inputs, vec!["sink_0", "sink_1", "sink_2"]);

    let extra = mixer.request_connector("sink_%u").unwrap();
    assert_eq!(extra.name(), "sink_3");
    assert!(!extra.is_linked());
}

#[test]
fn test_properties_are_coerced_to_declared_type() {
    common::init();
    let rtsp = mediabridge_rs::create_node("rtspsrc", None).unwrap();
    mediabridge_rs::set_property(&rtsp, "location", "rtsp://127.0.0.1:8554/cam");
    mediabridge_rs::set_property(&rtsp, "latency", "0");
    assert_eq!(rtsp.property("latency"), Some(PropertyValue::Int(0)));
    assert_eq!(
        rtsp.property("location").unwrap().as_str(),
        Some("rtsp://127.0.0.1:8554/cam")
    );
}

#[test]
fn test_invalid_property_surfaces_as_error_occurrence() {
    common::init();
    let node = mediabridge_rs::create_node("videotestsrc", None).unwrap();
    mediabridge_rs::set_property(&node, "frobnicate", true);
    assert!(node.property("frobnicate").is_none());

    let mut pipeline = mediabridge_rs::create_pipeline(&unique_name("props")).unwrap();
    let bus = BusRecorder::register(next_pipeline_id());
    mediabridge_rs::watch_bus(&mut pipeline, bus.id).unwrap();
    pipeline.add_node(&node).unwrap();

    let seen = bus
        .wait_for(|o| matches!(o, Occurrence::Error { .. }), test_timeout())
        .expect("error occurrence");
    match seen.last() {
        Some(Occurrence::Error {
            description,
            source,
            ..
        }) => {
            assert!(description.contains("frobnicate"));
            assert_eq!(source, node.name());
        }
        other => panic!("unexpected {:?}", other),
    }

    mediabridge_rs::set_property(&node, "num-buffers", "many");
    assert!(bus
        .wait_for(|o| matches!(o, Occurrence::Error { .. }), test_timeout())
        .is_some());
    assert!(bus.drain(settle_time()).is_empty());
}
