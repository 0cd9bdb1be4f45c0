//! Node factories known to the engine.
//!
//! Each factory declares its connector templates and property table as static
//! data, the same way every node kind is described up front rather than
//! discovered at runtime.

use crate::engine::caps::Caps;
use crate::graph::connector::{ConnectorDirection, ConnectorPresence};
use crate::graph::property::PropertyKind;
use std::collections::HashMap;

const ANY: &[&str] = &["ANY"];
const VIDEO: &[&str] = &["video/x-raw"];
const AUDIO: &[&str] = &["audio/x-raw"];
const RTP: &[&str] = &["application/x-rtp"];

/// Static description of a connector a node kind can expose.
#[derive(Debug)]
pub struct ConnectorTemplate {
    /// Name, or name pattern with `%u` for sometimes/request connectors.
    pub name: &'static str,
    pub direction: ConnectorDirection,
    pub presence: ConnectorPresence,
    caps: &'static [&'static str],
}

impl ConnectorTemplate {
    pub const fn always_src(caps: &'static [&'static str]) -> Self {
        Self {
            name: "src",
            direction: ConnectorDirection::Output,
            presence: ConnectorPresence::Always,
            caps,
        }
    }

    pub const fn always_sink(caps: &'static [&'static str]) -> Self {
        Self {
            name: "sink",
            direction: ConnectorDirection::Input,
            presence: ConnectorPresence::Always,
            caps,
        }
    }

    pub const fn sometimes_src(name: &'static str, caps: &'static [&'static str]) -> Self {
        Self {
            name,
            direction: ConnectorDirection::Output,
            presence: ConnectorPresence::Sometimes,
            caps,
        }
    }

    pub const fn request_sink(name: &'static str, caps: &'static [&'static str]) -> Self {
        Self {
            name,
            direction: ConnectorDirection::Input,
            presence: ConnectorPresence::Request,
            caps,
        }
    }

    pub fn caps(&self) -> Caps {
        Caps::from_media_types(self.caps)
    }

    /// Concrete connector name for the `index`-th instance of this template.
    pub fn instance_name(&self, index: u32) -> String {
        if self.name.contains("%u") {
            self.name.replace("%u", &index.to_string())
        } else {
            self.name.to_string()
        }
    }
}

/// Static description of a node property.
#[derive(Debug)]
pub struct PropertySpec {
    pub name: &'static str,
    pub kind: PropertyKind,
    /// The node refuses to leave NULL until this is set.
    pub required: bool,
}

const fn prop(name: &'static str, kind: PropertyKind) -> PropertySpec {
    PropertySpec {
        name,
        kind,
        required: false,
    }
}

const fn required(name: &'static str, kind: PropertyKind) -> PropertySpec {
    PropertySpec {
        name,
        kind,
        required: true,
    }
}

/// A processing-unit kind the engine can instantiate.
#[derive(Debug)]
pub struct ElementFactory {
    pub kind: &'static str,
    pub description: &'static str,
    pub templates: &'static [ConnectorTemplate],
    pub properties: &'static [PropertySpec],
    /// Posts Buffering progress while prerolling.
    pub posts_buffering: bool,
}

impl ElementFactory {
    pub fn property(&self, name: &str) -> Option<&'static PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn template(&self, name: &str) -> Option<&'static ConnectorTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn templates_with(
        &self,
        direction: ConnectorDirection,
        presence: ConnectorPresence,
    ) -> impl Iterator<Item = &'static ConnectorTemplate> {
        self.templates
            .iter()
            .filter(move |t| t.direction == direction && t.presence == presence)
    }

    pub fn required_properties(&self) -> impl Iterator<Item = &'static PropertySpec> {
        self.properties.iter().filter(|p| p.required)
    }

    pub fn has_dynamic_outputs(&self) -> bool {
        self.templates_with(ConnectorDirection::Output, ConnectorPresence::Sometimes)
            .next()
            .is_some()
    }
}

const TEST_SOURCE_PROPS: &[PropertySpec] = &[
    prop("pattern", PropertyKind::String),
    prop("is-live", PropertyKind::Bool),
    prop("num-buffers", PropertyKind::Int),
];

const DECODER_TEMPLATES: &[ConnectorTemplate] = &[
    ConnectorTemplate::always_sink(ANY),
    ConnectorTemplate::sometimes_src("src_%u", VIDEO),
];

const VIDEO_FILTER_TEMPLATES: &[ConnectorTemplate] = &[
    ConnectorTemplate::always_sink(VIDEO),
    ConnectorTemplate::always_src(VIDEO),
];

const PASSTHROUGH_TEMPLATES: &[ConnectorTemplate] = &[
    ConnectorTemplate::always_sink(ANY),
    ConnectorTemplate::always_src(ANY),
];

const SINK_PROPS: &[PropertySpec] = &[prop("sync", PropertyKind::Bool)];

static FACTORIES: &[ElementFactory] = &[
    ElementFactory {
        kind: "source",
        description: "Generic raw video source",
        templates: &[ConnectorTemplate::always_src(VIDEO)],
        properties: TEST_SOURCE_PROPS,
        posts_buffering: false,
    },
    ElementFactory {
        kind: "videotestsrc",
        description: "Synthetic video test pattern",
        templates: &[ConnectorTemplate::always_src(VIDEO)],
        properties: TEST_SOURCE_PROPS,
        posts_buffering: false,
    },
    ElementFactory {
        kind: "audiotestsrc",
        description: "Synthetic audio test tone",
        templates: &[ConnectorTemplate::always_src(AUDIO)],
        properties: &[
            prop("freq", PropertyKind::Float),
            prop("volume", PropertyKind::Float),
            prop("is-live", PropertyKind::Bool),
            prop("num-buffers", PropertyKind::Int),
        ],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "filesrc",
        description: "Reads a file",
        templates: &[ConnectorTemplate::always_src(ANY)],
        properties: &[required("location", PropertyKind::String)],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "rtspsrc",
        description: "RTSP client; outputs appear once the session is set up",
        templates: &[ConnectorTemplate::sometimes_src("recv_rtp_src_%u", RTP)],
        properties: &[
            required("location", PropertyKind::String),
            prop("latency", PropertyKind::Int),
        ],
        posts_buffering: true,
    },
    ElementFactory {
        kind: "decoder",
        description: "Format-discovering decoder with dynamic outputs",
        templates: DECODER_TEMPLATES,
        properties: &[prop("caps", PropertyKind::String)],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "decodebin",
        description: "Auto-plugging decoder with dynamic outputs",
        templates: DECODER_TEMPLATES,
        properties: &[prop("caps", PropertyKind::String)],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "queue",
        description: "Thread boundary",
        templates: PASSTHROUGH_TEMPLATES,
        properties: &[
            prop("max-size-buffers", PropertyKind::Int),
            prop("leaky", PropertyKind::Int),
        ],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "queue2",
        description: "Buffering queue",
        templates: PASSTHROUGH_TEMPLATES,
        properties: &[prop("use-buffering", PropertyKind::Bool)],
        posts_buffering: true,
    },
    ElementFactory {
        kind: "capsfilter",
        description: "Restricts the formats passing through",
        templates: PASSTHROUGH_TEMPLATES,
        properties: &[prop("caps", PropertyKind::String)],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "videoscale",
        description: "Resizes raw video",
        templates: VIDEO_FILTER_TEMPLATES,
        properties: &[],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "videoconvert",
        description: "Converts between raw video layouts",
        templates: VIDEO_FILTER_TEMPLATES,
        properties: &[],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "videobox",
        description: "Crops or borders raw video",
        templates: VIDEO_FILTER_TEMPLATES,
        properties: &[
            prop("top", PropertyKind::Int),
            prop("left", PropertyKind::Int),
            prop("right", PropertyKind::Int),
            prop("bottom", PropertyKind::Int),
            prop("alpha", PropertyKind::Float),
        ],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "timeoverlay",
        description: "Draws the stream time over raw video",
        templates: VIDEO_FILTER_TEMPLATES,
        properties: &[prop("text", PropertyKind::String)],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "compositor",
        description: "Mixes any number of video inputs",
        templates: &[
            ConnectorTemplate::request_sink("sink_%u", VIDEO),
            ConnectorTemplate::always_src(VIDEO),
        ],
        properties: &[prop("background", PropertyKind::Int)],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "audiomixer",
        description: "Mixes any number of audio inputs",
        templates: &[
            ConnectorTemplate::request_sink("sink_%u", AUDIO),
            ConnectorTemplate::always_src(AUDIO),
        ],
        properties: &[],
        posts_buffering: false,
    },
    ElementFactory {
        kind: "sink",
        description: "Generic sink accepting anything",
        templates: &[ConnectorTemplate::always_sink(ANY)],
        properties: SINK_PROPS,
        posts_buffering: false,
    },
    ElementFactory {
        kind: "fakesink",
        description: "Discards everything",
        templates: &[ConnectorTemplate::always_sink(ANY)],
        properties: SINK_PROPS,
        posts_buffering: false,
    },
    ElementFactory {
        kind: "autovideosink",
        description: "Platform video output",
        templates: &[ConnectorTemplate::always_sink(VIDEO)],
        properties: SINK_PROPS,
        posts_buffering: false,
    },
    ElementFactory {
        kind: "autoaudiosink",
        description: "Platform audio output",
        templates: &[ConnectorTemplate::always_sink(AUDIO)],
        properties: SINK_PROPS,
        posts_buffering: false,
    },
];

/// Kind-name lookup over the built-in factories.
pub struct FactoryRegistry {
    by_kind: HashMap<&'static str, &'static ElementFactory>,
}

impl FactoryRegistry {
    pub fn builtin() -> Self {
        Self {
            by_kind: FACTORIES.iter().map(|f| (f.kind, f)).collect(),
        }
    }

    pub fn find(&self, kind: &str) -> Option<&'static ElementFactory> {
        self.by_kind.get(kind).copied()
    }

    /// All kind names, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.by_kind.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_unique() {
        let registry = FactoryRegistry::builtin();
        assert_eq!(registry.kinds().len(), FACTORIES.len());
    }

    #[test]
    fn test_decoder_has_dynamic_outputs() {
        let registry = FactoryRegistry::builtin();
        let decoder = registry.find("decoder").unwrap();
        assert!(decoder.has_dynamic_outputs());
        assert!(!registry.find("queue").unwrap().has_dynamic_outputs());
    }

    #[test]
    fn test_instance_name_expands_pattern() {
        let tmpl = ConnectorTemplate::request_sink("sink_%u", VIDEO);
        assert_eq!(tmpl.instance_name(3), "sink_3");
        assert_eq!(ConnectorTemplate::always_src(VIDEO).instance_name(9), "src");
    }

    #[test]
    fn test_required_properties() {
        let registry = FactoryRegistry::builtin();
        let names: Vec<_> = registry
            .find("rtspsrc")
            .unwrap()
            .required_properties()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["location"]);
        assert!(registry.find("filesrc").unwrap().property("latency").is_none());
    }

    #[test]
    fn test_every_template_name_is_unique_per_kind() {
        for factory in FACTORIES {
            let mut names: Vec<_> = factory.templates.iter().map(|t| t.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), factory.templates.len(), "{}", factory.kind);
        }
    }
}
