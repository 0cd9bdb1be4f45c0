//! Raw messages posted on a pipeline bus.
//!
//! This is the engine's full vocabulary. The dispatcher narrows it to the
//! four occurrence kinds handed to external handlers and drops the rest.

use crate::pipeline::state::State;

/// A message posted by the engine, tagged with the name of the object that posted it.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Eos {
        source: String,
    },
    Error {
        source: String,
        description: String,
        debug: Option<String>,
    },
    Warning {
        source: String,
        description: String,
    },
    Buffering {
        source: String,
        percent: u8,
    },
    StateChanged {
        source: String,
        old: State,
        new: State,
        pending: Option<State>,
    },
    AsyncDone {
        source: String,
    },
    NewClock {
        source: String,
    },
    StreamStart {
        source: String,
    },
    Latency {
        source: String,
    },
    /// Node-specific message without a dedicated variant.
    Element {
        source: String,
        name: String,
    },
}

impl Message {
    pub fn error(source: impl Into<String>, description: impl Into<String>) -> Self {
        Message::Error {
            source: source.into(),
            description: description.into(),
            debug: None,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Message::Eos { source }
            | Message::Error { source, .. }
            | Message::Warning { source, .. }
            | Message::Buffering { source, .. }
            | Message::StateChanged { source, .. }
            | Message::AsyncDone { source }
            | Message::NewClock { source }
            | Message::StreamStart { source }
            | Message::Latency { source }
            | Message::Element { source, .. } => source,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Eos { .. } => "eos",
            Message::Error { .. } => "error",
            Message::Warning { .. } => "warning",
            Message::Buffering { .. } => "buffering",
            Message::StateChanged { .. } => "state-changed",
            Message::AsyncDone { .. } => "async-done",
            Message::NewClock { .. } => "new-clock",
            Message::StreamStart { .. } => "stream-start",
            Message::Latency { .. } => "latency",
            Message::Element { .. } => "element",
        }
    }
}
