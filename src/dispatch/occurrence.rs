//! The four occurrence kinds forwarded to bus handlers.

use crate::engine::message::Message;
use crate::pipeline::state::State;
use std::fmt;

/// A bus message that external handlers get to see.
#[derive(Debug, Clone, PartialEq)]
pub enum Occurrence {
    EndOfStream,
    Error {
        description: String,
        debug: Option<String>,
        source: String,
    },
    Buffering {
        percent: u8,
        source: String,
    },
    StateChanged {
        source: String,
        old: State,
        new: State,
        pending: Option<State>,
    },
}

impl Occurrence {
    /// Map a bus message to an occurrence. Everything else is engine noise.
    pub fn classify(message: &Message) -> Option<Occurrence> {
        match message {
            Message::Eos { .. } => Some(Occurrence::EndOfStream),
            Message::Error {
                source,
                description,
                debug,
            } => Some(Occurrence::Error {
                description: description.clone(),
                debug: debug.clone(),
                source: source.clone(),
            }),
            Message::Buffering { source, percent } => Some(Occurrence::Buffering {
                percent: *percent,
                source: source.clone(),
            }),
            Message::StateChanged {
                source,
                old,
                new,
                pending,
            } => Some(Occurrence::StateChanged {
                source: source.clone(),
                old: *old,
                new: *new,
                pending: *pending,
            }),
            Message::Warning { .. }
            | Message::AsyncDone { .. }
            | Message::NewClock { .. }
            | Message::StreamStart { .. }
            | Message::Latency { .. }
            | Message::Element { .. } => None,
        }
    }

    /// True for a StateChanged reported by `source` that landed on `state`.
    pub fn is_state_change_to(&self, source: &str, state: State) -> bool {
        matches!(self, Occurrence::StateChanged { source: s, new, .. } if s == source && *new == state)
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occurrence::EndOfStream => write!(f, "end-of-stream"),
            Occurrence::Error {
                description,
                source,
                ..
            } => write!(f, "error from {source}: {description}"),
            Occurrence::Buffering { percent, source } => {
                write!(f, "buffering {percent}% ({source})")
            }
            Occurrence::StateChanged {
                source,
                old,
                new,
                pending,
            } => match pending {
                Some(p) => write!(f, "{source}: {old} -> {new} (pending {p})"),
                None => write!(f, "{source}: {old} -> {new}"),
            },
        }
    }
}
