//! Error handling for mediabridge-rs
//!
//! Only synchronous failures live here: construction errors, negotiation
//! failures and registry misuse. Anything the engine discovers after a
//! request was accepted travels as an `Error` occurrence on the pipeline's
//! bus instead.

use thiserror::Error;

/// Main error type for mediabridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// `create_node` was asked for a kind the engine has no factory for
    #[error("Unknown node kind: {0}")]
    UnknownKind(String),

    /// No mutually acceptable format exists between two nodes' connectors
    #[error("Incompatible capabilities: cannot link '{src}' to '{dest}'")]
    IncompatibleCapabilities { src: String, dest: String },

    /// An operation was attempted before `init()`
    #[error("Engine not initialized; call mediabridge_rs::init() first")]
    NotInitialized,

    /// The node already belongs to a pipeline
    #[error("Node '{node}' already belongs to pipeline '{parent}'")]
    AlreadyParented { node: String, parent: String },

    /// The node is not a child of the pipeline it was removed from
    #[error("Node '{node}' is not a child of pipeline '{pipeline}'")]
    WrongParent { node: String, pipeline: String },

    /// A handler ID is already live in its namespace
    #[error("Handle {id} is already registered in the {namespace} namespace")]
    DuplicateHandle { namespace: &'static str, id: i32 },

    /// The pipeline already has a bus watch and the policy rejects a second one
    #[error("Pipeline {0} already has a bus watch installed")]
    WatchAlreadyInstalled(i32),

    /// The object was released by its pipeline's teardown
    #[error("'{0}' has been released")]
    Released(String),

    /// Connector or connector template lookup failed
    #[error("Node '{node}' has no connector or template named '{name}'")]
    NoSuchConnector { node: String, name: String },

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors (thread spawning, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BridgeError>,
    },
}

impl BridgeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BridgeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this is a routine negotiation failure rather than a fault
    pub fn is_negotiation_failure(&self) -> bool {
        match self {
            BridgeError::IncompatibleCapabilities { .. } => true,
            BridgeError::WithContext { source, .. } => source.is_negotiation_failure(),
            _ => false,
        }
    }
}

/// Result type alias for mediabridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
