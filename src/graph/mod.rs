//! Graph model: nodes, their connectors, and the handles that name them.

pub mod connector;
pub mod id;
pub mod node;
pub mod property;

pub use connector::{Connector, ConnectorDirection, ConnectorPresence};
pub use id::{NodeId, PipelineId, SignalHandlerId};
pub use node::Node;
pub use property::{PropertyKind, PropertyValue};
