//! Learning agents and the registry that owns them.

pub mod agent;
pub mod registry;

pub use agent::{Agent, AgentDefinition, AgentEstimates, AgentSnapshot};
pub use registry::AgentRegistry;
