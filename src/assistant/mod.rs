//! Conversation loop and resource lifecycle.

pub mod orchestrator;
pub mod resources;

pub use orchestrator::Orchestrator;
pub use resources::Resources;
