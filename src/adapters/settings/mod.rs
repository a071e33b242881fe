//! Agent settings adapters.

mod in_memory;

pub use in_memory::InMemoryAgentSettings;
