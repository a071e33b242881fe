//! Agent module - per-agent settings and their resolution source.

mod settings;

pub use settings::{AgentSettings, ConfigSource};
