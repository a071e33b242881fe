//! Routing module - logical agents, backend instances and their health.

mod health;

pub use health::{BackendRoute, InstanceHealth, FAILOVER_THRESHOLD};
