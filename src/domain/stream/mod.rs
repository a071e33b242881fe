//! Stream module - the normalized event protocol sent to clients.

mod event;
mod metrics;

pub use event::{StreamEvent, THINKING_STATUS};
pub use metrics::{StreamClock, StreamMetrics};
