//! Stream relay.
//!
//! Normalizes both upstream transports into the client event protocol:
//! provider token deltas are decoded and re-emitted as `token` events, and
//! poller outcomes are settled into a reply or a gateway error. Events go
//! out through an [`EventSink`] in production order.

mod decoder;
mod native;
mod poll;
mod sink;

pub use decoder::{parse_delta, SseLine, SseLineDecoder};
pub use native::{relay_native_stream, NativeReply};
pub use poll::settle_poll_outcome;
pub use sink::EventSink;
