//! Timing metrics for a native token stream.

use serde::Serialize;
use tokio::time::Instant;

/// Summary attached to the `complete` event of a native stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetrics {
    pub total_time_ms: u64,
    /// `None` when the stream produced no tokens at all.
    pub first_token_latency_ms: Option<u64>,
    pub token_count: u64,
    pub tokens_per_second: f64,
}

/// Accumulates timing as deltas arrive.
#[derive(Debug, Clone)]
pub struct StreamClock {
    started_at: Instant,
    first_token_at: Option<Instant>,
    token_count: u64,
}

impl StreamClock {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started_at: Instant) -> Self {
        Self {
            started_at,
            first_token_at: None,
            token_count: 0,
        }
    }

    /// Records one content delta.
    pub fn record_token(&mut self) {
        self.first_token_at.get_or_insert_with(Instant::now);
        self.token_count += 1;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    pub fn finish(&self) -> StreamMetrics {
        let total = self.started_at.elapsed();
        let secs = total.as_secs_f64();
        let tokens_per_second = if secs > 0.0 {
            self.token_count as f64 / secs
        } else {
            0.0
        };
        StreamMetrics {
            total_time_ms: total.as_millis() as u64,
            first_token_latency_ms: self
                .first_token_at
                .map(|at| at.duration_since(self.started_at).as_millis() as u64),
            token_count: self.token_count,
            tokens_per_second,
        }
    }
}
