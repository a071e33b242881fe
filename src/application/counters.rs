//! Process-wide request and latency counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregate counters shared by every request handler.
///
/// Reset only on restart.
#[derive(Debug, Default)]
pub struct PerformanceCounters {
    total_requests: AtomicU64,
    successful_streams: AtomicU64,
    total_response_time_ms: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    pub total_requests: u64,
    pub successful_streams: u64,
    pub average_response_time_ms: u64,
    pub success_rate_percent: f64,
}

impl PerformanceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_successful_stream(&self, response_time_ms: u64) {
        self.successful_streams.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_ms
            .fetch_add(response_time_ms, Ordering::Relaxed);
    }

    /// Zero denominators yield 0.
    pub fn stats(&self) -> PerformanceStats {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let successful_streams = self.successful_streams.load(Ordering::Relaxed);
        let total_time = self.total_response_time_ms.load(Ordering::Relaxed);

        let average_response_time_ms = if successful_streams == 0 {
            0
        } else {
            total_time / successful_streams
        };
        let success_rate_percent = if total_requests == 0 {
            0.0
        } else {
            successful_streams as f64 * 100.0 / total_requests as f64
        };

        PerformanceStats {
            total_requests,
            successful_streams,
            average_response_time_ms,
            success_rate_percent,
        }
    }
}
