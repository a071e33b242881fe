//! Health bookkeeping for backend instances (soft circuit breaker).
//!
//! Unlike a classic open/half-open/closed breaker, an instance recovers one
//! failure at a time: every success takes a single failure off the count.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AgentId, InstanceId, Timestamp};

/// Consecutive-ish failures after which an unhealthy primary is bypassed.
pub const FAILOVER_THRESHOLD: u32 = 2;

/// Observed health of one backend instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHealth {
    pub is_healthy: bool,
    pub failure_count: u32,
    pub last_tested_at: Option<Timestamp>,
    pub avg_response_time_ms: u64,
}

impl Default for InstanceHealth {
    fn default() -> Self {
        Self {
            is_healthy: true,
            failure_count: 0,
            last_tested_at: None,
            avg_response_time_ms: 0,
        }
    }
}

impl InstanceHealth {
    /// Soft recovery: one success forgives one failure.
    pub fn record_success(&mut self, response_time_ms: u64, now: Timestamp) {
        self.is_healthy = true;
        self.failure_count = self.failure_count.saturating_sub(1);
        self.avg_response_time_ms = if self.avg_response_time_ms == 0 {
            response_time_ms
        } else {
            midpoint(self.avg_response_time_ms, response_time_ms)
        };
        self.last_tested_at = Some(now);
    }

    pub fn record_failure(&mut self, now: Timestamp) {
        self.is_healthy = false;
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_tested_at = Some(now);
    }

    /// Traffic should be redirected away from this instance.
    pub fn should_bypass(&self) -> bool {
        !self.is_healthy && self.failure_count >= FAILOVER_THRESHOLD
    }

    /// Any recorded failure puts the instance on a fail-fast budget.
    pub fn is_degraded(&self) -> bool {
        self.failure_count > 0
    }
}

/// Mean of two samples without overflowing on extreme values.
fn midpoint(a: u64, b: u64) -> u64 {
    a / 2 + b / 2 + (a % 2 + b % 2) / 2
}

/// Static mapping from a logical agent to its backend instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRoute {
    pub logical_agent_id: AgentId,
    pub primary_instance_id: InstanceId,
    pub fallback_instance_id: InstanceId,
}
