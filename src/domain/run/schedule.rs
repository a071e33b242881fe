//! Adaptive polling schedules and budgets.
//!
//! Waits start short so fast runs feel instant and stretch out as a run keeps
//! going, which keeps the request rate against the provider bounded.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Who is waiting on the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    /// A user is watching an SSE stream.
    Interactive,
    /// A caller asked for a single JSON response.
    Batch,
}

/// Step function from attempt count to wait interval.
///
/// Each step applies from its `from_attempt` until the next step begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    steps: Vec<(u32, Duration)>,
}

impl PollSchedule {
    /// Builds a schedule from `(from_attempt, interval)` steps.
    ///
    /// Steps are sorted by attempt; intervals are clamped so the schedule
    /// never shrinks as attempts grow.
    pub fn new(mut steps: Vec<(u32, Duration)>) -> Self {
        steps.sort_by_key(|(from, _)| *from);
        let mut floor = Duration::ZERO;
        for (_, interval) in steps.iter_mut() {
            if *interval < floor {
                *interval = floor;
            }
            floor = *interval;
        }
        Self { steps }
    }

    /// Default schedule for the given mode.
    pub fn for_mode(mode: PollMode) -> Self {
        let ms = Duration::from_millis;
        match mode {
            PollMode::Interactive => Self::new(vec![
                (0, ms(500)),
                (3, ms(1_000)),
                (8, ms(1_500)),
                (15, ms(2_500)),
            ]),
            PollMode::Batch => Self::new(vec![
                (0, ms(1_000)),
                (3, ms(2_000)),
                (8, ms(3_000)),
                (15, ms(5_000)),
            ]),
        }
    }

    /// Wait before the status check numbered `attempt` (0-based).
    pub fn interval_for(&self, attempt: u32) -> Duration {
        self.steps
            .iter()
            .take_while(|(from, _)| *from <= attempt)
            .last()
            .map(|(_, interval)| *interval)
            .unwrap_or(Duration::ZERO)
    }
}

/// Upper bounds on how long a single run may be polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollBudget {
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    #[serde(rename = "globalTimeoutMs")]
    pub global_timeout: Duration,
}

impl PollBudget {
    pub fn new(max_attempts: u32, global_timeout: Duration) -> Self {
        Self {
            max_attempts,
            global_timeout,
        }
    }

    /// Budget for healthy instances.
    pub fn standard() -> Self {
        Self::new(60, Duration::from_secs(120))
    }

    /// Fail-fast budget for instances with recent failures.
    pub fn reduced() -> Self {
        Self::new(25, Duration::from_secs(45))
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_is_tighter_than_batch() {
        let interactive = PollSchedule::for_mode(PollMode::Interactive);
        let batch = PollSchedule::for_mode(PollMode::Batch);
        for attempt in 0..40 {
            assert!(interactive.interval_for(attempt) < batch.interval_for(attempt));
        }
    }

    #[test]
    fn schedules_never_shrink() {
        for mode in [PollMode::Interactive, PollMode::Batch] {
            let schedule = PollSchedule::for_mode(mode);
            let mut previous = Duration::ZERO;
            for attempt in 0..100 {
                let interval = schedule.interval_for(attempt);
                assert!(interval >= previous, "{mode:?} shrank at attempt {attempt}");
                previous = interval;
            }
        }
    }

    #[test]
    fn step_boundaries_apply_from_their_attempt() {
        let schedule = PollSchedule::for_mode(PollMode::Interactive);
        assert_eq!(schedule.interval_for(0), Duration::from_millis(500));
        assert_eq!(schedule.interval_for(2), Duration::from_millis(500));
        assert_eq!(schedule.interval_for(3), Duration::from_millis(1_000));
        assert_eq!(schedule.interval_for(1_000), Duration::from_millis(2_500));
    }

    #[test]
    fn decreasing_steps_are_clamped() {
        let schedule = PollSchedule::new(vec![
            (5, Duration::from_millis(100)),
            (0, Duration::from_millis(400)),
        ]);
        assert_eq!(schedule.interval_for(0), Duration::from_millis(400));
        assert_eq!(schedule.interval_for(6), Duration::from_millis(400));
    }

    #[test]
    fn reduced_budget_is_smaller_than_standard() {
        let standard = PollBudget::standard();
        let reduced = PollBudget::reduced();
        assert!(reduced.max_attempts < standard.max_attempts);
        assert!(reduced.global_timeout < standard.global_timeout);
    }

    #[test]
    fn budget_serializes_timeout_in_millis() {
        let json = serde_json::to_value(PollBudget::new(3, Duration::from_secs(2))).unwrap();
        assert_eq!(json["maxAttempts"], 3);
        assert_eq!(json["globalTimeoutMs"], 2000);
    }
}
