//! Run module - the asynchronous "thread → run → poll" job protocol.

mod job;
mod outcome;
mod schedule;
mod status;

pub use job::{PendingToolCall, RunJob, RunSnapshot, ToolOutput, TOOL_CALLS_DISABLED_OUTPUT};
pub use outcome::{PollOutcome, PollStatus};
pub use schedule::{PollBudget, PollMode, PollSchedule};
pub use status::RunStatus;
