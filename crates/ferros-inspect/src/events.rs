//! Target state notifications.
//!
//! The process-control layer publishes these when the inferior stops or
//! resumes. The registry subscribes to them because synthetic group values
//! are only meaningful within one stopped interval; see
//! [`crate::registry::VariableRegistry::process_event`].

use std::sync::mpsc;

use crate::types::Address;

/// Why the inferior stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason
{
    Breakpoint(Address),
    Signal(i32),
    Step,
    Suspended,
    Unknown,
}

/// Event emitted by the process-control layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferiorEvent
{
    /// The inferior stopped; values can be inspected.
    TargetStopped
    {
        reason: StopReason,
        /// Thread responsible for the stop (if known).
        thread: Option<u64>,
    },
    /// The inferior resumed; previously read values may be stale.
    TargetResumed,
}

impl InferiorEvent
{
    /// Human-readable description of the event.
    #[must_use]
    pub fn describe(&self) -> String
    {
        match self {
            Self::TargetStopped { reason, thread } => {
                let mut description = describe_stop_reason(*reason);
                if let Some(thread) = thread {
                    description.push_str(&format!(" (thread {thread})"));
                }
                description
            }
            Self::TargetResumed => "Target resumed execution".to_string(),
        }
    }
}

/// User-facing text for a [`StopReason`].
#[must_use]
pub fn describe_stop_reason(reason: StopReason) -> String
{
    match reason {
        StopReason::Breakpoint(address) => format!("Hit breakpoint at {address}"),
        StopReason::Signal(signal) => format!("Stopped by signal: {signal}"),
        StopReason::Step => "Step finished".to_string(),
        StopReason::Suspended => "Process is suspended".to_string(),
        StopReason::Unknown => "Stopped for unknown reason".to_string(),
    }
}

pub type InferiorEventSender = mpsc::Sender<InferiorEvent>;
pub type InferiorEventReceiver = mpsc::Receiver<InferiorEvent>;

/// Create a new event channel.
#[must_use]
pub fn event_channel() -> (InferiorEventSender, InferiorEventReceiver)
{
    mpsc::channel()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_describe()
    {
        let stop = InferiorEvent::TargetStopped {
            reason: StopReason::Breakpoint(Address::from(0x401000)),
            thread: Some(7),
        };
        assert_eq!(stop.describe(), "Hit breakpoint at 0x401000 (thread 7)");
        assert_eq!(InferiorEvent::TargetResumed.describe(), "Target resumed execution");
    }
}
