//! Progress reporting for engine invocations.
//!
//! A [`ProgressSink`] is handed to the engine explicitly; nothing is counted
//! in shared global state.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

/// Something that happened during one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    InvocationStarted { invocation_id: Uuid, query: String },
    BranchStarted { invocation_id: Uuid, branch: String },
    BranchFinished { invocation_id: Uuid, branch: String, count: usize },
    BranchFailed { invocation_id: Uuid, branch: String, error: String },
    Merged { invocation_id: Uuid, count: usize },
}

impl ProgressEvent {
    pub fn invocation_id(&self) -> Uuid {
        match self {
            ProgressEvent::InvocationStarted { invocation_id, .. }
            | ProgressEvent::BranchStarted { invocation_id, .. }
            | ProgressEvent::BranchFinished { invocation_id, .. }
            | ProgressEvent::BranchFailed { invocation_id, .. }
            | ProgressEvent::Merged { invocation_id, .. } => *invocation_id,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events over an unbounded channel.
///
/// A closed receiver is not an error; events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::InvocationStarted { invocation_id, query } => {
                debug!(%invocation_id, %query, "Invocation started")
            }
            ProgressEvent::BranchStarted { invocation_id, branch } => {
                debug!(%invocation_id, %branch, "Branch started")
            }
            ProgressEvent::BranchFinished { invocation_id, branch, count } => {
                debug!(%invocation_id, %branch, count, "Branch finished")
            }
            ProgressEvent::BranchFailed { invocation_id, branch, error } => {
                warn!(%invocation_id, %branch, %error, "Branch failed")
            }
            ProgressEvent::Merged { invocation_id, count } => {
                debug!(%invocation_id, count, "Branches merged")
            }
        }
    }
}
