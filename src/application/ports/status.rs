//! Status reporting port

use crate::domain::status::StatusUpdate;

/// One-way progress sink passed into long-running operations.
/// Never affects control flow.
pub trait StatusSink: Send + Sync {
    fn on_status(&self, update: StatusUpdate);
}

/// Discards every update
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentStatus;

impl StatusSink for SilentStatus {
    fn on_status(&self, _update: StatusUpdate) {}
}
