//! Status sink that writes to the log

use tracing::info;

use crate::application::ports::StatusSink;
use crate::domain::status::StatusUpdate;

/// Logs every update at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn on_status(&self, update: StatusUpdate) {
        info!(title = %update.title, "{}", update.description);
    }
}
