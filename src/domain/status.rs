//! Progress messages reported during long-running operations

use std::fmt;

/// A one-way progress message. Purely informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub title: String,
    pub description: String,
}

impl StatusUpdate {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}
