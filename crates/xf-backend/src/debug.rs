//! Destination for raw responses that could not be used.

use std::path::PathBuf;

/// Receives raw bodies of failed requests so they can be inspected later.
pub trait DebugSink: Send + Sync {
    /// Persist `body` under `label`. Returns where it was written, if anywhere.
    fn save(&self, label: &str, endpoint: &str, body: &str) -> Option<PathBuf>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DebugSink for NoopSink {
    fn save(&self, _label: &str, _endpoint: &str, _body: &str) -> Option<PathBuf> {
        None
    }
}
