//! Progress and outcome types reported by the Xtream backend.

use std::path::PathBuf;

/// What happened when one candidate endpoint was tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    Transport(String),
    /// The server answered with a non-200 status.
    Status(u16),
    /// The body was not JSON / not an M3U playlist.
    BadBody(String),
}

/// One tried endpoint and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub url: String,
    pub outcome: AttemptOutcome,
    /// Where the raw response was dumped, if anywhere.
    pub debug_file: Option<PathBuf>,
}

/// Events emitted while downloading a playlist.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistEvent {
    /// About to request this URL.
    Trying { url: String },

    /// Got a 200 response; body download begins. `total` is Content-Length.
    Started { url: String, total: Option<u64> },

    /// Bytes received so far.
    Progress { downloaded: u64, total: Option<u64> },

    /// This candidate failed; the stream moves on to the next one.
    Failed(Attempt),

    /// A valid playlist was downloaded. Always the last event on success.
    Completed {
        endpoint: String,
        client: String,
        text: String,
    },

    /// Every candidate failed. Always the last event on failure.
    Exhausted,
}
