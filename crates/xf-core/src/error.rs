//! Application error type.

use std::io;

use thiserror::Error;
use xf_backend::BackendError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("no saved server #{0}")]
    NoSuchServer(usize),
    #[error("no such file: {0}")]
    NoSuchFile(String),
    #[error("failed to fetch a valid M3U playlist")]
    PlaylistUnavailable,
    #[error("unreadable server list: {0}")]
    UnreadableServers(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
