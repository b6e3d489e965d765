//! xf-protocol: Shared types for xfitcher.
//!
//! This crate defines the records exchanged between the Xtream backend,
//! the on-disk stores and the terminal frontend.

pub mod channel;
pub mod message;
pub mod server;

pub use channel::{Attrs, Channel};
pub use message::{Attempt, AttemptOutcome, PlaylistEvent};
pub use server::{ServerRecord, UNSET_STATUS};
