//! xf-core: account management and playlist tooling for Xfitcher.
//!
//! This crate contains the interactive menus, batch commands, and the
//! on-disk stores they share. Exposed as a library for integration testing.

pub mod app;
pub mod batch;
pub mod config;
pub mod console;
pub mod debug_store;
pub mod error;
pub mod logging;
pub mod m3u;
pub mod menu;
pub mod paths;
pub mod playlists;
pub mod progress;
pub mod prompt;
pub mod store;
pub mod style;
