//! xf-backend: Xtream-Codes panel client for xfitcher.
//!
//! Talks to `player_api.php` and `get.php` on a panel whose exact scheme and
//! port are often unknown, trying a list of candidate base URLs in turn.

pub mod debug;
pub mod endpoints;
pub mod mock;
pub mod xtream;

pub use debug::{DebugSink, NoopSink};
pub use endpoints::generate_endpoints;
pub use mock::{MockRoute, MockServer};
pub use xtream::{
    ApiSuccess, BackendError, ClientOptions, ProbeEvent, ProbeFailure, XtreamClient, CLIENT_TAG,
};
