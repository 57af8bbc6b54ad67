//! Blocking HTTP clients for the orchestrator's external collaborators.
//!
//! Three families of services:
//!
//! - **Plex** ([`PlexClient`]): connection with bounded retries and the
//!   butler maintenance window (the live schedule the orchestration loop
//!   re-derives once per iteration).
//! - **PVR suite** ([`ArrClient`]): Sonarr, Radarr, and Lidarr share the
//!   same download-client API shape, differing only in path version; one
//!   client covers all three.
//! - **Download clients** ([`QbitClient`], [`SabnzbdClient`],
//!   [`NzbgetClient`]): pause/resume of all transfers.
//!
//! Everything is synchronous: the orchestrator is a single-threaded
//! poll/sleep loop, and these calls sit on its startup, per-task, and
//! shutdown paths where blocking is fine. All failures are typed
//! [`ClientError`] values; nothing panics.

pub mod arr;
pub mod download;
pub mod error;
pub mod plex;

pub use arr::ArrClient;
pub use download::{NzbgetClient, QbitClient, SabnzbdClient};
pub use error::{ClientError, Result};
pub use plex::{ButlerWindow, PlexClient};
