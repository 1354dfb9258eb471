//! Bridge core
//!
//! Owns the retained station snapshot and the controller connection state, and
//! mediates between the polled controller and the message bus:
//!
//! ```text
//!            poll (tick)                      status/<i>, connected
//! Controller ───────────► StationBridge ──────────────────────────► Broker
//!     ▲                      │    ▲
//!     └──── /cm (set) ───────┘    └──────── set/<i>, get/<i> ──────────┘
//! ```
//!
//! - [`snapshot`] - Retained per-station values, resize and diff
//! - [`command`] - Parsing of inbound `set` payloads
//! - [`station_bridge`] - Tick, command, query and connectivity handling

pub mod command;
pub mod snapshot;
pub mod station_bridge;

pub use command::{SetRequest, StationCommand, DEFAULT_RUN_SECONDS};
pub use snapshot::{StationChange, StationSnapshot};
pub use station_bridge::StationBridge;
