//! OpenSprinkler controller adapter
//!
//! The bridge talks to the controller through the [`StationController`] trait;
//! [`client::OpenSprinklerClient`] implements it over HTTP:
//!
//! ```text
//! GET <base>/js                       -> {"sn": [0, 1, 0, ...], "nstations": 8}
//! GET <base>/cm?sid=<i>&en=<0|1>&t=<s> -> response body ignored
//! ```

pub mod client;
pub mod error;
pub mod status;

use std::future::Future;

pub use client::OpenSprinklerClient;
pub use error::ControllerApiError;
pub use status::{RunRequest, StationStatus};

/// Source of truth for station state and sink for station commands
pub trait StationController: Send + Sync + 'static {
    /// Fetches and decodes the current state of every station.
    fn station_status(
        &self,
    ) -> impl Future<Output = Result<StationStatus, ControllerApiError>> + Send;

    /// Switches a single station on or off. Success only means the controller
    /// answered with a 2xx status.
    fn run_station(
        &self,
        request: &RunRequest,
    ) -> impl Future<Output = Result<(), ControllerApiError>> + Send;
}
