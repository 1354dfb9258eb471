//! opensprinkler2mqtt
//!
//! Polls an OpenSprinkler controller for station state, publishes changes to
//! MQTT and forwards MQTT `set` commands back to the controller.
//!
//! - [`config`] - Settings from environment, TOML file and defaults
//! - [`opensprinkler`] - HTTP adapter for the controller
//! - [`mqtt`] - Broker connection, topics and payloads
//! - [`bridge`] - Snapshot diffing and command handling
//! - [`server`] - Startup and lifecycle
//! - [`shutdown`] - SIGINT/SIGTERM handling

pub mod bridge;
pub mod config;
pub mod mqtt;
pub mod opensprinkler;
pub mod server;
pub mod shutdown;

pub use bridge::StationBridge;
pub use config::BridgeConfig;
pub use server::{BridgeServer, ServerError};
