//! # MQTT Integration Module
//!
//! Connects the bridge to an MQTT broker using the mqtt-smarthome topic layout:
//!
//! ```text
//! <prefix>/connected        <- "0" broker lost (last will), "1" controller unreachable, "2" all up
//! <prefix>/status/<item>    <- {"val": "on", "ts": 1700000000000}   (retained)
//! <prefix>/set/<item>       -> "on" | "off" | "<seconds>"
//! <prefix>/get/<item>       -> answered on <prefix>/status/<item>
//! <prefix>/command          -> raw payload, accepted and ignored
//! ```
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker URL parsing and client options
//! ├── message_manager.rs  - Status payloads, inbound payload decoding, topic routing
//! └── mqtt_handler.rs     - Connection state machine, event loop, publisher
//! ```
//!
//! The bridge core only sees the two traits below, so it can be driven by an
//! in-memory bus in tests.

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;

use std::future::Future;
use std::time::Duration;

pub use config::MqttConfig;
pub use message_manager::{ConnectionState, PayloadValue, Route, StatusValue, Topics};
pub use mqtt_handler::{MqttLink, MqttPublisher};

/// Errors raised by the MQTT side of the bridge
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    #[error("Invalid broker URL {url}: {reason}")]
    InvalidBrokerUrl { url: String, reason: String },

    #[error("Broker connection failed: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("Broker did not acknowledge the connection within {0:?}")]
    ConnectTimeout(Duration),

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outgoing side of the bus as seen by the bridge
pub trait StatusPublisher: Send + Sync + 'static {
    /// Publishes the value of one item on `<prefix>/status/<item>`.
    fn publish_status(
        &self,
        item: &str,
        value: &StatusValue,
    ) -> impl Future<Output = Result<(), MqttError>> + Send;

    /// Publishes the controller connectivity on `<prefix>/connected`.
    fn publish_connection(
        &self,
        state: ConnectionState,
    ) -> impl Future<Output = Result<(), MqttError>> + Send;
}

/// Receiver of inbound bus messages.
///
/// Every call runs on its own task, so implementations may publish and await
/// without blocking the MQTT event loop.
pub trait InboundHandler: Send + Sync + 'static {
    /// Message on `<prefix>/set/<item>`
    fn set(&self, item: &str, value: PayloadValue) -> impl Future<Output = ()> + Send;

    /// Message on `<prefix>/get/<item>`; `None` means the item is unknown.
    fn get(&self, item: &str) -> impl Future<Output = Option<StatusValue>> + Send;

    /// Message on `<prefix>/command`
    fn command(&self, payload: &[u8]) -> impl Future<Output = ()> + Send;

    /// Called after the client re-established a lost broker connection.
    fn broker_reconnected(&self) -> impl Future<Output = ()> + Send;
}
