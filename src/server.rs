//! Bridge startup and lifecycle
//!
//! Wires the configuration into the controller client, the MQTT link and the
//! bridge core, then runs the poll loop and the MQTT event loop side by side:
//!
//! ```text
//! BridgeConfig ──► MqttLink::connect ──► StationBridge ──┬─► poll loop   (this task)
//!                  OpenSprinklerClient                    └─► MQTT loop   (spawned)
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::bridge::StationBridge;
use crate::config::BridgeConfig;
use crate::mqtt::{MqttConfig, MqttError, MqttLink};
use crate::opensprinkler::{ControllerApiError, OpenSprinklerClient};

/// Startup failures; everything after startup is handled inside the loops
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Controller client error: {0}")]
    Controller(#[from] ControllerApiError),

    #[error("MQTT error: {0}")]
    Mqtt(#[from] MqttError),
}

pub struct BridgeServer {
    config: BridgeConfig,
}

impl BridgeServer {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Connects to the broker, polls once and keeps polling until `cancel`
    /// fires.
    ///
    /// Returns an error only if the broker connection cannot be established.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ServerError> {
        let controller = OpenSprinklerClient::new(
            &self.config.opensprinkler_url,
            self.config.password_hash.clone(),
            self.config.http_timeout,
        )?;
        let mqtt_config = MqttConfig::from_bridge_config(&self.config)?;

        let link = MqttLink::create(mqtt_config).connect().await?;
        let bridge = Arc::new(StationBridge::new(controller, link.publisher()));

        let mqtt_task = tokio::spawn(link.run(Arc::clone(&bridge), cancel.clone()));

        bridge
            .run_poll_loop(self.config.poll_interval, cancel.clone())
            .await;

        cancel.cancel();
        if let Err(e) = mqtt_task.await {
            error!("MQTT task ended abnormally: {}", e);
        }

        info!("Bridge stopped");
        Ok(())
    }
}
