use std::time::Duration;

use url::Url;

use super::MqttError;
use crate::config::BridgeConfig;

const DEFAULT_PORT: u16 = 1883;
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Everything needed to open the broker connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub credentials: Option<(String, String)>,
    pub prefix: String,
    pub keep_alive: Duration,
}

impl MqttConfig {
    /// Parses `tcp://[user[:password]@]host[:port]` (or `mqtt://`) from the bridge
    /// configuration.
    pub fn from_bridge_config(config: &BridgeConfig) -> Result<Self, MqttError> {
        let invalid = |reason: String| MqttError::InvalidBrokerUrl {
            url: config.mqtt_url.clone(),
            reason,
        };

        let url = Url::parse(&config.mqtt_url).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "tcp" | "mqtt" => {}
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();

        let credentials = if url.username().is_empty() {
            None
        } else {
            Some((
                url.username().to_string(),
                url.password().unwrap_or_default().to_string(),
            ))
        };

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            client_id: config.mqtt_client_id.clone(),
            credentials,
            prefix: config.mqtt_prefix.clone(),
            keep_alive: KEEP_ALIVE,
        })
    }
}
