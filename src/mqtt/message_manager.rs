use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const ON: &str = "on";
pub const OFF: &str = "off";

/// Last-will payload on `<prefix>/connected` when the bridge drops off the broker
pub const BROKER_OFFLINE_PAYLOAD: &str = "0";

/// Value published on a status topic: `{"val": "on", "ts": <unix millis>}`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StatusValue {
    #[serde(rename = "val")]
    pub value: String,

    #[serde(rename = "ts", with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
}

impl StatusValue {
    pub fn new(value: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            time,
        }
    }

    /// `"on"` for a running station, `"off"` otherwise
    pub fn on_off(on: bool, time: DateTime<Utc>) -> Self {
        Self::new(if on { ON } else { OFF }, time)
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} @ {}", self.value, self.time.format("%H:%M:%S%.3f"))
    }
}

/// Connectivity between the bridge and the controller
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    /// mqtt-smarthome `connected` value: the broker link is implied by the
    /// message arriving at all, so only `1` and `2` are ever sent by the bridge.
    pub fn payload(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "1",
            ConnectionState::Connected => "2",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Decoded payload of an inbound `set` message.
///
/// Accepts the plain text forms (`on`, `45`), a JSON string (`"on"`) and the
/// mqtt-smarthome object form (`{"val": "on"}`). Anything that does not carry a
/// string ends up in one of the non-text variants.
#[derive(Clone, Debug, PartialEq)]
pub enum PayloadValue {
    Text(String),
    Json(Value),
    Binary(Vec<u8>),
}

impl PayloadValue {
    pub fn decode(payload: &[u8]) -> Self {
        let Ok(text) = std::str::from_utf8(payload) else {
            return PayloadValue::Binary(payload.to_vec());
        };

        match serde_json::from_str::<Value>(text) {
            Ok(Value::String(s)) => PayloadValue::Text(s),
            Ok(Value::Object(mut object)) => match object.remove("val") {
                Some(Value::String(s)) => PayloadValue::Text(s),
                Some(other) => PayloadValue::Json(other),
                None => PayloadValue::Json(Value::Object(object)),
            },
            Ok(array @ Value::Array(_)) => PayloadValue::Json(array),
            // bare numbers, booleans and non-JSON text are taken literally
            _ => PayloadValue::Text(text.trim().to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// What an inbound topic addresses
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Set(String),
    Get(String),
    Command,
}

/// Topic names below one prefix
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn status(&self, item: &str) -> String {
        format!("{}/status/{}", self.prefix, item)
    }

    pub fn connected(&self) -> String {
        format!("{}/connected", self.prefix)
    }

    pub fn subscriptions(&self) -> [String; 3] {
        [
            format!("{}/set/+", self.prefix),
            format!("{}/get/+", self.prefix),
            format!("{}/command", self.prefix),
        ]
    }

    /// Maps an inbound topic to its handler; `None` for topics outside the prefix.
    pub fn route(&self, topic: &str) -> Option<Route> {
        let rest = topic.strip_prefix(&self.prefix)?.strip_prefix('/')?;

        if rest == "command" {
            return Some(Route::Command);
        }

        let (kind, item) = rest.split_once('/')?;
        if item.is_empty() || item.contains('/') {
            return None;
        }

        match kind {
            "set" => Some(Route::Set(item.to_string())),
            "get" => Some(Route::Get(item.to_string())),
            _ => None,
        }
    }
}
