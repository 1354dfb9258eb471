use crate::mqtt::message_manager::{OFF, ON};
use crate::mqtt::PayloadValue;
use crate::opensprinkler::RunRequest;

/// Run time used for a plain `on`
pub const DEFAULT_RUN_SECONDS: &str = "60";

/// What a `set` payload asks the controller to do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StationCommand {
    Off,
    /// Run for [`DEFAULT_RUN_SECONDS`]
    On,
    /// Run for the given number of seconds. The text is passed to the controller
    /// as-is; the controller decides what to do with non-numeric values.
    RunFor(String),
}

impl StationCommand {
    pub fn parse(value: &str) -> Self {
        match value {
            OFF => StationCommand::Off,
            ON => StationCommand::On,
            other => StationCommand::RunFor(other.to_string()),
        }
    }

    pub fn enables(&self) -> bool {
        !matches!(self, StationCommand::Off)
    }

    pub fn to_request(&self, station: usize) -> RunRequest {
        let duration = match self {
            StationCommand::Off => None,
            StationCommand::On => Some(DEFAULT_RUN_SECONDS.to_string()),
            StationCommand::RunFor(seconds) => Some(seconds.clone()),
        };

        RunRequest {
            station,
            enable: self.enables(),
            duration,
        }
    }
}

/// A well-formed inbound `set`: station index, command and the original payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetRequest {
    pub station: usize,
    pub command: StationCommand,
    pub payload: String,
}

impl SetRequest {
    /// `None` when the item is not a station index or the payload is not text.
    pub fn parse(item: &str, value: &PayloadValue) -> Option<Self> {
        let station = item.parse::<usize>().ok()?;
        let payload = value.as_text()?.to_string();

        Some(Self {
            station,
            command: StationCommand::parse(&payload),
            payload,
        })
    }
}
