use serde::{Deserialize, Serialize};

/// Station part of the controller's `/js` document.
///
/// `sn` holds one integer per station, indexed from zero; `0` means off and any
/// other value means on. Newer firmware also reports `nstations`.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StationStatus {
    #[serde(rename = "sn")]
    pub stations: Vec<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nstations: Option<usize>,
}

impl StationStatus {
    pub fn new(stations: Vec<i64>) -> Self {
        Self {
            stations,
            nstations: None,
        }
    }
}

/// Parameters of one `/cm` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRequest {
    pub station: usize,
    pub enable: bool,
    /// Run time in seconds as sent to the controller; `None` is sent as `t=`
    pub duration: Option<String>,
}

impl RunRequest {
    pub fn query(&self) -> [(&'static str, String); 3] {
        [
            ("sid", self.station.to_string()),
            ("en", if self.enable { "1" } else { "0" }.to_string()),
            ("t", self.duration.clone().unwrap_or_default()),
        ]
    }
}
