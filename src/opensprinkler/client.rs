use std::time::Duration;

use reqwest::Response;
use tracing::debug;
use url::Url;

use super::{ControllerApiError, RunRequest, StationController, StationStatus};

const STATUS_PATH: &str = "js";
const COMMAND_PATH: &str = "cm";
const USER_AGENT: &str = concat!("opensprinkler2mqtt/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the OpenSprinkler JSON API
#[derive(Clone, Debug)]
pub struct OpenSprinklerClient {
    http: reqwest::Client,
    status_url: Url,
    command_url: Url,
    password_hash: Option<String>,
}

impl OpenSprinklerClient {
    /// Builds a client for the controller at `base_url`.
    ///
    /// `timeout` of `None` leaves requests unbounded, so a hung controller stalls
    /// the caller until the connection drops.
    pub fn new(
        base_url: &str,
        password_hash: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ControllerApiError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let base_url = Url::parse(base_url)?;
        Self::with_client(builder.build()?, base_url, password_hash)
    }

    /// Uses an already configured `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        mut base_url: Url,
        password_hash: Option<String>,
    ) -> Result<Self, ControllerApiError> {
        // Url::join replaces the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            status_url: base_url.join(STATUS_PATH)?,
            command_url: base_url.join(COMMAND_PATH)?,
            password_hash,
        })
    }

    pub fn status_url(&self) -> &Url {
        &self.status_url
    }

    pub fn command_url(&self) -> &Url {
        &self.command_url
    }

    async fn get(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<Response, ControllerApiError> {
        let mut request = self.http.get(url.clone());
        if let Some(pw) = &self.password_hash {
            request = request.query(&[("pw", pw.as_str())]);
        }

        let response = request.query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ControllerApiError::Status {
                status: status.as_u16(),
                path: url.path().to_string(),
            });
        }
        Ok(response)
    }
}

impl StationController for OpenSprinklerClient {
    async fn station_status(&self) -> Result<StationStatus, ControllerApiError> {
        let body = self.get(&self.status_url, &[]).await?.text().await?;

        let status: StationStatus = serde_json::from_str(&body).map_err(|e| {
            ControllerApiError::Deserialization {
                message: e.to_string(),
                body,
            }
        })?;

        debug!(
            stations = status.stations.len(),
            nstations = ?status.nstations,
            "Fetched station status"
        );
        Ok(status)
    }

    async fn run_station(&self, request: &RunRequest) -> Result<(), ControllerApiError> {
        debug!(
            station = request.station,
            enable = request.enable,
            duration = ?request.duration,
            "Sending station command"
        );
        self.get(&self.command_url, &request.query()).await?;
        Ok(())
    }
}
