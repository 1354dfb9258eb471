use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::command::SetRequest;
use super::snapshot::StationSnapshot;
use crate::mqtt::{ConnectionState, InboundHandler, PayloadValue, StatusPublisher, StatusValue};
use crate::opensprinkler::{ControllerApiError, StationController, StationStatus};

/// State shared between the poll loop and the inbound handlers
#[derive(Debug, Default)]
struct BridgeState {
    stations: StationSnapshot,
    connection: ConnectionState,
}

/// Mirrors controller station state onto the bus and forwards bus commands to
/// the controller.
///
/// The retained snapshot and the connection state sit behind a single lock that
/// is held for every read-modify-publish sequence, so a command's optimistic
/// update and a tick's authoritative update never interleave.
pub struct StationBridge<C, P> {
    controller: C,
    publisher: P,
    state: Mutex<BridgeState>,
}

impl<C, P> StationBridge<C, P>
where
    C: StationController,
    P: StatusPublisher,
{
    pub fn new(controller: C, publisher: P) -> Self {
        Self {
            controller,
            publisher,
            state: Mutex::new(BridgeState::default()),
        }
    }

    /// Polls the controller once and publishes every station that changed.
    ///
    /// On failure the retained snapshot is left untouched; in both cases the
    /// connection state follows the outcome.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<StationStatus, ControllerApiError> {
        let fetched = self.controller.station_status().await;

        let mut state = self.state.lock().await;
        match fetched {
            Ok(status) => {
                let changes = state.stations.changes_to(&status.stations);
                if !changes.is_empty() {
                    debug!("{} station(s) changed", changes.len());
                }

                for change in changes {
                    let item = change.station.to_string();
                    let value = StatusValue::on_off(change.on, now);
                    if let Err(e) = self.publisher.publish_status(&item, &value).await {
                        error!(station = change.station, "Failed to publish status: {}", e);
                    }
                }

                state.stations.replace(&status.stations);
                self.update_connection(&mut state, ConnectionState::Connected)
                    .await;
                Ok(status)
            }
            Err(e) => {
                warn!("Failed to poll controller: {}", e);
                self.update_connection(&mut state, ConnectionState::Disconnected)
                    .await;
                Err(e)
            }
        }
    }

    /// Ticks once immediately, then every `period` until `cancel` fires.
    pub async fn run_poll_loop(&self, period: Duration, cancel: CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }

        info!("Polling controller every {:?}", period);
        let _ = self.tick(Utc::now()).await;

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Poll loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let _ = self.tick(Utc::now()).await;
                }
            }
        }
    }

    /// Handles `set` for one station.
    ///
    /// Malformed items and non-text payloads are dropped silently. A failed
    /// controller call is logged and changes nothing. On success the station is
    /// marked on/off right away and the original payload is republished.
    pub async fn set_station(&self, item: &str, value: PayloadValue) {
        let Some(request) = SetRequest::parse(item, &value) else {
            return;
        };

        let run = request.command.to_request(request.station);
        if let Err(e) = self.controller.run_station(&run).await {
            error!(station = request.station, "Station command failed: {}", e);
            return;
        }

        let mut state = self.state.lock().await;
        if !state.stations.set(request.station, run.enable) {
            debug!(
                station = request.station,
                "Station not in retained snapshot yet, next poll will pick it up"
            );
        }

        let echo = StatusValue::new(request.payload, Utc::now());
        if let Err(e) = self.publisher.publish_status(item, &echo).await {
            error!(station = request.station, "Failed to publish status: {}", e);
        }
    }

    /// Last known value of one station, timestamped with the query time.
    pub async fn station_value(&self, item: &str) -> Option<StatusValue> {
        let station = item.parse::<usize>().ok()?;
        let state = self.state.lock().await;
        state
            .stations
            .is_on(station)
            .map(|on| StatusValue::on_off(on, Utc::now()))
    }

    /// Copy of the retained snapshot
    pub async fn retained_stations(&self) -> Vec<i64> {
        self.state.lock().await.stations.as_slice().to_vec()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.state.lock().await.connection
    }

    async fn update_connection(&self, state: &mut BridgeState, next: ConnectionState) {
        if state.connection == next {
            return;
        }

        info!("Controller {}", next);
        state.connection = next;
        if let Err(e) = self.publisher.publish_connection(next).await {
            error!("Failed to publish connection state: {}", e);
        }
    }
}

impl<C, P> InboundHandler for StationBridge<C, P>
where
    C: StationController,
    P: StatusPublisher,
{
    async fn set(&self, item: &str, value: PayloadValue) {
        self.set_station(item, value).await;
    }

    async fn get(&self, item: &str) -> Option<StatusValue> {
        self.station_value(item).await
    }

    async fn command(&self, _payload: &[u8]) {}

    async fn broker_reconnected(&self) {
        let state = self.state.lock().await;
        if let Err(e) = self.publisher.publish_connection(state.connection).await {
            error!("Failed to republish connection state: {}", e);
        }
    }
}
