//! Broker connection with statum state machine
//!
//! # State Machine
//!
//! ```text
//! Configured ──connect()──► Connected ──run()──► (event loop until cancelled)
//! ```
//!
//! `connect()` waits for the broker's CONNACK so an unreachable broker is a
//! startup error. Once running, connection losses are logged and rumqttc
//! reconnects on the next poll; subscriptions are renewed on every CONNACK.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS};
use statum::{machine, state, transition};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::message_manager::BROKER_OFFLINE_PAYLOAD;
use super::{
    ConnectionState, InboundHandler, MqttConfig, MqttError, PayloadValue, Route, StatusPublisher,
    StatusValue, Topics,
};

const CHANNEL_CAPACITY: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[state]
#[derive(Debug, Clone)]
pub enum LinkState {
    Configured,
    Connected,
}

#[machine]
pub struct MqttLink<LinkState> {
    client: AsyncClient,
    eventloop: EventLoop,
    topics: Topics,
    config: MqttConfig,
}

impl<S: LinkStateTrait> MqttLink<S> {
    /// Cloneable publishing handle sharing this link's client
    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher::new(self.client.clone(), self.topics.clone())
    }

    fn subscribe(&self) -> Result<(), MqttError> {
        for topic in self.topics.subscriptions() {
            debug!("Subscribing to {}", topic);
            self.client.try_subscribe(topic, QoS::AtLeastOnce)?;
        }
        Ok(())
    }
}

impl MqttLink<Configured> {
    pub fn create(config: MqttConfig) -> Self {
        let topics = Topics::new(&config.prefix);

        let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive);
        options.set_last_will(LastWill::new(
            topics.connected(),
            BROKER_OFFLINE_PAYLOAD,
            QoS::AtLeastOnce,
            true,
        ));
        if let Some((user, password)) = &config.credentials {
            options.set_credentials(user.clone(), password.clone());
        }

        let (client, eventloop) = AsyncClient::new(options, CHANNEL_CAPACITY);
        debug!(
            "Created MQTT client {} for {}:{}",
            config.client_id, config.host, config.port
        );

        Self::builder()
            .client(client)
            .eventloop(eventloop)
            .topics(topics)
            .config(config)
            .build()
    }

    /// Opens the broker connection and subscribes to the inbound topics.
    pub async fn connect(mut self) -> Result<MqttLink<Connected>, MqttError> {
        info!(
            "Connecting to MQTT broker {}:{}",
            self.config.host, self.config.port
        );

        tokio::time::timeout(CONNECT_TIMEOUT, self.await_connack())
            .await
            .map_err(|_| MqttError::ConnectTimeout(CONNECT_TIMEOUT))??;

        self.subscribe()?;
        info!("Connected to MQTT broker, prefix '{}'", self.topics.prefix());
        Ok(self.into_connected())
    }

    async fn await_connack(&mut self) -> Result<(), MqttError> {
        loop {
            match self.eventloop.poll().await? {
                Event::Incoming(Packet::ConnAck(ack)) => {
                    debug!("CONNACK received: {:?}", ack.code);
                    return Ok(());
                }
                other => debug!("Event before CONNACK: {:?}", other),
            }
        }
    }
}

#[transition]
impl MqttLink<Configured> {
    fn into_connected(self) -> MqttLink<Connected> {
        self.transition()
    }
}

impl MqttLink<Connected> {
    /// Drives the event loop and hands inbound messages to `handler` until
    /// `cancel` fires.
    pub async fn run<H: InboundHandler>(mut self, handler: Arc<H>, cancel: CancellationToken) {
        info!("MQTT event loop started");

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = self.eventloop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.dispatch(&handler, &publish.topic, publish.payload.to_vec());
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Reconnected to MQTT broker");
                    if let Err(e) = self.subscribe() {
                        error!("Failed to renew subscriptions: {}", e);
                    }
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move { handler.broker_reconnected().await });
                }
                Ok(other) => debug!("MQTT event: {:?}", other),
                Err(e) => {
                    warn!("MQTT connection error: {}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }

        self.shutdown().await;
    }

    fn dispatch<H: InboundHandler>(&self, handler: &Arc<H>, topic: &str, payload: Vec<u8>) {
        let Some(route) = self.topics.route(topic) else {
            debug!("Ignoring message on {}", topic);
            return;
        };

        let handler = Arc::clone(handler);
        let publisher = self.publisher();
        tokio::spawn(async move { route_message(route, &payload, &*handler, &publisher).await });
    }

    /// Announces the broker-offline value and flushes the disconnect.
    async fn shutdown(mut self) {
        info!("Stopping MQTT event loop");

        let offline = self.client.try_publish(
            self.topics.connected(),
            QoS::AtLeastOnce,
            true,
            BROKER_OFFLINE_PAYLOAD,
        );
        if let Err(e) = offline.and_then(|_| self.client.try_disconnect()) {
            warn!("Failed to queue disconnect: {}", e);
            return;
        }

        let drain = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("MQTT disconnect did not complete in time");
        }
    }
}

/// Hands one routed message to `handler`; a `get` that finds its item is
/// answered on the item's status topic.
pub async fn route_message<H, P>(route: Route, payload: &[u8], handler: &H, publisher: &P)
where
    H: InboundHandler,
    P: StatusPublisher,
{
    match route {
        Route::Set(item) => handler.set(&item, PayloadValue::decode(payload)).await,
        Route::Get(item) => {
            let Some(value) = handler.get(&item).await else {
                debug!("No value for get {}", item);
                return;
            };
            if let Err(e) = publisher.publish_status(&item, &value).await {
                error!("Failed to answer get for {}: {}", item, e);
            }
        }
        Route::Command => handler.command(payload).await,
    }
}

/// Publishing half of the link, handed to the bridge core
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    topics: Topics,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient, topics: Topics) -> Self {
        Self { client, topics }
    }
}

impl StatusPublisher for MqttPublisher {
    async fn publish_status(&self, item: &str, value: &StatusValue) -> Result<(), MqttError> {
        let payload = value.to_payload()?;
        debug!("Publishing {} -> {}", self.topics.status(item), value);
        self.client
            .publish(self.topics.status(item), QoS::AtLeastOnce, true, payload)
            .await?;
        Ok(())
    }

    async fn publish_connection(&self, state: ConnectionState) -> Result<(), MqttError> {
        debug!("Publishing {} -> {}", self.topics.connected(), state);
        self.client
            .publish(self.topics.connected(), QoS::AtLeastOnce, true, state.payload())
            .await?;
        Ok(())
    }
}
