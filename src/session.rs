//! The Home Assistant session façade.
//!
//! [`Session`] wraps an [`MqttClient`] and turns its raw events into the
//! Home Assistant availability contract:
//!
//! - before connecting it registers `offline` (retained) as the last will on
//!   `homeassistant/sensor/{node_id}/availability`;
//! - once the broker accepts the connection it subscribes to `hass/status` and
//!   publishes `online` (retained) on the same availability topic;
//! - every event is then forwarded to an optional user hook.
//!
//! # Polling
//!
//! The session has no thread of its own. Call [`Session::poll`] repeatedly;
//! each call runs one iteration of the client and dispatches at most one
//! event, synchronously, on the calling thread. Drivers that receive events
//! through other means can push them with [`Session::handle_event`].
//!
//! # Hooks
//!
//! Hooks are plain function pointers that receive the session itself, so they
//! can publish, subscribe or inspect state while handling an event:
//!
//! ```rust
//! use homeassistant_mqtt::{Error, MqttClient, Session};
//!
//! fn on_message<C: MqttClient>(
//!     session: &mut Session<C>,
//!     levels: &[&str],
//!     payload: &[u8],
//! ) -> Result<(), Error<C::Error>> {
//!     if levels == ["hass", "status"] && payload == b"online" {
//!         // Home Assistant restarted; re-announce ourselves here.
//!         let _ = session.node_id();
//!     }
//!     Ok(())
//! }
//! ```

use core::fmt;

use log::{Level, LevelFilter};

use crate::client::{Event, MqttClient, PublishPacket, QoS};
use crate::config::Config;
use crate::error::{ConfigurationError, ConnectionError, Error, InvalidStateError};
use crate::logger::LogLevel;
use crate::topic::{self, AvailabilityTopic, TopicLevels};

/// Result type returned by hooks and session operations.
pub type HookResult<C> = Result<(), Error<<C as MqttClient>::Error>>;

/// Called after the session handled a successful connect acknowledgment.
pub type ConnectFn<C> = fn(session: &mut Session<C>) -> HookResult<C>;

/// Called after the session handled a disconnect.
pub type DisconnectFn<C> = fn(session: &mut Session<C>) -> HookResult<C>;

/// Called for every delivered message with the topic split on `/`.
pub type MessageFn<C> =
    fn(session: &mut Session<C>, levels: &[&str], payload: &[u8]) -> HookResult<C>;

/// Called when the broker acknowledges a subscription.
pub type SubscribeFn<C> =
    fn(session: &mut Session<C>, user_data: u32, topic: &str, qos: QoS) -> HookResult<C>;

/// Called when the broker acknowledges an unsubscription.
pub type UnsubscribeFn<C> =
    fn(session: &mut Session<C>, user_data: u32, topic: &str, packet_id: u16) -> HookResult<C>;

/// A Home Assistant session on top of an MQTT client.
///
/// The session is the only consumer of the client's events. It owns the
/// client; pass `&mut client` to keep ownership outside.
///
/// Dropping a session that is still connected disconnects the client.
pub struct Session<C: MqttClient> {
    client: C,
    config: Config,
    availability_topic: AvailabilityTopic,
    connected: bool,
    last_connect: Option<u64>,
    last_disconnect: Option<u64>,
    logging_enabled: bool,
    on_connect: Option<ConnectFn<C>>,
    on_disconnect: Option<DisconnectFn<C>>,
    on_message: Option<MessageFn<C>>,
    on_subscribe: Option<SubscribeFn<C>>,
    on_unsubscribe: Option<UnsubscribeFn<C>>,
}

impl<C: MqttClient> Session<C> {
    /// Wraps `client` with the given configuration.
    ///
    /// # Errors
    ///
    /// * [`ConfigurationError::MissingUsername`] - the client has no (or an
    ///   empty) username. MQTT treats it as optional, Home Assistant does not.
    /// * [`ConfigurationError::InvalidNodeId`] - the node id cannot be used in
    ///   a topic path.
    pub fn new(mut client: C, config: Config) -> Result<Self, Error<C::Error>> {
        match client.username() {
            Some(username) if !username.is_empty() => {}
            _ => return Err(ConfigurationError::MissingUsername.into()),
        }

        let availability_topic = topic::availability_topic(&config.node_id)?;

        let logging_enabled = match client.logger() {
            Some(logger) => {
                logger.set_level(LevelFilter::Debug);
                true
            }
            None => false,
        };

        log::debug!(
            "home assistant session for node {} (logger attached: {})",
            config.node_id,
            logging_enabled
        );

        Ok(Self {
            client,
            config,
            availability_topic,
            connected: false,
            last_connect: None,
            last_disconnect: None,
            logging_enabled,
            on_connect: None,
            on_disconnect: None,
            on_message: None,
            on_subscribe: None,
            on_unsubscribe: None,
        })
    }

    /// Wraps `client` with [`Config::default`].
    pub fn with_defaults(client: C) -> Result<Self, Error<C::Error>> {
        Self::new(client, Config::default())
    }

    /// Registers the last will and asks the client to connect.
    ///
    /// The session only counts as connected once the broker's acknowledgment
    /// has been dispatched by [`poll`](Self::poll).
    ///
    /// # Errors
    ///
    /// [`ConnectionError::Connect`] wrapping the client's error.
    pub fn connect(&mut self) -> Result<(), Error<C::Error>> {
        log::debug!("registering last will on {}", self.availability_topic);
        let result = self
            .client
            .will_set(
                &self.availability_topic,
                topic::OFFLINE.as_bytes(),
                QoS::AtMostOnce,
                true,
            )
            .and_then(|()| self.client.connect());

        result.map_err(|err| {
            log::warn!("unable to connect to Home Assistant: {:?}", err);
            Error::Connection(ConnectionError::Connect(err))
        })
    }

    /// Asks the client to reconnect.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::Reconnect`] wrapping the client's error.
    pub fn reconnect(&mut self) -> Result<(), Error<C::Error>> {
        self.client.reconnect().map_err(|err| {
            log::warn!("unable to reconnect to Home Assistant: {:?}", err);
            Error::Connection(ConnectionError::Reconnect(err))
        })
    }

    /// Disconnects from the broker. Does nothing when not connected.
    pub fn disconnect(&mut self) -> Result<(), Error<C::Error>> {
        if !self.connected {
            return Ok(());
        }
        self.client.disconnect().map_err(Error::Client)
    }

    /// The client's own connection flag.
    ///
    /// This can differ from [`connected`](Self::connected) between a broken
    /// socket and the disconnect event that reports it.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Whether the session has handled a successful connect acknowledgment
    /// and no disconnect since.
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Runs one iteration of the client and dispatches the event it produced,
    /// if any.
    pub fn poll(&mut self) -> Result<(), Error<C::Error>> {
        match self.client.poll().map_err(Error::Client)? {
            Some(event) => self.handle_event(event),
            None => Ok(()),
        }
    }

    /// Dispatches one client event to the internal handlers and then to the
    /// matching hook.
    pub fn handle_event(&mut self, event: Event) -> Result<(), Error<C::Error>> {
        match event {
            Event::Connect { return_code } => self.on_connect_mqtt(return_code),
            Event::Disconnect { return_code } => self.on_disconnect_mqtt(return_code),
            Event::Message(packet) => self.on_message_mqtt(packet),
            Event::Subscribe {
                user_data,
                topic,
                qos,
            } => self.on_subscribe_mqtt(user_data, &topic, qos),
            Event::Unsubscribe {
                user_data,
                topic,
                packet_id,
            } => self.on_unsubscribe_mqtt(user_data, &topic, packet_id),
        }
    }

    /// Sets the client logger's severity by name.
    ///
    /// Accepts `DEBUG`, `INFO`, `WARNING` and `ERROR`.
    ///
    /// # Errors
    ///
    /// * [`ConfigurationError::UnknownLogLevel`] - any other name.
    /// * [`ConfigurationError::NoLogger`] - the client has no logger.
    pub fn set_logger_level(&mut self, level: &str) -> Result<(), Error<C::Error>> {
        let level: LogLevel = level.parse()?;
        let logger = self.client.logger().ok_or(ConfigurationError::NoLogger)?;
        logger.set_level(level.into());
        Ok(())
    }

    fn on_connect_mqtt(&mut self, return_code: u8) -> Result<(), Error<C::Error>> {
        self.trace("Client called on_connect.");
        if return_code != 0 {
            log::warn!("broker refused connection with return code {}", return_code);
            return Err(ConnectionError::Refused(return_code).into());
        }

        self.client
            .subscribe(topic::STATUS_TOPIC, QoS::AtMostOnce)
            .map_err(Error::Client)?;
        self.client
            .publish(
                &self.availability_topic,
                topic::ONLINE.as_bytes(),
                QoS::AtMostOnce,
                true,
            )
            .map_err(Error::Client)?;
        self.connected = true;
        self.last_connect = Some(self.now());
        log::info!("connected to Home Assistant as {}", self.config.node_id);

        match self.on_connect {
            Some(hook) => hook(self),
            None => Ok(()),
        }
    }

    fn on_disconnect_mqtt(&mut self, return_code: u8) -> Result<(), Error<C::Error>> {
        self.trace("Client called on_disconnect.");
        self.connected = false;
        self.last_disconnect = Some(self.now());
        log::info!("disconnected from Home Assistant (code {})", return_code);

        match self.on_disconnect {
            Some(hook) => hook(self),
            None => Ok(()),
        }
    }

    fn on_message_mqtt(&mut self, packet: PublishPacket) -> Result<(), Error<C::Error>> {
        self.trace("Client called on_message.");
        let hook = self.on_message.ok_or(InvalidStateError::NoMessageHandler)?;
        let levels = TopicLevels::split(&packet.topic)?;
        hook(self, &levels, &packet.payload)
    }

    fn on_subscribe_mqtt(
        &mut self,
        user_data: u32,
        topic: &str,
        qos: QoS,
    ) -> Result<(), Error<C::Error>> {
        self.trace("Client called on_subscribe.");
        match self.on_subscribe {
            Some(hook) => hook(self, user_data, topic, qos),
            None => Ok(()),
        }
    }

    fn on_unsubscribe_mqtt(
        &mut self,
        user_data: u32,
        topic: &str,
        packet_id: u16,
    ) -> Result<(), Error<C::Error>> {
        self.trace("Client called on_unsubscribe.");
        match self.on_unsubscribe {
            Some(hook) => hook(self, user_data, topic, packet_id),
            None => Ok(()),
        }
    }

    fn trace(&mut self, message: &str) {
        if self.config.debug {
            log::debug!("{}", message);
        }
        if self.logging_enabled {
            if let Some(logger) = self.client.logger() {
                logger.log(Level::Debug, message);
            }
        }
    }

    fn now(&self) -> u64 {
        (self.config.clock)()
    }

    /// Sets or clears the connect hook.
    pub fn set_on_connect(&mut self, hook: Option<ConnectFn<C>>) {
        self.on_connect = hook;
    }

    /// Sets or clears the disconnect hook.
    pub fn set_on_disconnect(&mut self, hook: Option<DisconnectFn<C>>) {
        self.on_disconnect = hook;
    }

    /// Sets or clears the message hook. Messages are an error without one.
    pub fn set_on_message(&mut self, hook: Option<MessageFn<C>>) {
        self.on_message = hook;
    }

    /// Sets or clears the subscribe hook.
    pub fn set_on_subscribe(&mut self, hook: Option<SubscribeFn<C>>) {
        self.on_subscribe = hook;
    }

    /// Sets or clears the unsubscribe hook.
    pub fn set_on_unsubscribe(&mut self, hook: Option<UnsubscribeFn<C>>) {
        self.on_unsubscribe = hook;
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The wrapped client, mutably.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// The session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The node id used in topic paths.
    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    /// The configured discovery prefix.
    pub fn discovery_prefix(&self) -> &str {
        &self.config.discovery_prefix
    }

    /// The client's username.
    pub fn username(&self) -> Option<&str> {
        self.client.username()
    }

    /// `homeassistant/sensor/{node_id}/availability`
    pub fn availability_topic(&self) -> &str {
        &self.availability_topic
    }

    /// Clock reading at the last successful connect acknowledgment.
    pub fn last_connect(&self) -> Option<u64> {
        self.last_connect
    }

    /// Clock reading at the last disconnect event.
    pub fn last_disconnect(&self) -> Option<u64> {
        self.last_disconnect
    }

    /// Whether the client exposed a logger at construction.
    pub fn logging_enabled(&self) -> bool {
        self.logging_enabled
    }
}

impl<C: MqttClient> Drop for Session<C> {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            log::warn!("disconnect on drop failed: {}", err);
        }
    }
}

impl<C: MqttClient + fmt::Debug> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("availability_topic", &self.availability_topic)
            .field("connected", &self.connected)
            .field("last_connect", &self.last_connect)
            .field("last_disconnect", &self.last_disconnect)
            .field("logging_enabled", &self.logging_enabled)
            .finish_non_exhaustive()
    }
}
