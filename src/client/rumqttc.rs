//! [`MqttClient`] adapter for the blocking [`rumqttc`] client.
//!
//! `rumqttc` fixes the last will when the client is created, so the adapter
//! keeps the [`MqttOptions`] around, stores the will on
//! [`will_set`](MqttClient::will_set) and only builds the client on
//! [`connect`](MqttClient::connect).
//!
//! Each [`poll`](MqttClient::poll) waits up to the configured timeout for one
//! `rumqttc` notification and translates it:
//!
//! | rumqttc | [`Event`] |
//! |---|---|
//! | incoming CONNACK | `Connect` with the return code |
//! | `ConnectionRefused` error | `Connect` with the refusal code |
//! | incoming PUBLISH | `Message` |
//! | incoming SUBACK / UNSUBACK | `Subscribe` / `Unsubscribe` for the request's packet id |
//! | incoming or outgoing DISCONNECT | `Disconnect` with code `0` |
//! | other connection error while connected | `Disconnect` with code `1` |
//!
//! Requests are queued until `rumqttc` reports sending them, which assigns
//! the packet id their acknowledgment will carry. Requests in flight when the
//! connection ends are forgotten; the broker never acknowledges them.
//!
//! `rumqttc` reconnects on its own on the next poll after a connection error.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use rumqttc::{
    Client, ClientError, ConnectReturnCode, Connection, ConnectionError, Event as Notification,
    LastWill, MqttOptions, Outgoing, Packet, RecvTimeoutError,
};

use super::{Event, MqttClient, QoS};
use crate::logger::{FacadeLogger, Logger};

/// Default capacity of the request channel between client and event loop.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default time a single poll waits for a notification.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Errors raised by [`RumqttcClient`].
#[derive(Debug)]
pub enum RumqttcError {
    /// An operation that needs a live client was called before `connect`.
    NotConnected,
    /// The request could not be queued.
    Client(ClientError),
    /// The connection failed before the broker accepted it.
    Connection(ConnectionError),
    /// The `rumqttc` event loop has stopped; call `reconnect`.
    EventLoopClosed,
    /// An incoming message does not fit the event buffers.
    Oversized,
}

impl fmt::Display for RumqttcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RumqttcError::NotConnected => f.write_str("rumqttc client has not been started"),
            RumqttcError::Client(err) => write!(f, "rumqttc request failed: {}", err),
            RumqttcError::Connection(err) => write!(f, "rumqttc connection failed: {}", err),
            RumqttcError::EventLoopClosed => f.write_str("rumqttc event loop has stopped"),
            RumqttcError::Oversized => f.write_str("incoming message exceeds event capacity"),
        }
    }
}

impl std::error::Error for RumqttcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RumqttcError::Client(err) => Some(err),
            RumqttcError::Connection(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClientError> for RumqttcError {
    fn from(err: ClientError) -> Self {
        RumqttcError::Client(err)
    }
}

/// A `rumqttc` client driven through [`MqttClient`].
pub struct RumqttcClient {
    options: MqttOptions,
    username: Option<String>,
    capacity: usize,
    poll_timeout: Duration,
    client: Option<Client>,
    connection: Option<Connection>,
    connected: bool,
    queued_subscribes: VecDeque<(String, QoS)>,
    queued_unsubscribes: VecDeque<String>,
    sent_subscribes: HashMap<u16, (String, QoS)>,
    sent_unsubscribes: HashMap<u16, String>,
    logger: FacadeLogger,
}

impl RumqttcClient {
    /// Creates an adapter around `options`. Nothing is sent until `connect`.
    pub fn new(options: MqttOptions) -> Self {
        Self {
            options,
            username: None,
            capacity: DEFAULT_CAPACITY,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            client: None,
            connection: None,
            connected: false,
            queued_subscribes: VecDeque::new(),
            queued_unsubscribes: VecDeque::new(),
            sent_subscribes: HashMap::new(),
            sent_unsubscribes: HashMap::new(),
            logger: FacadeLogger::new("homeassistant_mqtt::rumqttc", log::LevelFilter::Info),
        }
    }

    /// Sets the broker credentials.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.options.set_credentials(username, password);
        self.username = Some(username.to_owned());
        self
    }

    /// Sets how long one poll waits for a notification.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the request channel capacity used when the client is built.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn start(&mut self) {
        let (client, connection) = Client::new(self.options.clone(), self.capacity);
        self.client = Some(client);
        self.connection = Some(connection);
        self.connected = false;
        self.queued_subscribes.clear();
        self.queued_unsubscribes.clear();
        self.forget_in_flight();
    }

    fn client(&mut self) -> Result<&mut Client, RumqttcError> {
        self.client.as_mut().ok_or(RumqttcError::NotConnected)
    }

    fn forget_in_flight(&mut self) {
        self.sent_subscribes.clear();
        self.sent_unsubscribes.clear();
    }

    fn receive(
        &mut self,
        received: Result<Result<Notification, ConnectionError>, RecvTimeoutError>,
    ) -> Result<Option<Event>, RumqttcError> {
        match received {
            Ok(Ok(notification)) => self.translate(notification),
            Ok(Err(ConnectionError::ConnectionRefused(code))) => {
                self.connected = false;
                self.forget_in_flight();
                Ok(Some(Event::Connect {
                    return_code: return_code(code),
                }))
            }
            Ok(Err(err)) if self.connected => {
                log::warn!("rumqttc connection lost: {}", err);
                self.connected = false;
                self.forget_in_flight();
                Ok(Some(Event::Disconnect { return_code: 1 }))
            }
            Ok(Err(err)) => {
                self.forget_in_flight();
                Err(RumqttcError::Connection(err))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.connected = false;
                self.forget_in_flight();
                Err(RumqttcError::EventLoopClosed)
            }
        }
    }

    fn translate(&mut self, notification: Notification) -> Result<Option<Event>, RumqttcError> {
        let event = match notification {
            Notification::Incoming(Packet::ConnAck(ack)) => {
                self.connected = ack.code == ConnectReturnCode::Success;
                self.forget_in_flight();
                Some(Event::Connect {
                    return_code: return_code(ack.code),
                })
            }
            Notification::Incoming(Packet::Publish(publish)) => Some(
                Event::message(&publish.topic, &publish.payload)
                    .map_err(|_| RumqttcError::Oversized)?,
            ),
            Notification::Outgoing(Outgoing::Subscribe(pkid)) => {
                if let Some(request) = self.queued_subscribes.pop_front() {
                    self.sent_subscribes.insert(pkid, request);
                }
                None
            }
            Notification::Outgoing(Outgoing::Unsubscribe(pkid)) => {
                if let Some(topic) = self.queued_unsubscribes.pop_front() {
                    self.sent_unsubscribes.insert(pkid, topic);
                }
                None
            }
            Notification::Incoming(Packet::SubAck(ack)) => {
                match self.sent_subscribes.remove(&ack.pkid) {
                    Some((topic, qos)) => Some(
                        Event::subscribe(0, &topic, qos).map_err(|_| RumqttcError::Oversized)?,
                    ),
                    None => None,
                }
            }
            Notification::Incoming(Packet::UnsubAck(ack)) => {
                match self.sent_unsubscribes.remove(&ack.pkid) {
                    Some(topic) => Some(
                        Event::unsubscribe(0, &topic, ack.pkid)
                            .map_err(|_| RumqttcError::Oversized)?,
                    ),
                    None => None,
                }
            }
            Notification::Incoming(Packet::Disconnect)
            | Notification::Outgoing(Outgoing::Disconnect) => {
                self.connected = false;
                self.forget_in_flight();
                Some(Event::Disconnect { return_code: 0 })
            }
            _ => None,
        };
        Ok(event)
    }
}

impl fmt::Debug for RumqttcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RumqttcClient")
            .field("username", &self.username)
            .field("poll_timeout", &self.poll_timeout)
            .field("started", &self.client.is_some())
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl MqttClient for RumqttcClient {
    type Error = RumqttcError;

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.start();
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        if let Some(client) = self.client.as_mut() {
            // The old event loop is dropped right after; a failed DISCONNECT is moot.
            let _ = client.disconnect();
        }
        self.start();
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.client()?.disconnect()?;
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error> {
        self.client()?
            .publish(topic, to_rumqttc(qos), retain, payload.to_vec())?;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error> {
        self.client()?.subscribe(topic, to_rumqttc(qos))?;
        self.queued_subscribes.push_back((topic.to_owned(), qos));
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.client()?.unsubscribe(topic)?;
        self.queued_unsubscribes.push_back(topic.to_owned());
        Ok(())
    }

    fn will_set(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error> {
        self.options
            .set_last_will(LastWill::new(topic, payload.to_vec(), to_rumqttc(qos), retain));
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Event>, Self::Error> {
        let received = self
            .connection
            .as_mut()
            .ok_or(RumqttcError::NotConnected)?
            .recv_timeout(self.poll_timeout);
        self.receive(received)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn logger(&mut self) -> Option<&mut dyn Logger> {
        Some(&mut self.logger)
    }
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

fn return_code(code: ConnectReturnCode) -> u8 {
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TOPIC_CAPACITY;
    use rumqttc::{ConnAck, Publish, SubAck, SubscribeReasonCode, UnsubAck};

    fn adapter() -> RumqttcClient {
        RumqttcClient::new(MqttOptions::new("homeassistant-mqtt-test", "localhost", 1883))
            .with_credentials("device", "secret")
    }

    fn connack(code: ConnectReturnCode) -> Notification {
        Notification::Incoming(Packet::ConnAck(ConnAck::new(code, false)))
    }

    fn suback(pkid: u16) -> Notification {
        Notification::Incoming(Packet::SubAck(SubAck::new(
            pkid,
            vec![SubscribeReasonCode::Success(rumqttc::QoS::AtMostOnce)],
        )))
    }

    fn connection_reset() -> ConnectionError {
        ConnectionError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ))
    }

    #[test]
    fn credentials_provide_username() {
        assert_eq!(adapter().username(), Some("device"));
        let anonymous = RumqttcClient::new(MqttOptions::new("anon", "localhost", 1883));
        assert_eq!(anonymous.username(), None);
    }

    #[test]
    fn requests_before_connect_fail() {
        let mut client = adapter();
        assert!(matches!(
            client.publish("t", b"x", QoS::AtMostOnce, false),
            Err(RumqttcError::NotConnected)
        ));
        assert!(matches!(client.poll(), Err(RumqttcError::NotConnected)));
        assert!(!client.is_connected());
    }

    #[test]
    fn will_can_be_set_before_connect() {
        let mut client = adapter();
        assert!(client
            .will_set("homeassistant/sensor/CPHA/availability", b"offline", QoS::AtMostOnce, true)
            .is_ok());
    }

    #[test]
    fn return_codes_follow_connack() {
        assert_eq!(return_code(ConnectReturnCode::Success), 0);
        assert_eq!(return_code(ConnectReturnCode::NotAuthorized), 5);
    }

    #[test]
    fn accepted_connack_marks_connected() {
        let mut client = adapter();
        let event = client.translate(connack(ConnectReturnCode::Success)).unwrap();
        assert_eq!(event, Some(Event::Connect { return_code: 0 }));
        assert!(client.is_connected());
    }

    #[test]
    fn refused_connack_keeps_code() {
        let mut client = adapter();
        let event = client
            .translate(connack(ConnectReturnCode::BadUserNamePassword))
            .unwrap();
        assert_eq!(event, Some(Event::Connect { return_code: 4 }));
        assert!(!client.is_connected());
    }

    #[test]
    fn refused_connection_error_becomes_connect_event() {
        let mut client = adapter();
        let event = client
            .receive(Ok(Err(ConnectionError::ConnectionRefused(
                ConnectReturnCode::NotAuthorized,
            ))))
            .unwrap();
        assert_eq!(event, Some(Event::Connect { return_code: 5 }));
        assert!(!client.is_connected());
    }

    #[test]
    fn publish_becomes_message() {
        let mut client = adapter();
        let publish = Publish::new("hass/status", rumqttc::QoS::AtMostOnce, "online");
        let event = client
            .translate(Notification::Incoming(Packet::Publish(publish)))
            .unwrap();
        assert_eq!(event, Some(Event::message("hass/status", b"online").unwrap()));
    }

    #[test]
    fn oversized_publish_is_an_error() {
        let mut client = adapter();
        let topic = "t".repeat(TOPIC_CAPACITY + 1);
        let publish = Publish::new(topic, rumqttc::QoS::AtMostOnce, "online");
        assert!(matches!(
            client.translate(Notification::Incoming(Packet::Publish(publish))),
            Err(RumqttcError::Oversized)
        ));
    }

    #[test]
    fn suback_is_matched_by_packet_id() {
        let mut client = adapter();
        client.queued_subscribes.push_back(("a/b".to_owned(), QoS::AtLeastOnce));
        client.queued_subscribes.push_back(("c/d".to_owned(), QoS::AtMostOnce));
        client.translate(Notification::Outgoing(Outgoing::Subscribe(7))).unwrap();
        client.translate(Notification::Outgoing(Outgoing::Subscribe(8))).unwrap();

        let event = client.translate(suback(8)).unwrap();
        assert_eq!(event, Some(Event::subscribe(0, "c/d", QoS::AtMostOnce).unwrap()));
        let event = client.translate(suback(7)).unwrap();
        assert_eq!(event, Some(Event::subscribe(0, "a/b", QoS::AtLeastOnce).unwrap()));

        // An acknowledgment nobody asked for is ignored.
        assert_eq!(client.translate(suback(9)).unwrap(), None);
    }

    #[test]
    fn subscription_lost_with_connection_does_not_shift_later_acks() {
        let mut client = adapter();
        client.translate(connack(ConnectReturnCode::Success)).unwrap();
        client.queued_subscribes.push_back(("lost/topic".to_owned(), QoS::AtMostOnce));
        client.translate(Notification::Outgoing(Outgoing::Subscribe(1))).unwrap();

        let event = client.receive(Ok(Err(connection_reset()))).unwrap();
        assert_eq!(event, Some(Event::Disconnect { return_code: 1 }));

        client.translate(connack(ConnectReturnCode::Success)).unwrap();
        client.queued_subscribes.push_back(("hass/status".to_owned(), QoS::AtMostOnce));
        client.translate(Notification::Outgoing(Outgoing::Subscribe(1))).unwrap();

        let event = client.translate(suback(1)).unwrap();
        assert_eq!(event, Some(Event::subscribe(0, "hass/status", QoS::AtMostOnce).unwrap()));
    }

    #[test]
    fn unsuback_carries_packet_id() {
        let mut client = adapter();
        client.queued_unsubscribes.push_back("hass/status".to_owned());
        client.translate(Notification::Outgoing(Outgoing::Unsubscribe(3))).unwrap();

        let event = client
            .translate(Notification::Incoming(Packet::UnsubAck(UnsubAck::new(3))))
            .unwrap();
        assert_eq!(event, Some(Event::unsubscribe(0, "hass/status", 3).unwrap()));
    }

    #[test]
    fn disconnect_packets_become_disconnect_events() {
        let mut client = adapter();
        client.translate(connack(ConnectReturnCode::Success)).unwrap();
        let event = client
            .translate(Notification::Incoming(Packet::Disconnect))
            .unwrap();
        assert_eq!(event, Some(Event::Disconnect { return_code: 0 }));
        assert!(!client.is_connected());

        client.translate(connack(ConnectReturnCode::Success)).unwrap();
        let event = client
            .translate(Notification::Outgoing(Outgoing::Disconnect))
            .unwrap();
        assert_eq!(event, Some(Event::Disconnect { return_code: 0 }));
        assert!(!client.is_connected());
    }

    #[test]
    fn connection_loss_while_connected_becomes_disconnect() {
        let mut client = adapter();
        client.translate(connack(ConnectReturnCode::Success)).unwrap();
        let event = client.receive(Ok(Err(connection_reset()))).unwrap();
        assert_eq!(event, Some(Event::Disconnect { return_code: 1 }));
        assert!(!client.is_connected());
    }

    #[test]
    fn connection_error_before_connack_is_an_error() {
        let mut client = adapter();
        assert!(matches!(
            client.receive(Ok(Err(connection_reset()))),
            Err(RumqttcError::Connection(_))
        ));
    }

    #[test]
    fn timeout_is_quiet_but_closed_event_loop_is_not() {
        let mut client = adapter();
        assert_eq!(client.receive(Err(RecvTimeoutError::Timeout)).unwrap(), None);
        assert!(matches!(
            client.receive(Err(RecvTimeoutError::Disconnected)),
            Err(RumqttcError::EventLoopClosed)
        ));
    }
}
