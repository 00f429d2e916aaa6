//! The MQTT client capability consumed by the session.
//!
//! This crate does not speak MQTT itself. Framing, keep-alive, QoS handshakes
//! and the socket all belong to an external client library; the session only
//! needs the small surface described by [`MqttClient`]. Any client that can
//! connect, publish, subscribe, register a last will and hand back one
//! [`Event`] per poll can be wrapped.
//!
//! # Event delivery
//!
//! The client never calls back into the session. Instead each
//! [`MqttClient::poll`] returns at most one owned [`Event`], which the session
//! dispatches synchronously on the polling thread. Events own their topic and
//! payload in fixed-capacity buffers, so the client is free to be borrowed
//! again while the event is handled.

use heapless::{String, Vec};

use crate::logger::Logger;

#[cfg(feature = "rumqttc")]
pub mod rumqttc;

/// Maximum topic length carried by an [`Event`].
pub const TOPIC_CAPACITY: usize = 256;

/// Maximum payload size carried by an [`Event`].
pub const PAYLOAD_CAPACITY: usize = 1024;

/// Quality of Service levels for MQTT messages.
///
/// # Examples
///
/// ```rust
/// use homeassistant_mqtt::client::QoS;
///
/// assert_eq!(QoS::AtMostOnce as u8, 0);
/// assert_eq!(QoS::AtLeastOnce as u8, 1);
/// assert_eq!(QoS::ExactlyOnce as u8, 2);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// **QoS 0**: at most once delivery.
    AtMostOnce = 0,
    /// **QoS 1**: at least once delivery.
    AtLeastOnce = 1,
    /// **QoS 2**: exactly once delivery.
    ExactlyOnce = 2,
}

/// A topic or payload did not fit the fixed-capacity event buffers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CapacityError;

/// An incoming MQTT publish message.
///
/// # Examples
///
/// ```rust
/// use homeassistant_mqtt::client::PublishPacket;
///
/// let packet = PublishPacket::new("hass/status", b"online").unwrap();
///
/// assert_eq!(packet.topic.as_str(), "hass/status");
/// assert_eq!(&packet.payload[..], b"online");
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublishPacket {
    /// The topic on which the message was published.
    pub topic: String<TOPIC_CAPACITY>,
    /// The message payload data.
    pub payload: Vec<u8, PAYLOAD_CAPACITY>,
}

impl PublishPacket {
    /// Copies `topic` and `payload` into a new packet.
    pub fn new(topic: &str, payload: &[u8]) -> Result<Self, CapacityError> {
        Ok(Self {
            topic: String::try_from(topic).map_err(|_| CapacityError)?,
            payload: Vec::from_slice(payload).map_err(|_| CapacityError)?,
        })
    }
}

/// One event reported by the MQTT client.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Event {
    /// The broker answered a connect request. `0` means accepted.
    Connect {
        /// CONNACK return code.
        return_code: u8,
    },
    /// The connection to the broker ended.
    Disconnect {
        /// Client specific reason; `0` for a requested disconnect.
        return_code: u8,
    },
    /// A message arrived on a subscribed topic.
    Message(PublishPacket),
    /// The broker acknowledged a subscription.
    Subscribe {
        /// Opaque value the client was configured with.
        user_data: u32,
        /// The subscribed topic filter.
        topic: String<TOPIC_CAPACITY>,
        /// The QoS of the subscription.
        qos: QoS,
    },
    /// The broker acknowledged an unsubscription.
    Unsubscribe {
        /// Opaque value the client was configured with.
        user_data: u32,
        /// The topic filter that was removed.
        topic: String<TOPIC_CAPACITY>,
        /// Packet identifier of the UNSUBSCRIBE request.
        packet_id: u16,
    },
}

impl Event {
    /// Builds an [`Event::Message`], copying topic and payload.
    pub fn message(topic: &str, payload: &[u8]) -> Result<Self, CapacityError> {
        PublishPacket::new(topic, payload).map(Event::Message)
    }

    /// Builds an [`Event::Subscribe`].
    pub fn subscribe(user_data: u32, topic: &str, qos: QoS) -> Result<Self, CapacityError> {
        Ok(Event::Subscribe {
            user_data,
            topic: String::try_from(topic).map_err(|_| CapacityError)?,
            qos,
        })
    }

    /// Builds an [`Event::Unsubscribe`].
    pub fn unsubscribe(user_data: u32, topic: &str, packet_id: u16) -> Result<Self, CapacityError> {
        Ok(Event::Unsubscribe {
            user_data,
            topic: String::try_from(topic).map_err(|_| CapacityError)?,
            packet_id,
        })
    }
}

/// The capability surface the session needs from an MQTT client.
///
/// Every method maps one-to-one onto an operation the client library already
/// performs; implementations should not add behaviour of their own.
pub trait MqttClient {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// The username the client authenticates with, if any.
    fn username(&self) -> Option<&str>;

    /// Open the connection to the broker.
    ///
    /// The broker's answer arrives later as an [`Event::Connect`].
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Re-open a dropped connection using the previous settings.
    fn reconnect(&mut self) -> Result<(), Self::Error>;

    /// Close the connection to the broker.
    fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Publish `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool)
    -> Result<(), Self::Error>;

    /// Subscribe to a topic filter.
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error>;

    /// Remove a subscription.
    fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Register the last will the broker publishes if the client drops out.
    ///
    /// Must be called before [`connect`](Self::connect) to take effect.
    fn will_set(&mut self, topic: &str, payload: &[u8], qos: QoS, retain: bool)
    -> Result<(), Self::Error>;

    /// Run one iteration of the client's I/O loop.
    ///
    /// Returns `Ok(None)` when nothing happened during this iteration.
    fn poll(&mut self) -> Result<Option<Event>, Self::Error>;

    /// Whether the client currently believes it is connected.
    fn is_connected(&self) -> bool {
        false
    }

    /// The client's logger, if one is attached.
    fn logger(&mut self) -> Option<&mut dyn Logger> {
        None
    }
}

impl<T: MqttClient + ?Sized> MqttClient for &mut T {
    type Error = T::Error;

    fn username(&self) -> Option<&str> {
        (**self).username()
    }

    fn connect(&mut self) -> Result<(), Self::Error> {
        (**self).connect()
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        (**self).reconnect()
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        (**self).disconnect()
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error> {
        (**self).publish(topic, payload, qos, retain)
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error> {
        (**self).subscribe(topic, qos)
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        (**self).unsubscribe(topic)
    }

    fn will_set(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error> {
        (**self).will_set(topic, payload, qos, retain)
    }

    fn poll(&mut self) -> Result<Option<Event>, Self::Error> {
        (**self).poll()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn logger(&mut self) -> Option<&mut dyn Logger> {
        (**self).logger()
    }
}
