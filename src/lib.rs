//! # homeassistant-mqtt
//!
//! Announce an IoT device to [Home Assistant](https://www.home-assistant.io/)
//! over MQTT. The crate wraps an existing MQTT client and takes care of the
//! Home Assistant availability contract:
//!
//! | Topic | Payload | Retain |
//! |---|---|---|
//! | `homeassistant/sensor/{node_id}/availability` (last will) | `offline` | yes |
//! | `homeassistant/sensor/{node_id}/availability` (on connect) | `online` | yes |
//! | `hass/status` (subscribed on connect) | | |
//!
//! The MQTT protocol itself is not implemented here. Any client that
//! implements [`MqttClient`] can be wrapped; the `rumqttc` feature ships an
//! adapter for the [`rumqttc`](https://docs.rs/rumqttc) blocking client.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use homeassistant_mqtt::client::{Event, MqttClient, QoS};
//! use homeassistant_mqtt::{Error, Session};
//!
//! # struct Board;
//! # impl MqttClient for Board {
//! #     type Error = ();
//! #     fn username(&self) -> Option<&str> { Some("device") }
//! #     fn connect(&mut self) -> Result<(), ()> { Ok(()) }
//! #     fn reconnect(&mut self) -> Result<(), ()> { Ok(()) }
//! #     fn disconnect(&mut self) -> Result<(), ()> { Ok(()) }
//! #     fn publish(&mut self, _: &str, _: &[u8], _: QoS, _: bool) -> Result<(), ()> { Ok(()) }
//! #     fn subscribe(&mut self, _: &str, _: QoS) -> Result<(), ()> { Ok(()) }
//! #     fn unsubscribe(&mut self, _: &str) -> Result<(), ()> { Ok(()) }
//! #     fn will_set(&mut self, _: &str, _: &[u8], _: QoS, _: bool) -> Result<(), ()> { Ok(()) }
//! #     fn poll(&mut self) -> Result<Option<Event>, ()> { Ok(None) }
//! # }
//! fn message(
//!     _session: &mut Session<Board>,
//!     levels: &[&str],
//!     payload: &[u8],
//! ) -> Result<(), Error<()>> {
//!     let _ = (levels, payload);
//!     Ok(())
//! }
//!
//! # fn main() -> Result<(), Error<()>> {
//! let mut session = Session::with_defaults(Board)?;
//! session.set_on_message(Some(message));
//! session.connect()?;
//!
//! loop {
//!     // Explicitly pump the message loop.
//!     session.poll()?;
//! }
//! # }
//! ```
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled); provides a
//!   real monotonic clock for connect/disconnect timestamps
//! - `defmt`: Enable defmt formatting of the error types
//! - `rumqttc`: Adapter for the `rumqttc` client (implies `std`)

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

/// The MQTT client capability the session is built on.
///
/// Defines the [`MqttClient`](client::MqttClient) trait, the owned
/// [`Event`](client::Event) values clients report, and the optional adapters.
pub mod client;

/// Session settings and the clock hook.
pub mod config;

/// Error taxonomy shared by all session operations.
pub mod error;

/// Client-side logger trait and log level parsing.
pub mod logger;

/// The session façade.
pub mod session;

/// Fixed Home Assistant topics and topic splitting.
pub mod topic;

pub use client::{Event, MqttClient, QoS};
pub use config::Config;
pub use error::{ConfigurationError, ConnectionError, Error, InvalidStateError};
pub use session::Session;
