//! Error types for the Home Assistant session.
//!
//! Errors fall into three families, mirroring where a failure originates:
//!
//! - [`ConfigurationError`]: something the caller set up wrongly (no username,
//!   unknown log level, no logger, bad node id).
//! - [`ConnectionError`]: the broker could not be reached or refused us.
//! - [`InvalidStateError`]: an event arrived that the session cannot deliver.
//!
//! All of them are folded into [`Error`], which is generic over the error type
//! of the underlying [`MqttClient`](crate::client::MqttClient).

use core::fmt;

/// Invalid or missing construction-time requirement.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConfigurationError {
    /// The MQTT client has no username; Home Assistant requires one.
    MissingUsername,
    /// The requested log level name is not one of `DEBUG`, `INFO`, `WARNING`, `ERROR`.
    UnknownLogLevel,
    /// A log level was requested but the MQTT client has no logger attached.
    NoLogger,
    /// The node id is empty or contains characters outside `[a-zA-Z0-9_-]`.
    InvalidNodeId,
    /// A configuration string does not fit its fixed-capacity buffer.
    ValueTooLong,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::MissingUsername => {
                f.write_str("Home Assistant requires a username, please set one on the MQTT client")
            }
            ConfigurationError::UnknownLogLevel => f.write_str("Incorrect logging level provided"),
            ConfigurationError::NoLogger => {
                f.write_str("No logger attached - did you create it during initialization?")
            }
            ConfigurationError::InvalidNodeId => {
                f.write_str("Node id must be non-empty and only contain [a-zA-Z0-9_-]")
            }
            ConfigurationError::ValueTooLong => f.write_str("Configuration value is too long"),
        }
    }
}

impl core::error::Error for ConfigurationError {}

/// Failure to establish a session with the broker.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConnectionError<E> {
    /// Registering the last will or connecting failed.
    Connect(E),
    /// Reconnecting failed.
    Reconnect(E),
    /// The broker acknowledged the connection with a non-zero return code.
    Refused(u8),
}

impl<E> ConnectionError<E> {
    /// Returns the broker return code if the broker refused the connection.
    pub fn return_code(&self) -> Option<u8> {
        match self {
            ConnectionError::Refused(code) => Some(*code),
            _ => None,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for ConnectionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Connect(_) => f.write_str("Unable to connect to Home Assistant."),
            ConnectionError::Reconnect(_) => f.write_str("Unable to reconnect to Home Assistant."),
            ConnectionError::Refused(code) => {
                write!(f, "MQTT Error: {} ({})", code, connack_description(*code))
            }
        }
    }
}

impl<E> core::error::Error for ConnectionError<E>
where
    E: core::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            ConnectionError::Connect(err) | ConnectionError::Reconnect(err) => Some(err),
            ConnectionError::Refused(_) => None,
        }
    }
}

/// An event reached the session in a state where it cannot be delivered.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InvalidStateError {
    /// A message arrived but no `on_message` hook is set.
    NoMessageHandler,
    /// A message topic has more levels than [`MAX_TOPIC_LEVELS`](crate::topic::MAX_TOPIC_LEVELS).
    TopicTooDeep,
}

impl fmt::Display for InvalidStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidStateError::NoMessageHandler => f.write_str(
                "You must define an on_message handler before message events are delivered",
            ),
            InvalidStateError::TopicTooDeep => f.write_str("Message topic has too many levels"),
        }
    }
}

impl core::error::Error for InvalidStateError {}

/// The error type returned by every fallible [`Session`](crate::Session) operation.
///
/// `E` is the error type of the wrapped MQTT client.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error<E> {
    /// See [`ConfigurationError`].
    Configuration(ConfigurationError),
    /// See [`ConnectionError`].
    Connection(ConnectionError<E>),
    /// See [`InvalidStateError`].
    InvalidState(InvalidStateError),
    /// A delegated client call failed outside of connect/reconnect.
    Client(E),
}

impl<E> From<ConfigurationError> for Error<E> {
    fn from(err: ConfigurationError) -> Self {
        Error::Configuration(err)
    }
}

impl<E> From<ConnectionError<E>> for Error<E> {
    fn from(err: ConnectionError<E>) -> Self {
        Error::Connection(err)
    }
}

impl<E> From<InvalidStateError> for Error<E> {
    fn from(err: InvalidStateError) -> Self {
        Error::InvalidState(err)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(err) => fmt::Display::fmt(err, f),
            Error::Connection(err) => fmt::Display::fmt(err, f),
            Error::InvalidState(err) => fmt::Display::fmt(err, f),
            Error::Client(err) => write!(f, "MQTT client error: {:?}", err),
        }
    }
}

impl<E> core::error::Error for Error<E>
where
    E: core::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Configuration(err) => Some(err),
            Error::Connection(err) => Some(err),
            Error::InvalidState(err) => Some(err),
            Error::Client(err) => Some(err),
        }
    }
}

/// Human readable meaning of an MQTT 3.1.1 CONNACK return code.
pub fn connack_description(code: u8) -> &'static str {
    match code {
        0 => "connection accepted",
        1 => "unacceptable protocol version",
        2 => "identifier rejected",
        3 => "server unavailable",
        4 => "bad user name or password",
        5 => "not authorized",
        _ => "unknown return code",
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigurationError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConfigurationError::MissingUsername => defmt::write!(f, "MissingUsername"),
            ConfigurationError::UnknownLogLevel => defmt::write!(f, "UnknownLogLevel"),
            ConfigurationError::NoLogger => defmt::write!(f, "NoLogger"),
            ConfigurationError::InvalidNodeId => defmt::write!(f, "InvalidNodeId"),
            ConfigurationError::ValueTooLong => defmt::write!(f, "ValueTooLong"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for ConnectionError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ConnectionError::Connect(_) => defmt::write!(f, "Connect"),
            ConnectionError::Reconnect(_) => defmt::write!(f, "Reconnect"),
            ConnectionError::Refused(code) => defmt::write!(f, "Refused({=u8})", code),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for InvalidStateError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            InvalidStateError::NoMessageHandler => defmt::write!(f, "NoMessageHandler"),
            InvalidStateError::TopicTooDeep => defmt::write!(f, "TopicTooDeep"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Configuration(err) => defmt::write!(f, "Configuration({})", err),
            Error::Connection(err) => defmt::write!(f, "Connection({})", err),
            Error::InvalidState(err) => defmt::write!(f, "InvalidState({})", err),
            Error::Client(_) => defmt::write!(f, "Client"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failure_keeps_fixed_message() {
        let err: Error<&str> = ConnectionError::Connect("socket closed").into();
        assert_eq!(format!("{}", err), "Unable to connect to Home Assistant.");

        let err: Error<&str> = ConnectionError::Reconnect("socket closed").into();
        assert_eq!(format!("{}", err), "Unable to reconnect to Home Assistant.");
    }

    #[test]
    fn refused_carries_return_code() {
        let err: ConnectionError<()> = ConnectionError::Refused(5);
        assert_eq!(err.return_code(), Some(5));
        assert_eq!(format!("{}", err), "MQTT Error: 5 (not authorized)");
        assert_eq!(ConnectionError::Connect(()).return_code(), None);
    }

    #[test]
    fn unknown_connack_code() {
        assert_eq!(connack_description(0), "connection accepted");
        assert_eq!(connack_description(42), "unknown return code");
    }
}
