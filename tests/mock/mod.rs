//! Recording MQTT client used by the session tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use homeassistant_mqtt::client::{Event, MqttClient, QoS};
use homeassistant_mqtt::logger::Logger;
use log::{Level, LevelFilter};

/// Every call the session made on the client, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Reconnect,
    Disconnect,
    Publish {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    },
    Subscribe {
        topic: String,
        qos: QoS,
    },
    Unsubscribe {
        topic: String,
    },
    WillSet {
        topic: String,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    },
}

/// Failure injected into the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    Refused,
    SocketClosed,
}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockError::Refused => f.write_str("refused"),
            MockError::SocketClosed => f.write_str("socket closed"),
        }
    }
}

impl std::error::Error for MockError {}

/// Logger that keeps every record.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    pub level: Option<LevelFilter>,
    pub records: Vec<(Level, String)>,
}

impl Logger for RecordingLogger {
    fn set_level(&mut self, level: LevelFilter) {
        self.level = Some(level);
    }

    fn level(&self) -> LevelFilter {
        self.level.unwrap_or(LevelFilter::Info)
    }

    fn log(&mut self, level: Level, message: &str) {
        if level <= self.level() {
            self.records.push((level, message.to_owned()));
        }
    }
}

#[derive(Debug, Default)]
pub struct MockClient {
    pub username: Option<String>,
    pub calls: Vec<Call>,
    pub events: VecDeque<Event>,
    pub live_connected: bool,
    pub logger: Option<RecordingLogger>,
    pub fail_will: bool,
    pub fail_connect: bool,
    pub fail_reconnect: bool,
    pub fail_poll: bool,
    pub fail_publish: bool,
    /// Free-form notes written by hooks under test.
    pub hook_log: Vec<String>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            username: Some("device".to_owned()),
            ..Self::default()
        }
    }

    pub fn with_logger() -> Self {
        Self {
            logger: Some(RecordingLogger::default()),
            ..Self::new()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn publishes(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Publish { .. }))
            .collect()
    }

    pub fn subscribes(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Subscribe { .. }))
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls.iter().filter(|call| *call == wanted).count()
    }
}

impl MqttClient for MockClient {
    type Error = MockError;

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.calls.push(Call::Connect);
        if self.fail_connect {
            return Err(MockError::Refused);
        }
        self.live_connected = true;
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), Self::Error> {
        self.calls.push(Call::Reconnect);
        if self.fail_reconnect {
            return Err(MockError::SocketClosed);
        }
        self.live_connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.calls.push(Call::Disconnect);
        self.live_connected = false;
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error> {
        if self.fail_publish {
            return Err(MockError::SocketClosed);
        }
        self.calls.push(Call::Publish {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Self::Error> {
        self.calls.push(Call::Subscribe {
            topic: topic.to_owned(),
            qos,
        });
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.calls.push(Call::Unsubscribe {
            topic: topic.to_owned(),
        });
        Ok(())
    }

    fn will_set(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), Self::Error> {
        if self.fail_will {
            return Err(MockError::SocketClosed);
        }
        self.calls.push(Call::WillSet {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            qos,
            retain,
        });
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Event>, Self::Error> {
        if self.fail_poll {
            return Err(MockError::SocketClosed);
        }
        Ok(self.events.pop_front())
    }

    fn is_connected(&self) -> bool {
        self.live_connected
    }

    fn logger(&mut self) -> Option<&mut dyn Logger> {
        match self.logger.as_mut() {
            Some(logger) => Some(logger),
            None => None,
        }
    }
}
