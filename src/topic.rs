//! Fixed topics and topic helpers.

use core::fmt::Write as _;
use core::ops::Deref;

use heapless::{String, Vec};

use crate::config::NAME_CAPACITY;
use crate::error::{ConfigurationError, InvalidStateError};

/// Topic Home Assistant publishes its own `online`/`offline` status on.
pub const STATUS_TOPIC: &str = "hass/status";

/// Availability payload published once the broker accepts the connection.
pub const ONLINE: &str = "online";

/// Availability payload registered as the last will.
pub const OFFLINE: &str = "offline";

/// Maximum number of `/`-separated levels in a delivered message topic.
pub const MAX_TOPIC_LEVELS: usize = 16;

const AVAILABILITY_PREFIX: &str = "homeassistant/sensor/";
const AVAILABILITY_SUFFIX: &str = "/availability";

/// Capacity of an availability topic.
pub const AVAILABILITY_CAPACITY: usize =
    AVAILABILITY_PREFIX.len() + NAME_CAPACITY + AVAILABILITY_SUFFIX.len();

/// `homeassistant/sensor/{node_id}/availability`
pub type AvailabilityTopic = String<AVAILABILITY_CAPACITY>;

/// Checks that `node_id` is non-empty and limited to `[a-zA-Z0-9_-]`.
pub fn validate_node_id(node_id: &str) -> Result<(), ConfigurationError> {
    let valid = !node_id.is_empty()
        && node_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidNodeId)
    }
}

/// Builds the availability topic for `node_id`.
///
/// The node id must be non-empty and limited to `[a-zA-Z0-9_-]`, the set Home
/// Assistant accepts in topic paths.
///
/// # Examples
///
/// ```rust
/// use homeassistant_mqtt::topic::availability_topic;
///
/// let topic = availability_topic("CPHA").unwrap();
/// assert_eq!(topic.as_str(), "homeassistant/sensor/CPHA/availability");
/// assert!(availability_topic("bad/id").is_err());
/// ```
pub fn availability_topic(node_id: &str) -> Result<AvailabilityTopic, ConfigurationError> {
    validate_node_id(node_id)?;

    let mut topic = AvailabilityTopic::new();
    write!(topic, "{}{}{}", AVAILABILITY_PREFIX, node_id, AVAILABILITY_SUFFIX)
        .map_err(|_| ConfigurationError::ValueTooLong)?;
    Ok(topic)
}

/// A message topic split on `/`.
///
/// Empty levels are kept, so `"a//b"` yields `["a", "", "b"]` and the levels
/// always join back into the original topic.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TopicLevels<'a> {
    levels: Vec<&'a str, MAX_TOPIC_LEVELS>,
}

impl<'a> TopicLevels<'a> {
    /// Splits `topic` into its levels.
    pub fn split(topic: &'a str) -> Result<Self, InvalidStateError> {
        let mut levels = Vec::new();
        for level in topic.split('/') {
            levels
                .push(level)
                .map_err(|_| InvalidStateError::TopicTooDeep)?;
        }
        Ok(Self { levels })
    }

    /// The levels as a slice.
    pub fn as_slice(&self) -> &[&'a str] {
        &self.levels
    }
}

impl<'a> Deref for TopicLevels<'a> {
    type Target = [&'a str];

    fn deref(&self) -> &Self::Target {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_topic_for_default_node() {
        assert_eq!(
            availability_topic("CPHA").unwrap().as_str(),
            "homeassistant/sensor/CPHA/availability"
        );
    }

    #[test]
    fn availability_topic_fits_longest_node_id() {
        let node_id = "n".repeat(NAME_CAPACITY);
        let topic = availability_topic(&node_id).unwrap();
        assert_eq!(topic.len(), AVAILABILITY_CAPACITY);
    }

    #[test]
    fn node_id_must_be_topic_safe() {
        for bad in ["", "a/b", "a+b", "a#", "space here"] {
            assert_eq!(availability_topic(bad), Err(ConfigurationError::InvalidNodeId));
        }
        assert!(availability_topic("node_1-a").is_ok());
    }

    #[test]
    fn split_keeps_empty_levels() {
        let levels = TopicLevels::split("homeassistant//status/").unwrap();
        assert_eq!(levels.as_slice(), &["homeassistant", "", "status", ""]);
        assert_eq!(levels.join("/"), "homeassistant//status/");
    }

    #[test]
    fn split_single_level() {
        let levels = TopicLevels::split("status").unwrap();
        assert_eq!(&levels[..], &["status"]);
    }

    #[test]
    fn split_rejects_deep_topics() {
        let deep = ["x"; MAX_TOPIC_LEVELS + 1].join("/");
        assert_eq!(TopicLevels::split(&deep), Err(InvalidStateError::TopicTooDeep));

        let deepest = ["x"; MAX_TOPIC_LEVELS].join("/");
        assert_eq!(TopicLevels::split(&deepest).unwrap().len(), MAX_TOPIC_LEVELS);
    }
}
