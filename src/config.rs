//! Session configuration.

use heapless::String;

use crate::error::ConfigurationError;
use crate::topic;

/// Capacity of the discovery prefix and node id buffers.
pub const NAME_CAPACITY: usize = 32;

/// Function signature for monotonic clocks.
///
/// Returns milliseconds from an arbitrary but fixed origin. Used to timestamp
/// connect and disconnect events.
pub type ClockFn = fn() -> u64;

/// Default clock: milliseconds since the first call.
#[cfg(feature = "std")]
pub fn monotonic_millis() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    let elapsed = ORIGIN.get_or_init(Instant::now).elapsed();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Default clock without `std`: always `0`. Boards should install their own
/// with [`Config::with_clock`].
#[cfg(not(feature = "std"))]
pub fn monotonic_millis() -> u64 {
    0
}

/// Home Assistant specific session settings.
///
/// # Examples
///
/// ```rust
/// use homeassistant_mqtt::Config;
///
/// let config = Config::default().with_node_id("greenhouse").unwrap();
/// assert_eq!(config.discovery_prefix.as_str(), "homeassistant");
/// assert_eq!(config.node_id.as_str(), "greenhouse");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Topic prefix Home Assistant watches for discovery. Default `homeassistant`.
    pub discovery_prefix: String<NAME_CAPACITY>,
    /// Identifier of this device in topic paths. Default `CPHA`.
    pub node_id: String<NAME_CAPACITY>,
    /// Mirror handler traces to the `log` facade.
    pub debug: bool,
    /// Clock used for connect/disconnect timestamps.
    pub clock: ClockFn,
}

impl Config {
    /// Replaces the discovery prefix.
    pub fn with_discovery_prefix(mut self, prefix: &str) -> Result<Self, ConfigurationError> {
        self.discovery_prefix =
            String::try_from(prefix).map_err(|_| ConfigurationError::ValueTooLong)?;
        Ok(self)
    }

    /// Replaces the node id.
    ///
    /// The id must be non-empty and limited to `[a-zA-Z0-9_-]`.
    pub fn with_node_id(mut self, node_id: &str) -> Result<Self, ConfigurationError> {
        topic::validate_node_id(node_id)?;
        self.node_id = String::try_from(node_id).map_err(|_| ConfigurationError::ValueTooLong)?;
        Ok(self)
    }

    /// Enables or disables mirroring handler traces to the `log` facade.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: ClockFn) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut discovery_prefix = String::new();
        let mut node_id = String::new();
        // Both literals are well under NAME_CAPACITY.
        let _ = discovery_prefix.push_str("homeassistant");
        let _ = node_id.push_str("CPHA");
        Self {
            discovery_prefix,
            node_id,
            debug: false,
            clock: monotonic_millis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.discovery_prefix.as_str(), "homeassistant");
        assert_eq!(config.node_id.as_str(), "CPHA");
        assert!(!config.debug);
    }

    #[test]
    fn long_values_are_rejected() {
        let long = "x".repeat(NAME_CAPACITY + 1);
        assert_eq!(
            Config::default().with_node_id(&long).unwrap_err(),
            ConfigurationError::ValueTooLong
        );
        assert_eq!(
            Config::default().with_discovery_prefix(&long).unwrap_err(),
            ConfigurationError::ValueTooLong
        );
    }

    #[test]
    fn node_id_is_validated_by_builder() {
        for bad in ["living room", "", "a/b", "node+1"] {
            assert_eq!(
                Config::default().with_node_id(bad).unwrap_err(),
                ConfigurationError::InvalidNodeId,
                "node id {:?}",
                bad
            );
        }
        assert!(Config::default().with_node_id("kitchen_2-a").is_ok());
    }

    #[test]
    fn builder_chains() {
        fn fixed() -> u64 {
            42
        }
        let config = Config::default()
            .with_discovery_prefix("ha")
            .and_then(|c| c.with_node_id("node-1"))
            .unwrap()
            .with_debug(true)
            .with_clock(fixed);
        assert_eq!(config.discovery_prefix.as_str(), "ha");
        assert_eq!(config.node_id.as_str(), "node-1");
        assert!(config.debug);
        assert_eq!((config.clock)(), 42);
    }
}
