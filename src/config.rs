use std::time::Duration;

/// Adapter configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdapterConfig {
    /// Serial port path (e.g., "/dev/ttyACM0", "COM3")
    pub port: String,
    /// CAN bus speed in kbit/s, 615.384 selects the Trionic 5 P-bus rate
    pub can_rate: f64,
    /// Identifiers the application is interested in, used to pick a hardware filter
    pub can_filter: Vec<u32>,
    /// Log every command and adapter line at info level
    pub debug: bool,
    /// Pause after each handshake command.
    ///
    /// The adapter documents no settling time, 5 ms is what has been seen to work.
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub settle_delay: Duration,
    /// Pause between stopping the writer and sending the exit command on close
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub close_settle: Duration,
    /// Capacity of both the inbound and the outbound frame queue
    pub queue_capacity: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            port: String::new(),
            can_rate: 500.0,
            can_filter: Vec::new(),
            debug: false,
            settle_delay: Duration::from_millis(5),
            close_settle: Duration::from_millis(50),
            queue_capacity: 10,
        }
    }
}

impl AdapterConfig {
    pub fn new(port: impl Into<String>, can_rate: f64) -> Self {
        AdapterConfig {
            port: port.into(),
            can_rate,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, ids: &[u32]) -> Self {
        self.can_filter = ids.to_vec();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_close_settle(mut self, delay: Duration) -> Self {
        self.close_settle = delay;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

#[cfg(feature = "serde")]
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AdapterConfig::new("/dev/ttyACM0", 615.384);
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.settle_delay, Duration::from_millis(5));
        assert_eq!(config.queue_capacity, 10);
        assert!(config.can_filter.is_empty());
        assert!(!config.debug);
    }

    #[test]
    fn builder() {
        let config = AdapterConfig::new("COM3", 500.0)
            .with_filter(&[0x7e0])
            .with_debug(true)
            .with_queue_capacity(32);
        assert_eq!(config.can_filter, vec![0x7e0]);
        assert!(config.debug);
        assert_eq!(config.queue_capacity, 32);
    }
}
