use std::time::Duration;

use tsnd_transport::{LinkSettings, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};

/// Default bound on a single response wait attempt.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default settle time after opening and after closing the channel.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

/// Default pause of the router while the channel is not readable.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// Connection and timing parameters for a [`crate::Device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Serial line speed.
    pub baud_rate: u32,
    /// Upper bound on one blocking read of the physical port.
    pub read_timeout: Duration,
    /// Upper bound on one response wait attempt. Attempts repeat until the
    /// response arrives or the device is stopped.
    pub response_timeout: Duration,
    /// Pause after the port reports open.
    pub open_settle: Duration,
    /// Pause after the port is closed.
    pub close_settle: Duration,
    /// Router pause while the channel is closing or not yet open.
    pub idle_backoff: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            open_settle: DEFAULT_SETTLE,
            close_settle: DEFAULT_SETTLE,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }
}

impl DeviceConfig {
    /// Physical link parameters for `endpoint`.
    pub fn link_settings(&self, endpoint: impl Into<String>) -> LinkSettings {
        LinkSettings {
            endpoint: endpoint.into(),
            baud_rate: self.baud_rate,
            read_timeout: self.read_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_profile() {
        let config = DeviceConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        assert_eq!(config.response_timeout, Duration::from_secs(5));

        let link = config.link_settings("/dev/rfcomm0");
        assert_eq!(link.endpoint, "/dev/rfcomm0");
        assert_eq!(link.baud_rate, config.baud_rate);
    }
}
