use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Connector, Link, LinkSettings};

/// Opens real serial ports through the `serialport` crate.
///
/// Works the same for wired USB serial and for Bluetooth SPP ports bound to
/// a tty (`rfcomm bind N <addr>` on Linux).
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl SerialConnector {
    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "serial"
    }
}

impl Connector for SerialConnector {
    fn connect(&self, settings: &LinkSettings) -> Result<Box<dyn Link>> {
        debug!(
            endpoint = %settings.endpoint,
            baud = settings.baud_rate,
            timeout = ?settings.read_timeout,
            "opening serial port"
        );
        let port = serialport::new(settings.endpoint.as_str(), settings.baud_rate)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                endpoint: settings.endpoint.clone(),
                source,
            })?;
        info!(endpoint = %settings.endpoint, "serial port open");
        Ok(Box::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_endpoint_reports_open_error() {
        let settings = LinkSettings::new("/dev/tsnd-definitely-missing-port");
        let err = match SerialConnector.connect(&settings) {
            Ok(_) => panic!("opening a missing port should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, TransportError::Open { ref endpoint, .. } if endpoint.contains("missing")));
    }
}
