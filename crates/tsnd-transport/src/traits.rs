use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Factory default baud rate of the TSND151 serial profile.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default per-read timeout. A read that times out is an idle tick, not an error.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A connected byte channel to the device.
///
/// Real ports come from [`crate::SerialConnector`]; anything else that moves
/// bytes (an in-memory simulator, a pty) can stand in.
pub trait Link: Read + Write + Send {}

impl<T: Read + Write + Send> Link for T {}

/// Parameters for opening one physical connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    /// Serial endpoint path, e.g. `/dev/rfcomm0` or `COM3`.
    pub endpoint: String,
    /// Line speed.
    pub baud_rate: u32,
    /// Upper bound on a single blocking read.
    pub read_timeout: Duration,
}

impl LinkSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Opens a [`Link`] for the given settings.
pub trait Connector: Send + Sync {
    fn connect(&self, settings: &LinkSettings) -> Result<Box<dyn Link>>;
}

impl<F> Connector for F
where
    F: Fn(&LinkSettings) -> Result<Box<dyn Link>> + Send + Sync,
{
    fn connect(&self, settings: &LinkSettings) -> Result<Box<dyn Link>> {
        self(settings)
    }
}
