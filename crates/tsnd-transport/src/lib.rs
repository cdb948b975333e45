//! Serial channel ownership for TSND151 sensors.
//!
//! Provides a single owner for the byte channel to the device, whether it is a
//! wired USB serial port or a Bluetooth-emulated one (`/dev/rfcommN`,
//! `/dev/tty.TSND151-*`, `COMn`).
//!
//! This is the lowest layer of tsnd. Everything else builds on top of the
//! [`Transport`] type provided here.

pub mod error;
pub mod serial;
pub mod stop;
pub mod traits;
pub mod transport;

pub use error::{Result, TransportError};
pub use serial::SerialConnector;
pub use stop::StopSignal;
pub use traits::{Connector, Link, LinkSettings, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
pub use transport::Transport;
