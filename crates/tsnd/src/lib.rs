//! Driver for TSND151 motion sensors over USB or Bluetooth serial.
//!
//! # Crate Structure
//!
//! - [`transport`]: ownership of the serial channel and the shutdown signal
//! - [`frame`]: wire framing, response registry and command encoding
//! - [`device`]: response router, command facade and payload decoders (behind `device` feature)

/// Re-export transport types.
pub mod transport {
    pub use tsnd_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use tsnd_frame::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use tsnd_device::*;
}
