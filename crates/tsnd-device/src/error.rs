use tsnd_frame::{FrameError, ResponseCategory};
use tsnd_transport::TransportError;

use crate::mode::DeviceMode;

/// A configuration value outside its device-defined bounds.
///
/// Raised before anything is encoded, so the value never reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{parameter} = {value} is out of range (allowed: {allowed})")]
pub struct RangeError {
    pub parameter: &'static str,
    pub value: i64,
    pub allowed: &'static str,
}

impl RangeError {
    pub fn new(parameter: &'static str, value: impl Into<i64>, allowed: &'static str) -> Self {
        Self {
            parameter,
            value: value.into(),
            allowed,
        }
    }
}

/// Check `value` against an inclusive range.
pub(crate) fn check_range(
    parameter: &'static str,
    value: u32,
    min: u32,
    max: u32,
    allowed: &'static str,
) -> std::result::Result<u8, RangeError> {
    if value < min || value > max {
        return Err(RangeError::new(parameter, value, allowed));
    }
    u8::try_from(value).map_err(|_| RangeError::new(parameter, value, allowed))
}

/// A telemetry or settings payload too short for its layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} payload needs {expected} bytes, got {actual}")]
pub struct DecodeError {
    pub kind: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// Errors surfaced by the device facade.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// A parameter failed client-side validation.
    #[error(transparent)]
    Range(#[from] RangeError),

    /// The device is not in a command mode.
    ///
    /// Facade operations turn this into a negative result plus a warning.
    #[error("device is in {0} mode; commands are not accepted")]
    Mode(DeviceMode),

    /// Framing failed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The physical channel failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The stop signal was raised while waiting for a response.
    #[error("stopped while waiting for a response")]
    Stopped,

    /// The background router died on a protocol violation.
    #[error("response reader failed: {0}")]
    ReaderFailed(String),

    /// No sink is registered for a category the facade needs to await.
    #[error("no sink registered for {0}")]
    NoSink(ResponseCategory),

    /// A response arrived that does not fit the command that was sent.
    #[error("unexpected response on {category}: {detail}")]
    UnexpectedResponse {
        category: ResponseCategory,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, DeviceError>;
