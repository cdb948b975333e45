use std::fmt;
use std::io;

use tsnd_device::{DeviceError, RangeError};
use tsnd_frame::FrameError;
use tsnd_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. }
            if matches!(
                source.kind(),
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied)
            ) =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::Poisoned => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::UnknownResponseCode(_) | FrameError::ChecksumMismatch { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn range_error(err: RangeError) -> CliError {
    CliError::new(DATA_INVALID, err.to_string())
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::Range(err) => range_error(err),
        DeviceError::Transport(err) => transport_error(context, err),
        DeviceError::Frame(err) => frame_error(context, err),
        DeviceError::Decode(_)
        | DeviceError::ReaderFailed(_)
        | DeviceError::UnexpectedResponse { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        DeviceError::Mode(_) | DeviceError::Stopped => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_errors_are_invalid_data() {
        let err = device_error(
            "configure",
            DeviceError::Range(RangeError::new("minutes", 21u32, "0 or 1..=20")),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("minutes = 21"));
    }

    #[test]
    fn protocol_violations_are_invalid_data() {
        let err = frame_error("read", FrameError::UnknownResponseCode(0x01));
        assert_eq!(err.code, DATA_INVALID);
        let err = device_error("mode", DeviceError::ReaderFailed("bad checksum".into()));
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn channel_failures_map_to_transport_codes() {
        let err = transport_error("open", TransportError::NotOpen);
        assert_eq!(err.code, TRANSPORT_ERROR);
        let err = transport_error(
            "write",
            TransportError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow")),
        );
        assert_eq!(err.code, TIMEOUT);
        let err = device_error("record", DeviceError::Stopped);
        assert_eq!(err.code, FAILURE);
    }
}
