use tsnd_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A start marker was followed by a code absent from the response registry.
    #[error("unknown response code 0x{0:02X}")]
    UnknownResponseCode(u8),

    /// The trailing checksum byte disagrees with the frame contents.
    #[error("checksum mismatch for code 0x{code:02X} (expected 0x{expected:02X}, got 0x{actual:02X})")]
    ChecksumMismatch { code: u8, expected: u8, actual: u8 },

    /// The source returned short because the stop condition was observed.
    #[error("read stopped before a complete frame was received")]
    Stopped,

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// An I/O error occurred on a plain reader.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// True for errors that mean the byte stream itself is corrupt.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            FrameError::UnknownResponseCode(_) | FrameError::ChecksumMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
