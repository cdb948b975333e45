/// Errors that can occur on the physical channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial endpoint.
    #[error("failed to open {endpoint}: {source}")]
    Open {
        endpoint: String,
        source: serialport::Error,
    },

    /// `open` was called while a channel is already owned.
    #[error("transport already open on {0}")]
    AlreadyOpen(String),

    /// The operation needs an open channel and there is none.
    #[error("transport is not open")]
    NotOpen,

    /// An I/O error occurred on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel lock was poisoned by a panicking holder.
    #[error("transport lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, TransportError>;
