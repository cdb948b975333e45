//! Wire framing for the TSND151 serial protocol.
//!
//! Every message on the wire is framed as:
//! - A 1-byte start marker (`0x9A`) for stream synchronization
//! - A 1-byte command or response code
//! - A payload whose length is fixed per code
//! - A 1-byte checksum: XOR of every preceding byte of the frame
//!
//! Response codes and their payload lengths form a closed registry
//! ([`ResponseCategory`]); anything else on the wire is a protocol violation.

pub mod codec;
pub mod command;
pub mod error;
pub mod reader;
pub mod registry;

pub use codec::{checksum, decode_frame, encode_frame, Frame, FRAME_OVERHEAD, START_BYTE};
pub use command::{Command, CommandCode, PLACEHOLDER_ARG};
pub use error::{FrameError, Result};
pub use reader::{ByteSource, FrameReader, IoSource};
pub use registry::ResponseCategory;
