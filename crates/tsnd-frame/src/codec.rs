use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::reader::ByteSource;
use crate::registry::ResponseCategory;

/// Start marker opening every frame.
pub const START_BYTE: u8 = 0x9A;

/// Start marker, code and checksum bytes around the payload.
pub const FRAME_OVERHEAD: usize = 3;

/// A decoded response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Category resolved from the response code.
    pub category: ResponseCategory,
    /// Payload, exactly `category.payload_len()` bytes.
    pub payload: Bytes,
}

impl Frame {
    pub fn code(&self) -> u8 {
        self.category.code()
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }
}

/// XOR of the start marker, the code and every payload byte.
pub fn checksum(code: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(START_BYTE ^ code, |acc, byte| acc ^ byte)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬─────────────────────┬──────────────┐
/// │ Start    │ Code     │ Payload             │ BCC          │
/// │ 0x9A     │ (1B)     │ (fixed per code)    │ XOR of all   │
/// │          │          │                     │ prior bytes  │
/// └──────────┴──────────┴─────────────────────┴──────────────┘
/// ```
///
/// The payload length is not checked against the registry; outgoing command
/// arguments are the caller's responsibility.
pub fn encode_frame(code: u8, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(FRAME_OVERHEAD + payload.len());
    dst.put_u8(START_BYTE);
    dst.put_u8(code);
    dst.put_slice(payload);
    dst.put_u8(checksum(code, payload));
}

/// Decode one response frame from `source`.
///
/// Bytes before the start marker are discarded. An unregistered code fails
/// immediately after the code byte, so the next call resynchronizes on the
/// following start marker.
pub fn decode_frame<S: ByteSource + ?Sized>(source: &mut S) -> Result<Frame> {
    let mut skipped = 0usize;
    loop {
        let byte = read_exactly(source, 1)?;
        if byte[0] == START_BYTE {
            break;
        }
        skipped += 1;
    }
    if skipped > 0 {
        trace!(skipped, "discarded bytes before start marker");
    }

    let code = read_exactly(source, 1)?[0];
    let category = ResponseCategory::from_code(code).ok_or(FrameError::UnknownResponseCode(code))?;

    let payload = read_exactly(source, category.payload_len())?;
    let actual = read_exactly(source, 1)?[0];
    let expected = checksum(code, &payload);
    if actual != expected {
        return Err(FrameError::ChecksumMismatch {
            code,
            expected,
            actual,
        });
    }

    Ok(Frame { category, payload })
}

fn read_exactly<S: ByteSource + ?Sized>(source: &mut S, n: usize) -> Result<Bytes> {
    let bytes = source.read_exact(n)?;
    if bytes.len() < n {
        return Err(FrameError::Stopped);
    }
    Ok(bytes)
}
