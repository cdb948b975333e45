use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tsnd_transport::Transport;

use crate::codec::{decode_frame, Frame};
use crate::error::{FrameError, Result};

/// Something the decoder can pull exact byte counts from.
///
/// A result shorter than requested means the source was asked to stop; the
/// decoder reports that as [`FrameError::Stopped`].
pub trait ByteSource {
    fn read_exact(&mut self, n: usize) -> Result<Bytes>;
}

impl ByteSource for &Transport {
    fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        Ok(Transport::read_exact(*self, n)?)
    }
}

/// Adapts any `Read` stream to a [`ByteSource`].
///
/// End of stream is reported as [`FrameError::ConnectionClosed`].
#[derive(Debug)]
pub struct IoSource<R> {
    inner: R,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for IoSource<R> {
    fn read_exact(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        let mut filled = 0usize;
        while filled < n {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(read) => filled += read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(buf.freeze())
    }
}

/// Reads complete frames from a [`ByteSource`].
///
/// Resynchronization and partial reads are handled internally; callers always
/// get complete, checksum-verified frames.
pub struct FrameReader<S> {
    inner: S,
    frames_read: u64,
}

impl<S: ByteSource> FrameReader<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            frames_read: 0,
        }
    }

    /// Read the next complete frame (blocking).
    pub fn read_frame(&mut self) -> Result<Frame> {
        let frame = decode_frame(&mut self.inner)?;
        self.frames_read += 1;
        Ok(frame)
    }

    /// Number of frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tsnd_transport::{Link, LinkSettings, StopSignal};

    use super::*;
    use crate::codec::encode_frame;
    use crate::registry::ResponseCategory;

    struct ByteByByteReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        data: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(ErrorKind::Interrupted.into());
            }
            self.data.read(buf)
        }
    }

    fn frame_bytes(code: u8, payload: &[u8]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_frame(code, payload, &mut wire);
        wire.to_vec()
    }

    #[test]
    fn read_frame_handles_byte_by_byte_input() {
        let data = frame_bytes(0x93, &[0, 0, 1, 1, 0, 0, 0, 100, 1, 1, 0, 0, 0]);
        let mut reader = FrameReader::new(IoSource::new(ByteByByteReader { data, pos: 0 }));

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.category, ResponseCategory::RecordingTimeSettings);
        assert_eq!(frame.payload[7], 100);
        assert_eq!(reader.frames_read(), 1);
    }

    #[test]
    fn read_frame_retries_on_interrupted() {
        let mut reader = FrameReader::new(IoSource::new(InterruptedThenData {
            interrupted: false,
            data: Cursor::new(frame_bytes(0xB6, &[4])),
        }));

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.category, ResponseCategory::SavedEntryNum);
        assert_eq!(frame.payload.as_ref(), &[4]);
    }

    #[test]
    fn empty_stream_is_connection_closed() {
        let mut reader = FrameReader::new(IoSource::new(Cursor::new(Vec::new())));
        assert!(matches!(reader.read_frame(), Err(FrameError::ConnectionClosed)));
    }

    #[derive(Clone)]
    struct Replay(Arc<Mutex<Cursor<Vec<u8>>>>);

    impl Read for Replay {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let read = self.0.lock().unwrap().read(buf)?;
            if read == 0 {
                std::thread::sleep(Duration::from_millis(2));
                return Err(ErrorKind::TimedOut.into());
            }
            Ok(read)
        }
    }

    impl std::io::Write for Replay {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn transport_source_decodes_and_reports_stop() {
        let replay = Replay(Arc::new(Mutex::new(Cursor::new(frame_bytes(0xBC, &[0])))));
        let transport = Transport::new(StopSignal::new());
        let link = replay.clone();
        let connector = move |_: &LinkSettings| -> tsnd_transport::Result<Box<dyn Link>> {
            Ok(Box::new(link.clone()))
        };
        transport
            .open(&connector, &LinkSettings::new("replay"), Duration::ZERO)
            .unwrap();

        let mut reader = FrameReader::new(&transport);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.category, ResponseCategory::Mode);

        transport.stop_signal().trigger();
        assert!(matches!(reader.read_frame(), Err(FrameError::Stopped)));
    }
}
