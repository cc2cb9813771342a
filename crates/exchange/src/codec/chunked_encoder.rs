use std::io::Write;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::FastWrite;
use crate::ensure;
use crate::protocol::{HttpError, ProtocolError};

/// Chunked transfer-encoding framer.
///
/// The encoder starts inactive; [`start`](Self::start) arms it and each
/// encoded buffer becomes one `<hex-len>\r\n<bytes>\r\n` segment. Encoding
/// an empty buffer writes the terminating `0\r\n\r\n` and deactivates the
/// encoder, after which every further chunk is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedEncoder {
    active: bool,
    chunks: u64,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.active = true;
        self.chunks = 0;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of segments written since the last `start`, terminator included.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }
}

impl<D: Buf> Encoder<D> for ChunkedEncoder {
    type Error = HttpError;

    fn encode(&mut self, item: D, dst: &mut BytesMut) -> Result<(), Self::Error> {
        ensure!(self.active, ProtocolError::NotChunked);

        let len = item.remaining();
        if len == 0 {
            self.active = false;
        }

        trace!(chunk_size = len, "encode chunk");
        write!(FastWrite(dst), "{len:x}\r\n")?;
        dst.reserve(len + 2);
        dst.put(item);
        dst.put_slice(b"\r\n");
        self.chunks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;
    use bytes::Bytes;

    #[test]
    fn inactive_rejects_chunks() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        let err = encoder.encode(Bytes::from_static(b"data"), &mut dst).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert!(dst.is_empty());
    }

    #[test]
    fn lowercase_hex_length() {
        let mut encoder = ChunkedEncoder::new();
        encoder.start();

        let mut dst = BytesMut::new();
        encoder.encode(Bytes::from(vec![b'x'; 26]), &mut dst).unwrap();

        let mut expected = b"1a\r\n".to_vec();
        expected.extend_from_slice(&[b'x'; 26]);
        expected.extend_from_slice(b"\r\n");
        assert_eq!(&dst[..], &expected[..]);
        assert!(encoder.is_active());
    }

    #[test]
    fn empty_chunk_terminates() {
        let mut encoder = ChunkedEncoder::new();
        encoder.start();

        let mut dst = BytesMut::new();
        encoder.encode(&b"hello"[..], &mut dst).unwrap();
        encoder.encode(&b""[..], &mut dst).unwrap();

        assert_eq!(&dst[..], b"5\r\nhello\r\n0\r\n\r\n");
        assert!(!encoder.is_active());
        assert_eq!(encoder.chunks(), 2);

        assert!(encoder.encode(&b"late"[..], &mut dst).is_err());
    }
}
