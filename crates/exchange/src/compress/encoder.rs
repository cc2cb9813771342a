use std::io;
use std::io::Write;

use bytes::{Bytes, BytesMut};
use flate2::write::{GzEncoder, ZlibEncoder};
use tracing::{error, trace};

use crate::compress::Compression;
use crate::protocol::ProtocolError;

// inspired by actix-http: compressed bytes are collected in memory and moved
// to the sink after every write.
struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A compressor for one body.
enum Encoder {
    Gzip(GzEncoder<Writer>),
    Zlib(ZlibEncoder<Writer>),
    Bzip2(bzip2::write::BzEncoder<Writer>),
    Lz4(lz4_flex::frame::FrameEncoder<Writer>),
}

impl Encoder {
    /// Builds the compressor for `compression`, `None` for an uncompressed body.
    fn new(compression: Compression, level: u32) -> Result<Option<Self>, ProtocolError> {
        let encoder = match compression {
            Compression::None => return Ok(None),
            Compression::Gzip => Self::Gzip(GzEncoder::new(Writer::new(), flate2::Compression::new(level))),
            Compression::Zlib => Self::Zlib(ZlibEncoder::new(Writer::new(), flate2::Compression::new(level))),
            Compression::Bzip2 => Self::Bzip2(bzip2::write::BzEncoder::new(Writer::new(), bzip2::Compression::new(level))),
            Compression::Lz4 => Self::Lz4(lz4_flex::frame::FrameEncoder::new(Writer::new())),
            Compression::Auto => return Err(ProtocolError::UnsupportedCompression { compression: compression.name() }),
        };
        Ok(Some(encoder))
    }

    fn name(&self) -> &'static str {
        match self {
            Encoder::Gzip(_) => "gzip",
            Encoder::Zlib(_) => "zlib",
            Encoder::Bzip2(_) => "bzip2",
            Encoder::Lz4(_) => "lz4",
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let result = match self {
            Self::Gzip(encoder) => encoder.write_all(data),
            Self::Zlib(encoder) => encoder.write_all(data),
            Self::Bzip2(encoder) => encoder.write_all(data),
            Self::Lz4(encoder) => encoder.write_all(data),
        };
        if let Err(err) = &result {
            trace!("error encoding {} encoding: {}", self.name(), err);
        }
        result
    }

    /// Takes the bytes compressed so far.
    fn take(&mut self) -> Bytes {
        match self {
            Self::Gzip(encoder) => encoder.get_mut().take(),
            Self::Zlib(encoder) => encoder.get_mut().take(),
            Self::Bzip2(encoder) => encoder.get_mut().take(),
            Self::Lz4(encoder) => encoder.get_mut().take(),
        }
    }

    /// Finishes the stream and returns the trailing bytes.
    fn finish(self) -> io::Result<Bytes> {
        let mut writer = match self {
            Self::Gzip(encoder) => encoder.finish()?,
            Self::Zlib(encoder) => encoder.finish()?,
            Self::Bzip2(encoder) => encoder.finish()?,
            Self::Lz4(encoder) => encoder.finish().map_err(io::Error::other)?,
        };
        Ok(writer.take())
    }
}

/// A compressor stage in front of a byte buffer.
///
/// Everything written is compressed with the chosen scheme and appended to
/// the sink. The compressed stream is completed by [`finish`](Self::finish)
/// or, failing that, when the stream is dropped; an error during that
/// drop-time flush is logged.
pub struct OutputStream<'a> {
    sink: &'a mut BytesMut,
    compression: Compression,
    encoder: Option<Encoder>,
}

impl<'a> OutputStream<'a> {
    /// Creates a stream over `sink`. `Compression::Auto` must be resolved by
    /// the caller and is rejected here.
    pub fn new(compression: Compression, level: u32, sink: &'a mut BytesMut) -> Result<Self, ProtocolError> {
        let encoder = Encoder::new(compression, level)?;
        Ok(Self { sink, compression, encoder })
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Completes the compressed stream.
    pub fn finish(mut self) -> io::Result<()> {
        self.do_finish()
    }

    fn do_finish(&mut self) -> io::Result<()> {
        if let Some(encoder) = self.encoder.take() {
            let rest = encoder.finish()?;
            self.sink.extend_from_slice(&rest);
        }
        Ok(())
    }
}

impl io::Write for OutputStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.encoder {
            Some(encoder) => {
                encoder.write(buf)?;
                let bytes = encoder.take();
                self.sink.extend_from_slice(&bytes);
            }
            None => self.sink.extend_from_slice(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for OutputStream<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.do_finish() {
            error!(compression = %self.compression, "failed to finish compressed stream: {}", e);
        }
    }
}

impl std::fmt::Debug for OutputStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("compression", &self.compression)
            .field("buffered", &self.sink.len())
            .field("finished", &self.encoder.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    const TEXT: &[u8] = b"the quick brown fox jumps over the lazy dog, the quick brown fox jumps over the lazy dog";

    fn compress(compression: Compression) -> BytesMut {
        let mut sink = BytesMut::new();
        let mut out = OutputStream::new(compression, 6, &mut sink).unwrap();
        out.write_all(&TEXT[..40]).unwrap();
        out.write_all(&TEXT[40..]).unwrap();
        out.finish().unwrap();
        sink
    }

    #[test]
    fn identity_passes_bytes_through() {
        assert_eq!(&compress(Compression::None)[..], TEXT);
    }

    #[test]
    fn gzip_round_trip() {
        let sink = compress(Compression::Gzip);
        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(&sink[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, TEXT);
    }

    #[test]
    fn zlib_round_trip() {
        let sink = compress(Compression::Zlib);
        let mut decoded = Vec::new();
        flate2::read::ZlibDecoder::new(&sink[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, TEXT);
    }

    #[test]
    fn bzip2_round_trip() {
        let sink = compress(Compression::Bzip2);
        let mut decoded = Vec::new();
        bzip2::read::BzDecoder::new(&sink[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, TEXT);
    }

    #[test]
    fn lz4_round_trip() {
        let sink = compress(Compression::Lz4);
        let mut decoded = Vec::new();
        lz4_flex::frame::FrameDecoder::new(&sink[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, TEXT);
    }

    #[test]
    fn drop_completes_the_stream() {
        let mut sink = BytesMut::new();
        {
            let mut out = OutputStream::new(Compression::Gzip, 6, &mut sink).unwrap();
            out.write_all(TEXT).unwrap();
        }
        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(&sink[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, TEXT);
    }

    #[test]
    fn auto_is_rejected() {
        let mut sink = BytesMut::new();
        assert!(matches!(
            OutputStream::new(Compression::Auto, 6, &mut sink),
            Err(ProtocolError::UnsupportedCompression { .. })
        ));
    }
}
