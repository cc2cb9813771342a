//! Wire codecs for HTTP/1.x message heads and chunked bodies.
//!
//! - [`HeadEncoder`]: renders a start line plus a [`Headers`](crate::protocol::Headers) table
//! - [`ChunkedEncoder`]: frames body segments for `Transfer-Encoding: chunked`
//! - [`RequestHeadDecoder`] / [`ResponseHeadDecoder`]: parse inbound heads with `httparse`
//!
//! All of them implement the `tokio_util::codec` traits so they can also be
//! driven by a `FramedRead`/`FramedWrite`.

mod chunked_encoder;
mod head_decoder;
mod head_encoder;

pub use chunked_encoder::ChunkedEncoder;
pub use head_decoder::{RequestHead, RequestHeadDecoder, ResponseHead, ResponseHeadDecoder};
pub use head_encoder::{HeadEncoder, MessageHead, StartLine};

use bytes::{BufMut, BytesMut};
use std::io;

/// `io::Write` adapter appending to a `BytesMut`, used to `write!` numbers
/// and start lines straight into the output buffer.
pub(crate) struct FastWrite<'a>(pub(crate) &'a mut BytesMut);

impl io::Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
