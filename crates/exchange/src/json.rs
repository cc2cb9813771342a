//! Streaming JSON bridge.
//!
//! A [`JsonWriter`] collects serialized JSON and, when it is closed or
//! dropped, hands the bytes to the callback it was built with. The
//! [`Request`](crate::request::Request) binds that callback either to "stage
//! as the reply body" or to "send as one chunk". A writer that produced
//! nothing never invokes its callback.

use std::fmt;
use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tracing::error;

use crate::protocol::{HttpError, ParseError};

/// Receives the bytes of a closed writer.
pub type CloseCallback<'a> = Box<dyn FnOnce(Bytes) -> Result<(), HttpError> + 'a>;

/// Collects JSON output until closed.
///
/// Values can be serialized whole with [`serialize`](Self::serialize), or
/// streamed through the `io::Write` implementation with a
/// `serde_json::Serializer`.
pub struct JsonWriter<'a> {
    buf: BytesMut,
    pretty: bool,
    on_close: Option<CloseCallback<'a>>,
}

impl<'a> JsonWriter<'a> {
    pub fn new<F>(pretty: bool, on_close: F) -> Self
    where
        F: FnOnce(Bytes) -> Result<(), HttpError> + 'a,
    {
        Self { buf: BytesMut::new(), pretty, on_close: Some(Box::new(on_close)) }
    }

    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// Bytes collected so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn serialize<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), HttpError> {
        let writer = (&mut self.buf).writer();
        let result = if self.pretty { serde_json::to_writer_pretty(writer, value) } else { serde_json::to_writer(writer, value) };
        result.map_err(ParseError::from)?;
        Ok(())
    }

    /// Closes the writer, handing its bytes to the callback.
    ///
    /// Errors raised by the callback are logged, never returned: closing
    /// always completes.
    pub fn close(mut self) {
        self.do_close();
    }

    fn do_close(&mut self) {
        let Some(on_close) = self.on_close.take() else {
            return;
        };
        if self.buf.is_empty() {
            return;
        }

        let bytes = self.buf.split().freeze();
        if let Err(e) = on_close(bytes) {
            error!(cause = %e, "failed to deliver json output");
        }
    }
}

impl io::Write for JsonWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for JsonWriter<'_> {
    fn drop(&mut self) {
        self.do_close();
    }
}

impl fmt::Debug for JsonWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWriter")
            .field("len", &self.buf.len())
            .field("pretty", &self.pretty)
            .field("closed", &self.on_close.is_none())
            .finish()
    }
}
