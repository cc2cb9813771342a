use std::io::Write;

use bytes::{Bytes, BytesMut};
use http::{Method, StatusCode, Version};
use tokio_util::codec::Encoder;
use tracing::{debug, info, trace};

use crate::codec::{HeadEncoder, MessageHead, StartLine};
use crate::compress::{Compression, OutputStream};
use crate::connection::PendingWrite;
use crate::date::DateService;
use crate::ensure;
use crate::json::JsonWriter;
use crate::protocol::{HttpError, ProtocolError, SendError};
use crate::request::{Direction, Request};

impl Request {
    /// False when the status or method forbids a response body: `HEAD`,
    /// `204`, `304` and every `1xx`.
    pub fn must_have_body(&self) -> bool {
        must_have_body(&self.method, self.status)
    }

    /// True for the methods that carry a request body.
    pub fn may_have_body(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
    }

    /// Returns a stream appending to the output, compressed with
    /// `compression`. `Compression::Auto` is resolved from the peer's
    /// `Accept-Encoding`. `Content-Encoding` is set to match.
    pub fn output_stream(&mut self, compression: Compression) -> Result<OutputStream<'_>, HttpError> {
        let compression = match compression {
            Compression::Auto => self.requested_compression(),
            compression => compression,
        };
        self.set_content_encoding(compression)?;

        let level = self.config.compression_level();
        Ok(OutputStream::new(compression, level, &mut self.output)?)
    }

    /// A JSON writer whose output becomes the reply body.
    ///
    /// The output is cleared now. When the writer closes with content,
    /// `Content-Type` is set to `application/json` and the bytes are staged
    /// through the negotiated compression.
    pub fn json_writer(&mut self) -> JsonWriter<'_> {
        self.output.clear();
        let pretty = self.wants_pretty_json();

        JsonWriter::new(pretty, move |bytes| {
            self.set_content_type(mime::APPLICATION_JSON.as_ref());
            let mut out = self.output_stream(Compression::Auto)?;
            out.write_all(&bytes)?;
            out.finish()?;
            Ok(())
        })
    }

    /// A JSON writer whose output is sent as one chunk when it closes.
    pub fn json_chunk_writer(&mut self) -> JsonWriter<'_> {
        let pretty = self.wants_pretty_json();
        JsonWriter::new(pretty, move |bytes| self.send_chunk(bytes))
    }

    /// Renders the message with the staged output and queues it.
    ///
    /// `None` replies `500 Internal Server Error`. Only a WebSocket
    /// exchange may reply more than once.
    pub fn reply<S: Into<Option<StatusCode>>>(&mut self, status: S) -> Result<(), HttpError> {
        ensure!(!self.replying || self.websocket, ProtocolError::AlreadyReplying);
        ensure!(!self.has_connection_error(), SendError::ConnectionError);

        self.status = Some(status.into().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
        self.write()?;
        self.replying = true;
        Ok(())
    }

    pub fn reply_with<S: Into<Option<StatusCode>>, B: AsRef<[u8]>>(&mut self, status: S, body: B) -> Result<(), HttpError> {
        self.send(body);
        self.reply(status)
    }

    /// Replies with headers only and switches to chunked transfer encoding.
    ///
    /// Fails when `Content-Length` is set, below HTTP/1.1, when the method
    /// and status forbid a body, or when output is already staged.
    pub fn start_chunked(&mut self, status: StatusCode) -> Result<(), HttpError> {
        ensure!(!self.replying || self.websocket, ProtocolError::AlreadyReplying);
        ensure!(!self.out_has("Content-Length"), ProtocolError::ChunkedWithContentLength);
        ensure!(self.version >= Version::HTTP_11, ProtocolError::ChunkedVersion { version: self.version });
        ensure!(
            must_have_body(&self.method, Some(status)),
            ProtocolError::ChunkedWithoutBody { method: self.method.clone(), status: Some(status) }
        );
        ensure!(self.output.is_empty(), ProtocolError::ChunkedPendingOutput { pending: self.output.len() });
        ensure!(!self.has_connection_error(), SendError::ConnectionError);

        self.out_set("Transfer-Encoding", "chunked");
        self.chunked.start();
        self.reply(status)
    }

    /// Sends `data` as one chunk. An empty chunk ends the body.
    pub fn send_chunk<B: AsRef<[u8]>>(&mut self, data: B) -> Result<(), HttpError> {
        let data = data.as_ref();
        ensure!(self.chunked.is_active(), ProtocolError::NotChunked);
        ensure!(!self.has_connection_error(), SendError::ConnectionError);

        let mut frame = BytesMut::with_capacity(data.len() + 16);
        self.chunked.encode(data, &mut frame)?;
        trace!("{} chunk of {} bytes", self.log_prefix(), data.len());

        let keep_open = self.chunked.is_active() || self.websocket;
        self.enqueue(frame.freeze(), keep_open);
        Ok(())
    }

    pub fn end_chunked(&mut self) -> Result<(), HttpError> {
        self.send_chunk(b"")
    }

    /// Answers with `Location: <location>` and an empty body.
    pub fn redirect<L: ToString>(&mut self, location: L, status: StatusCode) -> Result<(), HttpError> {
        self.out_set("Location", location.to_string());
        self.out_set("Content-Length", "0");
        self.output.clear();
        self.reply(status)
    }

    fn write(&mut self) -> Result<(), HttpError> {
        match self.direction {
            Direction::Incoming => self.finalize_response_headers(),
            Direction::Outgoing => self.finalize_request_headers(),
        }

        let mut message = BytesMut::with_capacity(self.output.len() + 512);
        HeadEncoder.encode(MessageHead { start_line: self.start_line(), headers: &self.output_headers }, &mut message)?;
        self.log_head();

        let body = self.output.split();
        if !body.is_empty() {
            trace!("{} body: {:?}", self.log_prefix(), body);
        }
        message.extend_from_slice(&body);

        let keep_open = self.chunked.is_active() || self.websocket;
        self.enqueue(message.freeze(), keep_open);
        Ok(())
    }

    fn start_line(&self) -> StartLine<'_> {
        match self.direction {
            Direction::Incoming => StartLine::Status {
                version: self.version,
                status: self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                reason: self.status_line.as_deref(),
            },
            Direction::Outgoing => StartLine::Request { method: &self.method, uri: &self.uri, version: self.version },
        }
    }

    fn log_head(&self) {
        let prefix = self.log_prefix();
        let line = self.start_line();
        match self.direction {
            Direction::Incoming if self.status.is_some_and(|s| s.as_u16() >= 300) => info!("{} > {}", prefix, line),
            Direction::Incoming => debug!("{} > {}", prefix, line),
            Direction::Outgoing => info!("{} > {}", prefix, line),
        }
        debug!("{} headers:\n{}", prefix, self.output_headers);
    }

    fn finalize_response_headers(&mut self) {
        let version = self.version;
        if version == Version::HTTP_10 || version == Version::HTTP_11 {
            if version >= Version::HTTP_11 && !self.out_has("Date") {
                let date = DateService::get_global_instance().http_date();
                self.out_set("Date", &*date);
            }

            let keep_alive = self.input_headers.connection_keep_alive();
            if version == Version::HTTP_10 && keep_alive {
                self.out_set("Connection", "keep-alive");
            }

            if (version >= Version::HTTP_11 || keep_alive)
                && self.must_have_body()
                && !self.out_has("Transfer-Encoding")
                && !self.out_has("Content-Length")
            {
                self.out_set("Content-Length", self.output.len().to_string());
            }
        }

        if self.must_have_body() && !self.has_content_type() {
            self.guess_content_type();
        }

        if self.input_headers.needs_close() {
            self.out_set("Connection", "close");
        }
    }

    fn finalize_request_headers(&mut self) {
        if !self.out_has("Host") {
            if let Some(authority) = self.uri.authority().map(ToString::to_string) {
                self.out_set("Host", authority);
            }
        }

        if !self.out_has("Connection") {
            self.out_set("Connection", "close");
        }

        if self.may_have_body() && !self.out_has("Content-Length") {
            self.out_set("Content-Length", self.output.len().to_string());
        }
    }

    /// Hands `bytes` to the connection. Without a connection the write is
    /// dropped and completes as failed.
    fn enqueue(&mut self, bytes: Bytes, keep_open: bool) {
        self.bytes_written += bytes.len() as u64;
        let on_complete = self.writes.begin();

        match &self.connection {
            Some(connection) => {
                connection.write_request(PendingWrite { exchange_id: self.id(), bytes, keep_open, on_complete });
            }
            None => {
                debug!("{} no connection, dropping {} bytes", self.log_prefix(), bytes.len());
                on_complete(false);
            }
        }
    }
}

fn must_have_body(method: &Method, status: Option<StatusCode>) -> bool {
    let code = status.map_or(0, |s| s.as_u16());
    *method != Method::HEAD && code != 204 && code != 304 && !(100..200).contains(&code)
}
