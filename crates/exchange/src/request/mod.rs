//! One HTTP exchange.
//!
//! A [`Request`] holds both halves of an exchange: the inbound message (what
//! a client sent to us, or what a server answered to our outgoing request)
//! and the outbound message being composed. Handlers read the inbound side
//! through the accessors in this module and answer through the write side
//! in `reply` and `send_error`.
//!
//! The request never touches a socket. Rendered messages and chunks are
//! handed to the [`Connection`] it belongs to, which reports the outcome of
//! each write later. A failed write is recorded on the request and every
//! following write is refused.

mod reply;
mod send_error;

use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::{Bytes, BytesMut};
use http::{Method, StatusCode, Uri, Version};
use httpdate::fmt_http_date;
use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace};

use crate::codec::{ChunkedEncoder, RequestHead, ResponseHead, StartLine};
use crate::compress::{Compression, requested_compression};
use crate::config::ExchangeConfig;
use crate::connection::{Connection, SecureSession, WriteTracker};
use crate::protocol::{Cookie, Headers, HttpError, ParseError, ProtocolError, SendError, Session, cookie, parse_http_version};

/// Which side of the exchange we are.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    /// A request received by a server, answered with a response.
    Incoming,
    /// A request sent by a client, answered by the peer.
    Outgoing,
}

/// Prefix for every log line written on behalf of a request: `REQ<id>:` for
/// incoming and `OUT<id>:` for outgoing exchanges.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LogPrefix {
    direction: Direction,
    id: u64,
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Incoming => write!(f, "REQ{}:", self.id),
            Direction::Outgoing => write!(f, "OUT{}:", self.id),
        }
    }
}

/// One request/response exchange.
pub struct Request {
    connection: Option<Arc<dyn Connection>>,
    direction: Direction,
    config: Arc<ExchangeConfig>,

    method: Method,
    uri: Uri,
    version: Version,
    status: Option<StatusCode>,
    /// Reason phrase exactly as a peer sent it.
    status_line: Option<String>,

    input_headers: Headers,
    output_headers: Headers,
    input: BytesMut,
    output: BytesMut,

    message: OnceCell<Option<Value>>,
    args: OnceCell<Map<String, Value>>,

    session: Option<Arc<Session>>,
    user: String,

    replying: bool,
    websocket: bool,
    chunked: ChunkedEncoder,
    writes: Arc<WriteTracker>,
    bytes_written: u64,
}

impl Request {
    pub fn new(direction: Direction, connection: Option<Arc<dyn Connection>>, method: Method, uri: Uri, version: Version) -> Self {
        Self {
            connection,
            direction,
            config: Arc::default(),
            method,
            uri,
            version,
            status: None,
            status_line: None,
            input_headers: Headers::new(),
            output_headers: Headers::new(),
            input: BytesMut::new(),
            output: BytesMut::new(),
            message: OnceCell::new(),
            args: OnceCell::new(),
            session: None,
            user: String::new(),
            replying: false,
            websocket: false,
            chunked: ChunkedEncoder::new(),
            writes: WriteTracker::new(),
            bytes_written: 0,
        }
    }

    /// A request received on `connection`, to be answered with a response.
    pub fn incoming(connection: Arc<dyn Connection>, method: Method, uri: Uri, version: Version) -> Self {
        Self::new(Direction::Incoming, Some(connection), method, uri, version)
    }

    /// An HTTP/1.1 request to be sent on `connection`.
    pub fn outgoing(connection: Arc<dyn Connection>, method: Method, uri: Uri) -> Self {
        Self::new(Direction::Outgoing, Some(connection), method, uri, Version::HTTP_11)
    }

    /// Builds an incoming request from a decoded head.
    pub fn from_request_head(connection: Arc<dyn Connection>, head: RequestHead) -> Self {
        let RequestHead { method, uri, version, headers } = head;
        let mut request = Self::incoming(connection, method, uri, version);
        request.input_headers = headers;
        request
    }

    pub fn with_config(mut self, config: Arc<ExchangeConfig>) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Stores a decoded response head on an outgoing request.
    pub fn apply_response_head(&mut self, head: ResponseHead) {
        self.version = head.version;
        self.status = Some(head.status);
        self.status_line = head.reason;
        self.input_headers = head.headers;
    }

    // connection

    /// Id of the owning connection, `0` without one.
    pub fn id(&self) -> u64 {
        self.connection.as_ref().map_or(0, |c| c.id())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Asks the owning connection. A detached request counts as incoming.
    pub fn is_incoming(&self) -> bool {
        self.connection.as_ref().is_none_or(|c| c.is_incoming())
    }

    pub fn log_prefix(&self) -> LogPrefix {
        LogPrefix { direction: self.direction, id: self.id() }
    }

    pub fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.connection.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_connected())
    }

    pub fn secure_session(&self) -> Option<SecureSession> {
        self.connection.as_ref().and_then(|c| c.secure_session())
    }

    pub fn is_secure(&self) -> bool {
        self.secure_session().is_some()
    }

    pub fn client_addr(&self) -> Option<SocketAddr> {
        self.connection.as_ref().and_then(|c| c.peer_addr())
    }

    // protocol fields

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// The reason phrase a peer sent, when it was parsed from the wire.
    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    /// True for a 2xx status without a connection error.
    pub fn is_ok(&self) -> bool {
        self.status.is_some_and(|s| s.is_success()) && !self.has_connection_error()
    }

    pub fn response_line(&self) -> String {
        match self.status {
            Some(status) => {
                StartLine::Status { version: self.version, status, reason: self.status_line.as_deref() }.to_string()
            }
            None => {
                let reason = self.status_line.as_deref().unwrap_or("Unknown");
                format!("HTTP/{} 0 {}", crate::protocol::version_number(self.version), reason)
            }
        }
    }

    pub fn request_line(&self) -> String {
        StartLine::Request { method: &self.method, uri: &self.uri, version: self.version }.to_string()
    }

    /// Parses `HTTP/<v> <code> [reason]` into version, status and reason.
    pub fn parse_response_line(&mut self, line: &str) -> Result<(), HttpError> {
        let mut parts = line.trim_end_matches(['\r', '\n']).splitn(3, ' ');
        let (Some(version), Some(code)) = (parts.next(), parts.next()) else {
            return Err(ParseError::invalid_response_line(line).into());
        };

        let version = parse_http_version(version)?;
        let status = code
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| ParseError::invalid_status(code))?;

        self.version = version;
        self.status = Some(status);
        self.status_line = parts.next().filter(|reason| !reason.is_empty()).map(str::to_string);
        Ok(())
    }

    pub fn is_websocket(&self) -> bool {
        self.websocket
    }

    /// Marks the exchange as upgraded, which allows repeated replies.
    pub fn set_websocket(&mut self, websocket: bool) {
        self.websocket = websocket;
    }

    // session

    /// The session id from the configured header, else the configured cookie.
    pub fn session_id(&self) -> &str {
        self.session_id_from(self.config.session_cookie(), self.config.session_header())
    }

    pub fn session_id_from(&self, cookie: &str, header: &str) -> &str {
        if self.in_has(header) { self.in_find(header) } else { self.find_cookie(cookie) }
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, session: Option<Arc<Session>>) {
        self.session = session;
    }

    /// The session's user when a session with a user is attached, else the
    /// user set on this request.
    pub fn user(&self) -> String {
        match &self.session {
            Some(session) if session.has_user() => session.user().map(|u| u.to_string()).unwrap_or_default(),
            _ => self.user.clone(),
        }
    }

    /// Sets the user here and on the attached session.
    pub fn set_user<S: Into<String>>(&mut self, user: S) {
        self.user = user.into();
        if let Some(session) = &self.session {
            session.set_user(self.user.as_str());
        }
    }

    // headers

    pub fn input_headers(&self) -> &Headers {
        &self.input_headers
    }

    pub fn input_headers_mut(&mut self) -> &mut Headers {
        &mut self.input_headers
    }

    pub fn output_headers(&self) -> &Headers {
        &self.output_headers
    }

    pub fn output_headers_mut(&mut self) -> &mut Headers {
        &mut self.output_headers
    }

    pub fn in_has(&self, name: &str) -> bool {
        self.input_headers.has(name)
    }

    pub fn in_find(&self, name: &str) -> &str {
        self.input_headers.find(name)
    }

    pub fn in_get(&self, name: &str) -> Result<&str, HttpError> {
        self.input_headers.get(name)
    }

    pub fn in_set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.input_headers.set(name, value);
    }

    pub fn in_remove(&mut self, name: &str) {
        self.input_headers.remove(name);
    }

    pub fn out_has(&self, name: &str) -> bool {
        self.output_headers.has(name)
    }

    pub fn out_find(&self, name: &str) -> &str {
        self.output_headers.find(name)
    }

    pub fn out_get(&self, name: &str) -> Result<&str, HttpError> {
        self.output_headers.get(name)
    }

    pub fn out_set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.output_headers.set(name, value);
    }

    pub fn out_remove(&mut self, name: &str) {
        self.output_headers.remove(name);
    }

    pub fn has_content_type(&self) -> bool {
        self.output_headers.has_content_type()
    }

    pub fn content_type(&self) -> &str {
        self.output_headers.content_type()
    }

    pub fn set_content_type<V: Into<String>>(&mut self, content_type: V) {
        self.output_headers.set_content_type(content_type);
    }

    /// Sets the output `Content-Type` from the extension of the URI path.
    pub fn guess_content_type(&mut self) {
        let extension = uri_extension(&self.uri);
        self.output_headers.guess_content_type(extension);
    }

    /// Either side asked to close the connection.
    pub fn needs_close(&self) -> bool {
        self.input_headers.needs_close() || self.output_headers.needs_close()
    }

    pub fn is_persistent(&self) -> bool {
        (self.version >= Version::HTTP_11 || self.input_headers.connection_keep_alive()) && !self.needs_close()
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        if self.version < Version::HTTP_11 {
            if persistent {
                self.out_set("Connection", "Keep-Alive");
            } else {
                self.out_remove("Connection");
            }
        } else if persistent {
            self.out_remove("Connection");
        } else {
            self.out_set("Connection", "close");
        }
    }

    /// Lets caches keep the response for `max_age` seconds, or forbids
    /// caching when `max_age` is zero.
    pub fn set_cache(&mut self, max_age: u32) {
        let now = SystemTime::now();
        let date = fmt_http_date(now);
        self.out_set("Date", date.as_str());

        if max_age > 0 {
            self.out_set("Cache-Control", format!("max-age={max_age}"));
            self.out_set("Expires", fmt_http_date(now + Duration::from_secs(u64::from(max_age))));
        } else {
            self.out_set("Cache-Control", "max-age=0, no-cache, no-store");
            self.out_set("Expires", date);
        }
    }

    pub fn set_content_encoding(&mut self, compression: Compression) -> Result<(), HttpError> {
        if compression == Compression::Auto {
            return Err(ProtocolError::UnsupportedCompression { compression: compression.name() }.into());
        }
        if let Some(encoding) = compression.content_encoding() {
            self.out_set("Content-Encoding", encoding);
        }
        Ok(())
    }

    /// The scheme the peer's `Accept-Encoding` asks for.
    pub fn requested_compression(&self) -> Compression {
        requested_compression(self.in_has("Accept-Encoding").then(|| self.in_find("Accept-Encoding")))
    }

    // cookies

    pub fn has_cookie(&self, name: &str) -> bool {
        cookie::lookup(self.in_find("Cookie"), name).is_some()
    }

    /// The value of the first cookie called `name`, empty when absent.
    pub fn find_cookie(&self, name: &str) -> &str {
        cookie::lookup(self.in_find("Cookie"), name).unwrap_or("")
    }

    pub fn get_cookie(&self, name: &str) -> Result<&str, HttpError> {
        cookie::lookup(self.in_find("Cookie"), name).ok_or_else(|| HttpError::not_found(format!("cookie '{name}'")))
    }

    pub fn set_cookie(&mut self, cookie: &Cookie) {
        self.output_headers.insert("Set-Cookie", cookie.to_string());
    }

    // bodies

    pub fn input(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.input)
    }

    pub fn input_bytes(&self) -> &[u8] {
        &self.input
    }

    /// Adds received body bytes.
    pub fn append_input(&mut self, data: &[u8]) {
        self.input.extend_from_slice(data);
    }

    /// The output staged for the next write.
    pub fn output(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }

    pub fn output_bytes(&self) -> &[u8] {
        &self.output
    }

    pub fn send<B: AsRef<[u8]>>(&mut self, data: B) {
        self.output.extend_from_slice(data.as_ref());
    }

    pub fn send_str(&mut self, data: &str) {
        self.send(data);
    }

    pub fn send_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), HttpError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HttpError::not_found(path.display()),
            _ => HttpError::from(e),
        })?;
        self.send(Bytes::from(data));
        Ok(())
    }

    /// Parses the input as JSON whatever its content type. An empty input
    /// yields `None`.
    pub fn input_json(&self) -> Result<Option<Value>, HttpError> {
        if self.input.is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_slice(&self.input).map_err(ParseError::from)?;
        Ok(Some(value))
    }

    /// The input parsed as JSON when it is declared `application/json`.
    ///
    /// Parsed at most once per request.
    pub fn json_message(&self) -> Result<Option<&Value>, HttpError> {
        let message = self.message.get_or_try_init(|| {
            if self.input_headers.content_type().starts_with(mime::APPLICATION_JSON.as_ref()) {
                self.input_json()
            } else {
                Ok(None)
            }
        })?;
        Ok(message.as_ref())
    }

    pub fn set_json_message(&mut self, message: Value) {
        self.message = OnceCell::from(Some(message));
    }

    /// Request arguments: the fields of a JSON object body for `POST`,
    /// `PUT`, `DELETE` and `PATCH`, overlaid by the URI query parameters.
    ///
    /// Built at most once per request.
    pub fn args(&self) -> Result<&Map<String, Value>, HttpError> {
        self.args.get_or_try_init(|| {
            let mut args = Map::new();

            if matches!(self.method, Method::POST | Method::PUT | Method::DELETE | Method::PATCH) {
                self.json_message()?;
            }
            if let Some(Some(Value::Object(fields))) = self.message.get() {
                args.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }

            if let Some(query) = self.uri.query() {
                let params: Vec<(String, String)> = serde_urlencoded::from_str(query).map_err(ParseError::from)?;
                args.extend(params.into_iter().map(|(k, v)| (k, Value::String(v))));
            }
            Ok(args)
        })
    }

    fn wants_pretty_json(&self) -> bool {
        let param = self.config.pretty_json_param();
        self.uri.query().is_some_and(|q| q.split('&').any(|pair| pair.split('=').next() == Some(param)))
    }

    // write state

    pub fn is_replying(&self) -> bool {
        self.replying
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked.is_active()
    }

    /// A write of this exchange failed.
    pub fn has_connection_error(&self) -> bool {
        self.writes.has_failed()
    }

    /// Bytes handed to the connection so far, heads included.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Resolves once every queued write completed, failing when any of them
    /// did not make it to the peer.
    pub async fn flushed(&self) -> Result<(), HttpError> {
        if self.writes.wait_idle().await { Ok(()) } else { Err(SendError::ConnectionError.into()) }
    }

    // logging hooks

    /// Logs a freshly received request.
    pub fn on_request(&self) {
        let prefix = self.log_prefix();
        info!("{} < {}", prefix, self.request_line());
        debug!("{} headers:\n{}", prefix, self.input_headers);
        if !self.input.is_empty() {
            trace!("{} body: {}", prefix, self.input());
        }
    }

    /// Logs the response to an outgoing request, or the error that ended it.
    pub fn on_response(&self, error: Option<&SendError>) {
        let prefix = self.log_prefix();
        if let Some(e) = error {
            debug!("{} response failed: {}", prefix, e);
            self.writes.record_failure();
            return;
        }

        info!("{} < {}", prefix, self.response_line());
        debug!("{} headers:\n{}", prefix, self.input_headers);
        if !self.input.is_empty() {
            trace!("{} body: {}", prefix, self.input());
        }
    }

    /// Logs a connection error or a non-2xx status. Returns whether
    /// anything was logged.
    pub fn log_response_errors(&self) -> bool {
        let prefix = self.log_prefix();
        if self.has_connection_error() {
            error!("{} failed response: connection error", prefix);
        } else if !self.is_ok() {
            error!("{} {}: {}", prefix, self.response_line(), self.input());
        } else {
            return false;
        }
        true
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id())
            .field("direction", &self.direction)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("status", &self.status)
            .field("replying", &self.replying)
            .field("chunked", &self.chunked.is_active())
            .field("bytes_written", &self.bytes_written)
            .finish_non_exhaustive()
    }
}

fn uri_extension(uri: &Uri) -> &str {
    let file = uri.path().rsplit('/').next().unwrap_or("");
    file.rsplit_once('.').map_or("", |(_, extension)| extension)
}
