use std::error::Error as StdError;

use http::StatusCode;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::protocol::HttpError;
use crate::request::Request;

impl Request {
    /// Answers with an error page for `status`, or with `{"error": ""}`
    /// when the reply was declared JSON.
    pub fn send_error<S: Into<Option<StatusCode>>>(&mut self, status: S) -> Result<(), HttpError> {
        let status = status.into().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_json_reply() {
            return self.send_json_error(status, "");
        }

        debug!("{} sending error page {}", self.log_prefix(), status);
        self.reset_body();
        self.set_content_type(mime::TEXT_HTML.as_ref());
        self.out_set("Connection", "close");
        self.send(error_page(status));
        self.reply(status)
    }

    /// Answers with `message` as a plain text body, or as
    /// `{"error": message}` when the reply was declared JSON. An empty
    /// message falls back to [`send_error`](Self::send_error).
    pub fn send_error_message<S: Into<Option<StatusCode>>>(&mut self, status: S, message: &str) -> Result<(), HttpError> {
        let status = status.into().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_json_reply() {
            return self.send_json_error(status, message);
        }
        if message.is_empty() {
            return self.send_error(status);
        }

        debug!("{} sending error {}: {}", self.log_prefix(), status, message);
        self.reset_body();
        self.set_content_type(mime::TEXT_PLAIN.as_ref());
        self.out_set("Connection", "close");
        self.send(message);
        self.reply(status)
    }

    /// Answers with `{"error": message}` whatever the content type.
    pub fn send_json_error<S: Into<Option<StatusCode>>>(&mut self, status: S, message: &str) -> Result<(), HttpError> {
        let status = status.into().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.send_json_body(status, &json!({ "error": message }))
    }

    /// Answers with `error` and its chain of causes.
    ///
    /// JSON replies carry the chain as nested objects:
    /// `{"error": {"message": "...", "code": 404, "cause": {...}}}`, other
    /// replies its message as plain text.
    pub fn send_error_cause<S, E>(&mut self, status: S, error: &E) -> Result<(), HttpError>
    where
        S: Into<Option<StatusCode>>,
        E: StdError + 'static,
    {
        let status = status.into().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_json_reply() {
            return self.send_json_body(status, &json!({ "error": error_json(error) }));
        }
        self.send_error_message(status, &error.to_string())
    }

    /// Answers with `error`, using its status when it carries one and
    /// `500 Internal Server Error` otherwise.
    pub fn send_http_error(&mut self, error: &HttpError) -> Result<(), HttpError> {
        self.send_error_cause(error.status_code(), error)
    }

    fn send_json_body(&mut self, status: StatusCode, body: &Value) -> Result<(), HttpError> {
        debug!("{} sending json error {}", self.log_prefix(), status);
        self.reset_body();
        let mut writer = self.json_writer();
        writer.serialize(body)?;
        writer.close();
        self.reply(status)
    }

    fn is_json_reply(&self) -> bool {
        self.content_type().starts_with(mime::APPLICATION_JSON.as_ref())
    }

    /// Drops a partially composed body and the headers describing it.
    fn reset_body(&mut self) {
        self.output.clear();
        self.out_remove("Content-Length");
        self.out_remove("Content-Encoding");
    }
}

fn error_page(status: StatusCode) -> String {
    let title = format!("{} {}", status.as_str(), status.canonical_reason().unwrap_or(""));
    format!("<html><head><title>{title}</title></head><body><h1>{title}</h1></body></html>")
}

fn error_json(error: &(dyn StdError + 'static)) -> Value {
    let mut value = Map::new();
    value.insert("message".to_string(), Value::String(error.to_string()));
    if let Some(status) = error.downcast_ref::<HttpError>().and_then(HttpError::status_code) {
        value.insert("code".to_string(), status.as_u16().into());
    }
    if let Some(source) = error.source() {
        value.insert("cause".to_string(), error_json(source));
    }
    Value::Object(value)
}
