//! The connection an exchange writes to.
//!
//! The message engine never touches sockets. It renders bytes and hands them
//! to a [`Connection`] together with a completion callback; the connection
//! writes asynchronously and reports success or failure through that
//! callback.
//!
//! - [`Connection`]: what an exchange needs from its connection
//! - [`PendingWrite`]: one queued write and its completion callback
//! - [`WriteTracker`]: per-exchange record of outstanding and failed writes
//! - [`QueuedConnection`]: a `Connection` over any tokio `AsyncWrite`

mod queued;
mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use queued::QueuedConnection;
pub use tracker::WriteTracker;

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;

/// Invoked once when a write finished, with `true` on success.
pub type WriteCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// A write handed to a connection.
pub struct PendingWrite {
    /// Id of the exchange the bytes belong to.
    pub exchange_id: u64,
    pub bytes: Bytes,
    /// More writes of the same exchange will follow (chunks, WebSocket frames).
    pub keep_open: bool,
    pub on_complete: WriteCallback,
}

impl PendingWrite {
    /// Reports the outcome of this write to its owner.
    pub fn complete(self, success: bool) {
        (self.on_complete)(success)
    }
}

impl fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWrite")
            .field("exchange_id", &self.exchange_id)
            .field("len", &self.bytes.len())
            .field("keep_open", &self.keep_open)
            .finish_non_exhaustive()
    }
}

/// TLS details of a secure connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureSession {
    pub protocol: String,
    pub cipher: String,
    pub peer_subject: Option<String>,
}

/// What an exchange needs from the connection it belongs to.
pub trait Connection: Send + Sync {
    /// Unique id of the connection.
    fn id(&self) -> u64;

    fn peer_addr(&self) -> Option<SocketAddr>;

    fn is_connected(&self) -> bool;

    /// True for connections accepted by a server, false for client connections.
    fn is_incoming(&self) -> bool;

    fn secure_session(&self) -> Option<SecureSession> {
        None
    }

    /// Queues `write`. The call returns immediately; the outcome is reported
    /// through [`PendingWrite::complete`], also when the write is dropped
    /// because the connection is gone.
    fn write_request(&self, write: PendingWrite);
}
