use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::connection::{Connection, PendingWrite, SecureSession};

/// A [`Connection`] that serializes writes through a queue drained by a
/// spawned tokio task.
///
/// Writes are performed in the order they were queued. The first failed
/// write marks the connection disconnected; every write queued after that
/// completes with failure without touching the writer.
#[derive(Debug)]
pub struct QueuedConnection {
    id: u64,
    incoming: bool,
    peer_addr: Option<SocketAddr>,
    secure: Option<SecureSession>,
    connected: Arc<AtomicBool>,
    queue: mpsc::UnboundedSender<PendingWrite>,
}

impl QueuedConnection {
    /// Starts the writer task for `writer`. Must be called within a tokio runtime.
    pub fn spawn<W>(writer: W, id: u64, incoming: bool, peer_addr: Option<SocketAddr>) -> Arc<Self>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::spawn_secure(writer, id, incoming, peer_addr, None)
    }

    /// Same as [`spawn`](Self::spawn) for a writer running over TLS.
    pub fn spawn_secure<W>(
        writer: W,
        id: u64,
        incoming: bool,
        peer_addr: Option<SocketAddr>,
        secure: Option<SecureSession>,
    ) -> Arc<Self>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (queue, receiver) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        tokio::spawn(write_loop(id, writer, receiver, Arc::clone(&connected)));

        Arc::new(Self { id, incoming, peer_addr, secure, connected, queue })
    }

    /// Stops accepting writes. Writes already queued complete with failure.
    pub fn close(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

impl Connection for QueuedConnection {
    fn id(&self) -> u64 {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn is_incoming(&self) -> bool {
        self.incoming
    }

    fn secure_session(&self) -> Option<SecureSession> {
        self.secure.clone()
    }

    fn write_request(&self, write: PendingWrite) {
        if !self.is_connected() {
            debug!(connection = self.id, "connection closed, dropping write");
            write.complete(false);
            return;
        }

        if let Err(mpsc::error::SendError(write)) = self.queue.send(write) {
            debug!(connection = self.id, "writer task gone, dropping write");
            self.close();
            write.complete(false);
        }
    }
}

async fn write_loop<W>(id: u64, mut writer: W, mut receiver: mpsc::UnboundedReceiver<PendingWrite>, connected: Arc<AtomicBool>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(write) = receiver.recv().await {
        if !connected.load(Ordering::Acquire) {
            write.complete(false);
            continue;
        }

        let result = match writer.write_all(&write.bytes).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                let size = write.bytes.len();
                trace!(connection = id, exchange = write.exchange_id, size, keep_open = write.keep_open, "write complete");
                write.complete(true);
            }
            Err(e) => {
                error!(connection = id, exchange = write.exchange_id, cause = %e, "write failed, closing connection");
                connected.store(false, Ordering::Release);
                write.complete(false);
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(connection = id, cause = %e, "shutdown writer failed");
    }
}
