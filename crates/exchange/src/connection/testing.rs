use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};

use crate::connection::{Connection, PendingWrite};

/// Captures every write and completes it synchronously.
#[derive(Debug, Default)]
pub(crate) struct RecordingConnection {
    incoming: bool,
    fail: AtomicBool,
    writes: Mutex<Vec<(Bytes, bool)>>,
}

impl RecordingConnection {
    pub(crate) fn incoming() -> Arc<Self> {
        Arc::new(Self { incoming: true, ..Self::default() })
    }

    pub(crate) fn outgoing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Completes every following write with failure.
    pub(crate) fn fail_writes(&self) {
        self.fail.store(true, Ordering::Release);
    }

    /// All written bytes, concatenated.
    pub(crate) fn written(&self) -> BytesMut {
        let mut all = BytesMut::new();
        for (bytes, _) in self.writes.lock().unwrap().iter() {
            all.extend_from_slice(bytes);
        }
        all
    }

    pub(crate) fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    /// The `keep_open` flag of every write in order.
    pub(crate) fn keep_open(&self) -> Vec<bool> {
        self.writes.lock().unwrap().iter().map(|(_, keep_open)| *keep_open).collect()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl Connection for RecordingConnection {
    fn id(&self) -> u64 {
        7
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        "127.0.0.1:4000".parse().ok()
    }

    fn is_connected(&self) -> bool {
        !self.fail.load(Ordering::Acquire)
    }

    fn is_incoming(&self) -> bool {
        self.incoming
    }

    fn write_request(&self, write: PendingWrite) {
        let success = !self.fail.load(Ordering::Acquire);
        self.writes.lock().unwrap().push((write.bytes.clone(), write.keep_open));
        write.complete(success);
    }
}
