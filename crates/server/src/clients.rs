//! Connected-viewer registry and broadcast dispatcher.
//!
//! Each WebSocket session registers a bounded outbound queue; the ingestion
//! path broadcasts a message by `try_send`ing to a snapshot of the queues.
//! A full or closed queue for one viewer never blocks ingestion nor affects
//! delivery to the others, and does not by itself deregister the viewer;
//! removal happens only on the session's disconnect path.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

/// Outbound queue depth per viewer. At FH4's ~60Hz a queue this deep absorbs
/// roughly a second of stall before messages are shed.
pub const VIEWER_QUEUE_DEPTH: usize = 64;

/// Opaque handle for a connected viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    clients: HashMap<ClientId, mpsc::Sender<Bytes>>,
}

/// Registry of connected viewers. Cloneable; clones share state.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer's outbound queue, returning its handle.
    pub fn add(&self, sender: mpsc::Sender<Bytes>) -> ClientId {
        let mut inner = self.inner.lock();
        let id = ClientId(inner.next_id);
        inner.next_id += 1;
        inner.clients.insert(id, sender);
        id
    }

    /// Deregister a viewer. Only the disconnect path calls this.
    pub fn remove(&self, id: ClientId) {
        self.inner.lock().clients.remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.inner.lock().clients.len()
    }

    /// Send `message` to every registered viewer, best effort.
    ///
    /// Queues are snapshotted under the lock, then sent to outside it, so a
    /// slow viewer cannot hold up the ingestion path.
    pub fn broadcast(&self, message: Bytes) {
        let senders: Vec<(ClientId, mpsc::Sender<Bytes>)> = {
            let inner = self.inner.lock();
            inner
                .clients
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        for (id, sender) in senders {
            if let Err(e) = sender.try_send(message.clone()) {
                // Shed the message for this viewer only; the session's own
                // disconnect path handles removal.
                trace!("dropping message for {id}: {e}");
            }
        }
    }
}
