//! In-memory [`Connector`] for runtime tests.
//!
//! Records every connect request and keeps the sink and write queue of each
//! connection, so a test can play the server: report `opened`, push frames,
//! and inspect what the runtime wrote.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use murmur_client::{Connector, Outgoing, TransportError, TransportHandle, TransportSink};
use murmur_core::{ChatContext, ConnectionId};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Wires {
    opened: Vec<(ConnectionId, ChatContext)>,
    sinks: HashMap<ConnectionId, TransportSink>,
    writes: HashMap<ConnectionId, mpsc::UnboundedReceiver<Outgoing>>,
    refuse: usize,
}

/// Simulated connector. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct SimConnector {
    wires: Arc<Mutex<Wires>>,
}

impl SimConnector {
    /// Connector that accepts every connect.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `count` connect requests.
    pub fn refuse_next(&self, count: usize) {
        self.lock().refuse += count;
    }

    /// Every accepted connect, oldest first.
    pub fn opened(&self) -> Vec<(ConnectionId, ChatContext)> {
        self.lock().opened.clone()
    }

    /// Most recently accepted connection.
    pub fn latest(&self) -> Option<ConnectionId> {
        self.lock().opened.last().map(|(id, _)| *id)
    }

    /// Sink for reporting on `connection`'s behalf.
    pub fn sink(&self, connection: ConnectionId) -> Option<TransportSink> {
        self.lock().sinks.get(&connection).cloned()
    }

    /// Everything written to `connection` since the last call.
    pub fn drain(&self, connection: ConnectionId) -> Vec<Outgoing> {
        let mut wires = self.lock();
        let Some(queue) = wires.writes.get_mut(&connection) else {
            return Vec::new();
        };
        let mut drained = Vec::new();
        while let Ok(outgoing) = queue.try_recv() {
            drained.push(outgoing);
        }
        drained
    }

    fn lock(&self) -> MutexGuard<'_, Wires> {
        self.wires.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for SimConnector {
    fn connect(
        &mut self,
        connection: ConnectionId,
        context: &ChatContext,
        sink: TransportSink,
    ) -> Result<TransportHandle, TransportError> {
        let mut wires = self.lock();
        if wires.refuse > 0 {
            wires.refuse -= 1;
            return Err(TransportError::Connect("refused by simulation".into()));
        }

        let (outgoing, written) = mpsc::unbounded_channel();
        wires.opened.push((connection, context.clone()));
        wires.sinks.insert(connection, sink);
        wires.writes.insert(connection, written);
        Ok(TransportHandle::new(connection, outgoing))
    }
}
