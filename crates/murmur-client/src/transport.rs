//! Transport seam between the runtime and a concrete connection.
//!
//! The [`Connector`] trait abstracts how a channel's persistent connection is
//! established. Production uses [`WsConnector`](crate::WsConnector) (feature
//! `transport`); tests and simulation supply their own.
//!
//! A connector hands back a [`TransportHandle`] for writes and reports what
//! happens on the wire through the [`TransportSink`] it was given. Every
//! sink report is tagged with its [`ConnectionId`] and lands on the
//! runtime's single event queue, so a callback from a replaced connection is
//! recognised as stale and ignored.

use murmur_core::{ChatContext, ConnectionId, TransportEvent};
use tokio::sync::mpsc;

use crate::{error::TransportError, runtime::Request};

/// Establishes one persistent connection per channel.
pub trait Connector: Send + 'static {
    /// Start connecting for `connection`.
    ///
    /// Must not block: establish the connection in the background and report
    /// [`TransportSink::opened`] once it is up.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started. The runtime
    /// treats that like a transport error on the new connection.
    fn connect(
        &mut self,
        connection: ConnectionId,
        context: &ChatContext,
        sink: TransportSink,
    ) -> Result<TransportHandle, TransportError>;
}

/// A write to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// One text frame
    Text(String),
    /// Close the connection and stop
    Close,
}

/// Write side of one connection.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    connection: ConnectionId,
    outgoing: mpsc::UnboundedSender<Outgoing>,
}

impl TransportHandle {
    /// Wrap the queue a connection task drains.
    pub fn new(connection: ConnectionId, outgoing: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self { connection, outgoing }
    }

    /// Connection this handle writes to.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Queue a text frame.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the connection task has stopped.
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.outgoing.send(Outgoing::Text(text)).map_err(|_| TransportError::Closed)
    }

    /// Ask the connection task to close. Does nothing if it already stopped.
    pub fn close(&self) {
        if self.outgoing.send(Outgoing::Close).is_err() {
            tracing::trace!(connection = %self.connection, "transport already stopped");
        }
    }
}

/// Read side of one connection: reports into the runtime's event queue.
#[derive(Debug, Clone)]
pub struct TransportSink {
    connection: ConnectionId,
    queue: mpsc::Sender<Request>,
}

impl TransportSink {
    pub(crate) fn new(connection: ConnectionId, queue: mpsc::Sender<Request>) -> Self {
        Self { connection, queue }
    }

    /// Connection this sink reports for.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// The connection is established.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the runtime has stopped.
    pub async fn opened(&self) -> Result<(), TransportError> {
        self.report(TransportEvent::Opened).await
    }

    /// One text frame arrived.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the runtime has stopped.
    pub async fn message(&self, text: String) -> Result<(), TransportError> {
        self.report(TransportEvent::Message(text)).await
    }

    /// The connection failed.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the runtime has stopped.
    pub async fn error(&self, reason: impl Into<String>) -> Result<(), TransportError> {
        self.report(TransportEvent::Error(reason.into())).await
    }

    /// The peer closed the connection.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the runtime has stopped.
    pub async fn closed(&self, reason: impl Into<String>) -> Result<(), TransportError> {
        self.report(TransportEvent::Closed { reason: reason.into() }).await
    }

    async fn report(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.queue
            .send(Request::Transport { connection: self.connection, event })
            .await
            .map_err(|_| TransportError::Closed)
    }
}
