//! WebSocket implementation of [`Connector`].
//!
//! Each connection runs in its own task: connect, report `opened`, then
//! forward queued writes to the socket and socket frames to the sink until
//! either side closes. A local close is not reported back; the manager has
//! already moved on.

use futures::{SinkExt, StreamExt};
use murmur_core::{ChatContext, ConnectionId};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use crate::{
    config::ClientConfig,
    error::TransportError,
    transport::{Connector, Outgoing, TransportHandle, TransportSink},
};

/// Opens one WebSocket per channel against the configured endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    endpoint: String,
}

impl WsConnector {
    /// Connector for `config.ws_endpoint()`.
    pub fn new(config: &ClientConfig) -> Self {
        Self { endpoint: config.ws_endpoint() }
    }

    /// Endpoint every connection dials.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Connector for WsConnector {
    fn connect(
        &mut self,
        connection: ConnectionId,
        context: &ChatContext,
        sink: TransportSink,
    ) -> Result<TransportHandle, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (outgoing, queued) = mpsc::unbounded_channel();
        debug!(%connection, %context, endpoint = %self.endpoint, "dialing");
        runtime.spawn(run_socket(self.endpoint.clone(), sink, queued));

        Ok(TransportHandle::new(connection, outgoing))
    }
}

async fn run_socket(
    endpoint: String,
    sink: TransportSink,
    mut queued: mpsc::UnboundedReceiver<Outgoing>,
) {
    let connection = sink.connection();

    let stream = match connect_async(endpoint.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(%connection, error = %e, "websocket connect failed");
            report(connection, sink.error(e.to_string()).await);
            return;
        },
    };
    info!(%connection, %endpoint, "websocket connected");

    let (mut write, mut read) = stream.split();
    if sink.opened().await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            outgoing = queued.recv() => match outgoing {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        report(connection, sink.error(e.to_string()).await);
                        break;
                    }
                },
                Some(Outgoing::Close) | None => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(%connection, error = %e, "close frame not sent");
                    }
                    break;
                },
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if sink.message(text.as_str().to_owned()).await.is_err() {
                        break;
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()))
                        .unwrap_or_default();
                    report(connection, sink.closed(reason).await);
                    break;
                },
                Some(Ok(other)) => trace!(%connection, ?other, "ignoring non-text frame"),
                Some(Err(e)) => {
                    report(connection, sink.error(e.to_string()).await);
                    break;
                },
                None => {
                    report(connection, sink.closed("stream ended").await);
                    break;
                },
            },
        }
    }
    debug!(%connection, "websocket task finished");
}

fn report(connection: ConnectionId, delivered: Result<(), TransportError>) {
    if delivered.is_err() {
        trace!(%connection, "runtime gone, dropping transport report");
    }
}
