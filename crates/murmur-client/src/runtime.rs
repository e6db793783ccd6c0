//! Async runtime that drives one [`ConnectionManager`].
//!
//! Caller commands, transport callbacks, and timer ticks all arrive on one
//! bounded queue and are processed strictly one at a time. Actions the
//! manager returns are executed in order: transport work goes to the
//! [`Connector`] and its handles, and every action is then published to
//! observers.
//!
//! Failures while executing transport work (connect refused, write to a
//! stopped transport) are fed straight back into the manager as transport
//! errors on the affected connection.

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use murmur_core::{
    ChannelAction, ChannelError, ChannelEvent, ChannelState, ChatContext, ConnectionId,
    ConnectionManager, CredentialSource, Environment, Roster, TransportEvent,
};
use murmur_proto::{Member, Message, WireId};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    error::{RuntimeError, TransportError},
    transport::{Connector, TransportHandle, TransportSink},
};

/// A caller intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a channel, closing any other
    Open(ChatContext),
    /// Post a message to the current channel
    SendMessage(String),
    /// Add a user to the current group
    AddMember(Member),
    /// Remove a user from the current group
    RemoveMember(WireId),
    /// Apply a roster fetched from the directory
    RefreshRoster {
        /// Group the roster belongs to
        group_name: String,
        /// The roster
        roster: Roster,
    },
    /// Close the current channel
    Close,
}

impl Command {
    fn into_event<I>(self) -> ChannelEvent<I> {
        match self {
            Self::Open(context) => ChannelEvent::Open { context },
            Self::SendMessage(content) => ChannelEvent::SendMessage { content },
            Self::AddMember(member) => ChannelEvent::AddMember { member },
            Self::RemoveMember(user_id) => ChannelEvent::RemoveMember { user_id },
            Self::RefreshRoster { group_name, roster } => {
                ChannelEvent::RosterRefreshed { group_name, roster }
            },
            Self::Close => ChannelEvent::Close,
        }
    }
}

/// Read-only copy of the current channel's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelView {
    /// Lifecycle state
    pub state: ChannelState,
    /// Context of the current channel, if any was opened
    pub context: Option<ChatContext>,
    /// Message log, oldest first
    pub messages: Vec<Message>,
    /// Visible group members (empty for private channels)
    pub members: Vec<Member>,
    /// Viewer's admin flag for the current group
    pub is_self_admin: bool,
}

#[derive(Debug)]
pub(crate) enum Request {
    Command { command: Command, reply: oneshot::Sender<Result<(), ChannelError>> },
    Transport { connection: ConnectionId, event: TransportEvent },
    Inspect(oneshot::Sender<ChannelView>),
    Shutdown,
}

/// Event loop owning the connection manager and the live transport.
///
/// # Type Parameters
///
/// - `E`: Time source
/// - `A`: Credential source consulted on every join and send
/// - `C`: Connection factory
pub struct Runtime<E, A, C>
where
    E: Environment,
    A: CredentialSource,
    C: Connector,
{
    env: E,
    manager: ConnectionManager<E, A>,
    connector: C,
    transports: HashMap<ConnectionId, TransportHandle>,
    requests: mpsc::Receiver<Request>,
    // Weak so the loop ends once every handle and sink is gone.
    queue: mpsc::WeakSender<Request>,
    observers: broadcast::Sender<ChannelAction>,
    tick_interval: Duration,
}

impl<E, A, C> Runtime<E, A, C>
where
    E: Environment,
    A: CredentialSource + 'static,
    C: Connector,
{
    /// Create a runtime and the handle used to drive it.
    ///
    /// Nothing happens until [`run`](Self::run) is awaited.
    pub fn new(env: E, credentials: A, connector: C, config: &ClientConfig) -> (Self, RuntimeHandle) {
        let capacity = config.event_queue_capacity.max(1);
        let (queue, requests) = mpsc::channel(capacity);
        let (observers, _) = broadcast::channel(capacity);

        let runtime = Self {
            manager: ConnectionManager::new(env.clone(), credentials, config.channel()),
            env,
            connector,
            transports: HashMap::new(),
            requests,
            queue: queue.downgrade(),
            observers: observers.clone(),
            tick_interval: config.tick_interval,
        };
        (runtime, RuntimeHandle { queue, observers })
    }

    /// Run until [`RuntimeHandle::shutdown`] is called or every handle is
    /// dropped. The current channel is closed on the way out.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => self.dispatch(request),
                },
                _ = ticker.tick() => {
                    let actions = self.manager.tick(self.env.now());
                    self.execute(actions);
                },
            }
        }

        let actions = self.manager.close();
        self.execute(actions);
        info!("runtime stopped");
    }

    fn dispatch(&mut self, request: Request) {
        match request {
            Request::Command { command, reply } => {
                let outcome = self.manager.handle(command.into_event());
                let outcome = outcome.map(|actions| self.execute(actions));
                if reply.send(outcome).is_err() {
                    debug!("caller went away before the reply");
                }
            },
            Request::Transport { connection, event } => {
                let actions = self.manager.handle_transport(connection, event);
                self.execute(actions);
            },
            Request::Inspect(reply) => {
                if reply.send(self.view()).is_err() {
                    debug!("caller went away before the view");
                }
            },
            Request::Shutdown => {},
        }
    }

    fn execute(&mut self, actions: Vec<ChannelAction>) {
        let mut pending = VecDeque::from(actions);

        while let Some(action) = pending.pop_front() {
            match &action {
                ChannelAction::OpenTransport { connection, context } => {
                    if let Err(error) = self.connect(*connection, context) {
                        warn!(%connection, %error, "connect failed");
                        pending.extend(self.manager.handle_transport(
                            *connection,
                            TransportEvent::Error(error.to_string()),
                        ));
                    }
                },
                ChannelAction::SendFrame { connection, frame } => {
                    let written = self
                        .transports
                        .get(connection)
                        .ok_or(TransportError::Closed)
                        .and_then(|handle| handle.send(frame.as_str().to_owned()));
                    if let Err(error) = written {
                        warn!(%connection, %error, "write failed");
                        pending.extend(self.manager.handle_transport(
                            *connection,
                            TransportEvent::Error(error.to_string()),
                        ));
                    }
                },
                ChannelAction::CloseTransport { connection }
                | ChannelAction::ConnectionLost { connection, .. } => {
                    if let Some(handle) = self.transports.remove(connection) {
                        handle.close();
                    }
                },
                ChannelAction::StateChanged { .. }
                | ChannelAction::HistoryReplaced { .. }
                | ChannelAction::MessageAppended { .. }
                | ChannelAction::RosterChanged { .. }
                | ChannelAction::Notice { .. } => {},
            }

            // No subscribers is fine.
            let _ = self.observers.send(action);
        }
    }

    fn connect(&mut self, connection: ConnectionId, context: &ChatContext) -> Result<(), TransportError> {
        let queue = self.queue.upgrade().ok_or(TransportError::Closed)?;
        let sink = TransportSink::new(connection, queue);
        let handle = self.connector.connect(connection, context, sink)?;

        debug!(%connection, %context, "transport started");
        self.transports.insert(connection, handle);
        Ok(())
    }

    fn view(&self) -> ChannelView {
        let context = self.manager.context().cloned();
        let group = context.as_ref().and_then(ChatContext::group_name);
        let membership = self.manager.membership();

        ChannelView {
            state: self.manager.state(),
            messages: self.manager.messages().to_vec(),
            members: group
                .map(|g| membership.members(g).into_iter().cloned().collect())
                .unwrap_or_default(),
            is_self_admin: group.is_some_and(|g| membership.is_admin(g)),
            context,
        }
    }
}

/// Cloneable handle for driving a [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    queue: mpsc::Sender<Request>,
    observers: broadcast::Sender<ChannelAction>,
}

impl RuntimeHandle {
    /// Open a channel for `context`, closing any other.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Channel(AuthMissing)` without credentials
    /// - `RuntimeError::Stopped` if the runtime is gone
    pub async fn open(&self, context: ChatContext) -> Result<(), RuntimeError> {
        self.command(Command::Open(context)).await
    }

    /// Post a message to the current channel.
    ///
    /// # Errors
    ///
    /// Returns the manager's rejection (`ChannelNotReady`, `ChatIdUnknown`,
    /// `AuthMissing`) or `RuntimeError::Stopped`.
    pub async fn send_message(&self, content: impl Into<String>) -> Result<(), RuntimeError> {
        self.command(Command::SendMessage(content.into())).await
    }

    /// Add a user to the current group.
    ///
    /// # Errors
    ///
    /// Returns the manager's rejection or `RuntimeError::Stopped`.
    pub async fn add_member(&self, member: Member) -> Result<(), RuntimeError> {
        self.command(Command::AddMember(member)).await
    }

    /// Remove a user from the current group.
    ///
    /// # Errors
    ///
    /// Returns the manager's rejection or `RuntimeError::Stopped`.
    pub async fn remove_member(&self, user_id: impl Into<WireId>) -> Result<(), RuntimeError> {
        self.command(Command::RemoveMember(user_id.into())).await
    }

    /// Apply a roster fetched from the directory.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::NoChannel` if nothing was opened, or
    /// `RuntimeError::Stopped`.
    pub async fn refresh_roster(
        &self,
        group_name: impl Into<String>,
        roster: Roster,
    ) -> Result<(), RuntimeError> {
        self.command(Command::RefreshRoster { group_name: group_name.into(), roster }).await
    }

    /// Close the current channel.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Stopped` if the runtime is gone.
    pub async fn close(&self) -> Result<(), RuntimeError> {
        self.command(Command::Close).await
    }

    /// Snapshot of the current channel.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Stopped` if the runtime is gone.
    pub async fn view(&self) -> Result<ChannelView, RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.queue.send(Request::Inspect(reply)).await.map_err(|_| RuntimeError::Stopped)?;
        response.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Receive every action the runtime executes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelAction> {
        self.observers.subscribe()
    }

    /// Stop the runtime after closing the current channel.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Stopped` if the runtime is already gone.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.queue.send(Request::Shutdown).await.map_err(|_| RuntimeError::Stopped)
    }

    async fn command(&self, command: Command) -> Result<(), RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.queue
            .send(Request::Command { command, reply })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        response.await.map_err(|_| RuntimeError::Stopped)?.map_err(RuntimeError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use murmur_core::StaticCredentials;
    use murmur_proto::Credentials;

    use super::*;
    use crate::{SystemEnv, transport::Outgoing};

    type Opened = (ConnectionId, ChatContext, TransportSink, mpsc::UnboundedReceiver<Outgoing>);

    #[derive(Clone, Default)]
    struct TestConnector {
        opened: Arc<Mutex<Vec<Opened>>>,
        refuse: bool,
    }

    impl TestConnector {
        fn take(&self) -> Opened {
            self.opened.lock().unwrap().remove(0)
        }

        fn count(&self) -> usize {
            self.opened.lock().unwrap().len()
        }
    }

    impl Connector for TestConnector {
        fn connect(
            &mut self,
            connection: ConnectionId,
            context: &ChatContext,
            sink: TransportSink,
        ) -> Result<TransportHandle, TransportError> {
            if self.refuse {
                return Err(TransportError::Connect("refused".into()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            self.opened.lock().unwrap().push((connection, context.clone(), sink, rx));
            Ok(TransportHandle::new(connection, tx))
        }
    }

    fn start(connector: TestConnector) -> RuntimeHandle {
        start_with(connector, StaticCredentials::new(Credentials::new("tok", "csrf")))
    }

    fn start_with(connector: TestConnector, credentials: StaticCredentials) -> RuntimeHandle {
        let config = ClientConfig { tick_interval: Duration::from_secs(3600), ..ClientConfig::default() };
        let (runtime, handle) = Runtime::new(SystemEnv::new(), credentials, connector, &config);
        tokio::spawn(runtime.run());
        handle
    }

    async fn next_text(outgoing: &mut mpsc::UnboundedReceiver<Outgoing>) -> serde_json::Value {
        match outgoing.recv().await {
            Some(Outgoing::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn group_channel_round_trip() {
        let connector = TestConnector::default();
        let handle = start(connector.clone());

        handle.open(ChatContext::group("alice", "rust")).await.unwrap();
        let (id, context, sink, mut outgoing) = connector.take();
        assert_eq!(context, ChatContext::group("alice", "rust"));
        assert_eq!(sink.connection(), id);

        sink.opened().await.unwrap();
        let join = next_text(&mut outgoing).await;
        assert_eq!(join["action"], "join_group_chat");
        assert_eq!(join["access_token"], "tok");

        sink.message(r#"{"group_id":7,"history":[{"sender_username":"bob","content":"hi","timestamp":"t"}]}"#.into())
            .await
            .unwrap();
        let view = handle.view().await.unwrap();
        assert_eq!(view.state, ChannelState::Active);
        assert_eq!(view.messages, vec![Message::new("bob", "hi", "t")]);

        handle.send_message("hello").await.unwrap();
        let sent = next_text(&mut outgoing).await;
        assert_eq!(sent["action"], "send_group_message");
        assert_eq!(sent["data"]["message"]["content"], "hello");

        handle.close().await.unwrap();
        assert_eq!(outgoing.recv().await, Some(Outgoing::Close));
        assert_eq!(handle.view().await.unwrap().state, ChannelState::Closed);
    }

    #[tokio::test]
    async fn send_before_active_is_rejected() {
        let connector = TestConnector::default();
        let handle = start(connector.clone());
        handle.open(ChatContext::private("alice", 2)).await.unwrap();

        let result = handle.send_message("too early").await;
        assert_eq!(
            result,
            Err(RuntimeError::Channel(ChannelError::ChannelNotReady {
                state: ChannelState::Connecting
            }))
        );
    }

    #[tokio::test]
    async fn open_without_credentials_starts_no_transport() {
        let connector = TestConnector::default();
        let handle = start_with(connector.clone(), StaticCredentials::none());

        let result = handle.open(ChatContext::private("alice", 2)).await;
        assert_eq!(result, Err(RuntimeError::Channel(ChannelError::AuthMissing)));
        assert_eq!(connector.count(), 0);
    }

    #[tokio::test]
    async fn refused_connect_fails_the_channel() {
        let connector = TestConnector { refuse: true, ..TestConnector::default() };
        let handle = start(connector);
        let mut actions = handle.subscribe();

        handle.open(ChatContext::group("alice", "rust")).await.unwrap();
        assert_eq!(handle.view().await.unwrap().state, ChannelState::Failed);

        let mut lost = false;
        while let Ok(action) = actions.try_recv() {
            if let ChannelAction::ConnectionLost { error, .. } = action {
                assert!(error.is_retryable());
                lost = true;
            }
        }
        assert!(lost);
    }

    #[tokio::test]
    async fn switching_channels_closes_the_old_transport() {
        let connector = TestConnector::default();
        let handle = start(connector.clone());

        handle.open(ChatContext::private("alice", 2)).await.unwrap();
        let (_, _, old_sink, mut old_outgoing) = connector.take();

        handle.open(ChatContext::group("alice", "rust")).await.unwrap();
        assert_eq!(old_outgoing.recv().await, Some(Outgoing::Close));

        // A late frame from the old connection changes nothing.
        old_sink.opened().await.unwrap();
        old_sink
            .message(r#"{"sender_username":"bob","content":"late","timestamp":"t"}"#.into())
            .await
            .unwrap();
        let view = handle.view().await.unwrap();
        assert_eq!(view.state, ChannelState::Connecting);
        assert!(view.messages.is_empty());
        assert_eq!(view.context, Some(ChatContext::group("alice", "rust")));
    }

    #[tokio::test]
    async fn peer_close_is_published() {
        let connector = TestConnector::default();
        let handle = start(connector.clone());
        let mut actions = handle.subscribe();

        handle.open(ChatContext::group("alice", "rust")).await.unwrap();
        let (id, _, sink, _outgoing) = connector.take();
        sink.opened().await.unwrap();
        sink.closed("policy violation").await.unwrap();
        assert_eq!(handle.view().await.unwrap().state, ChannelState::Closed);

        let mut seen = Vec::new();
        while let Ok(action) = actions.try_recv() {
            seen.push(action);
        }
        assert!(seen.contains(&ChannelAction::ConnectionLost {
            connection: id,
            error: ChannelError::TransportClosed { reason: "policy violation".into() },
        }));
    }

    #[tokio::test]
    async fn roster_refresh_updates_view() {
        let connector = TestConnector::default();
        let handle = start(connector.clone());

        handle.open(ChatContext::group("alice", "rust")).await.unwrap();
        handle
            .refresh_roster("rust", Roster::new(vec![Member::new(1, "alice")], true))
            .await
            .unwrap();

        let view = handle.view().await.unwrap();
        assert_eq!(view.members, vec![Member::new(1, "alice")]);
        assert!(view.is_self_admin);
    }

    #[tokio::test]
    async fn shutdown_closes_channel_and_stops() {
        let connector = TestConnector::default();
        let handle = start(connector.clone());
        handle.open(ChatContext::group("alice", "rust")).await.unwrap();
        let (_, _, _sink, mut outgoing) = connector.take();

        handle.shutdown().await.unwrap();
        assert_eq!(outgoing.recv().await, Some(Outgoing::Close));

        let result = handle.view().await;
        assert_eq!(result, Err(RuntimeError::Stopped));
    }
}
