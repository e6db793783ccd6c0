//! Runtime driven by the simulated connector, server, and clock.
//!
//! The test plays the network: it reports transport callbacks through the
//! connector's sinks and relays written frames to the `SimServer`.

use std::time::Duration;

use murmur_client::{ClientConfig, Outgoing, Runtime, RuntimeError, RuntimeHandle};
use murmur_core::{
    ChannelAction, ChannelError, ChannelState, ChatContext, ConnectionId, SharedCredentials,
};
use murmur_harness::{SimConnector, SimEnv, SimServer, VIEWER};
use murmur_proto::Credentials;
use tokio::{sync::broadcast, time::timeout};

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    handle: RuntimeHandle,
    connector: SimConnector,
    env: SimEnv,
    credentials: SharedCredentials,
    server: SimServer,
}

impl Harness {
    fn start() -> Self {
        let env = SimEnv::new();
        let connector = SimConnector::new();
        let credentials = SharedCredentials::new(Credentials::new("tok", "csrf"));
        let config =
            ClientConfig { tick_interval: Duration::from_millis(10), ..ClientConfig::default() };

        let (runtime, handle) =
            Runtime::new(env.clone(), credentials.clone(), connector.clone(), &config);
        tokio::spawn(runtime.run());

        Self { handle, connector, env, credentials, server: SimServer::seeded() }
    }

    /// Relay everything the runtime wrote on `connection` to the server, and
    /// the replies back. Returns how many frames were relayed.
    async fn pump(&mut self, connection: ConnectionId) -> usize {
        // Requests are processed in order, so a view is a barrier.
        self.handle.view().await.unwrap();

        let sink = self.connector.sink(connection).unwrap();
        let mut relayed = 0;
        for outgoing in self.connector.drain(connection) {
            if let Outgoing::Text(text) = outgoing {
                relayed += 1;
                for reply in self.server.handle(&text) {
                    sink.message(reply).await.unwrap();
                }
            }
        }
        self.handle.view().await.unwrap();
        relayed
    }

    async fn open_active(&mut self, context: ChatContext) -> ConnectionId {
        self.handle.open(context).await.unwrap();
        let connection = self.connector.latest().unwrap();
        self.connector.sink(connection).unwrap().opened().await.unwrap();
        assert_eq!(self.pump(connection).await, 1);
        assert_eq!(self.handle.view().await.unwrap().state, ChannelState::Active);
        connection
    }
}

async fn wait_for(
    actions: &mut broadcast::Receiver<ChannelAction>,
    pred: impl Fn(&ChannelAction) -> bool,
) -> ChannelAction {
    timeout(WAIT, async {
        loop {
            let action = actions.recv().await.unwrap();
            if pred(&action) {
                return action;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn group_chat_round_trip() {
    let mut harness = Harness::start();
    let connection = harness.open_active(ChatContext::group(VIEWER, "rust")).await;

    harness.handle.send_message("hello").await.unwrap();
    harness.handle.send_message("again").await.unwrap();
    assert_eq!(harness.pump(connection).await, 2);

    let view = harness.handle.view().await.unwrap();
    let contents: Vec<_> = view.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["hello", "again"]);
    assert_eq!(Some(view.messages.as_slice()), harness.server.group_log("rust"));
}

#[tokio::test]
async fn added_member_is_announced_and_confirmed() {
    let mut harness = Harness::start();
    let connection = harness.open_active(ChatContext::group(VIEWER, "rust")).await;

    harness.handle.add_member(murmur_proto::Member::new(4, "dave")).await.unwrap();
    let pending = harness.handle.view().await.unwrap();
    assert!(pending.members.iter().any(|m| m.username == "dave"));

    harness.pump(connection).await;
    let view = harness.handle.view().await.unwrap();
    assert_eq!(view.messages.last().map(|m| m.content.as_str()), Some("I added dave"));
    assert_eq!(
        view.members,
        harness.server.roster("rust", VIEWER).map(|r| r.members).unwrap_or_default()
    );
}

#[tokio::test]
async fn switching_context_closes_previous_transport() {
    let mut harness = Harness::start();
    let first = harness.open_active(ChatContext::group(VIEWER, "rust")).await;
    let second = harness.open_active(ChatContext::private(VIEWER, 2u64)).await;

    assert_ne!(first, second);
    assert_eq!(harness.connector.drain(first), vec![Outgoing::Close]);
    assert_eq!(harness.connector.opened().len(), 2);
}

#[tokio::test]
async fn join_times_out_on_virtual_clock() {
    let harness = Harness::start();
    let mut actions = harness.handle.subscribe();

    harness.handle.open(ChatContext::group(VIEWER, "ops")).await.unwrap();
    harness.env.advance(Duration::from_secs(11));

    let lost = wait_for(&mut actions, |a| matches!(a, ChannelAction::ConnectionLost { .. })).await;
    assert!(matches!(
        lost,
        ChannelAction::ConnectionLost { error: ChannelError::JoinTimeout { .. }, .. }
    ));
    assert_eq!(harness.handle.view().await.unwrap().state, ChannelState::Failed);
}

#[tokio::test]
async fn signed_out_send_is_rejected() {
    let mut harness = Harness::start();
    harness.open_active(ChatContext::group(VIEWER, "rust")).await;

    harness.credentials.clear();
    assert_eq!(
        harness.handle.send_message("hi").await,
        Err(RuntimeError::Channel(ChannelError::AuthMissing))
    );
}

#[tokio::test]
async fn refused_connect_fails_channel() {
    let harness = Harness::start();
    harness.connector.refuse_next(1);

    harness.handle.open(ChatContext::group(VIEWER, "rust")).await.unwrap();
    assert_eq!(harness.handle.view().await.unwrap().state, ChannelState::Failed);
    assert!(harness.connector.opened().is_empty());
}
