//! Simulated world: one client, one server, an in-flight queue between them.
//!
//! The world drives a real [`ConnectionManager`] the way the runtime does,
//! except that transports are entries in a set and frames travel through an
//! explicit queue. Nothing is delivered until an operation says so, which
//! lets tests interleave intents, deliveries, faults, and time freely.

use std::{
    collections::{BTreeSet, VecDeque},
    time::Duration,
};

use murmur_core::{
    ChannelAction, ChannelConfig, ChannelError, ChatContext, ConnectionId, ConnectionManager,
    Environment, SharedCredentials, TransportEvent,
};
use murmur_proto::{Credentials, Member, Message};
use tracing::debug;

use super::operation::Operation;
use crate::{invariants::SystemSnapshot, sim_env::SimEnv, sim_server::SimServer};

/// Identity of the simulated viewer (user 1 on the seeded server).
pub const VIEWER: &str = "alice";

/// Groups on the seeded server, indexed by `Operation::OpenGroup`.
pub const GROUPS: [&str; 2] = ["rust", "ops"];

const USERS: u8 = 4;

/// One client and a seeded [`SimServer`].
pub struct SimWorld {
    env: SimEnv,
    credentials: SharedCredentials,
    manager: ConnectionManager<SimEnv, SharedCredentials>,
    server: SimServer,
    transports: BTreeSet<ConnectionId>,
    refuse_opens: usize,
    in_flight: VecDeque<(ConnectionId, TransportEvent)>,
    published: Vec<ChannelAction>,
    rotation: u64,
}

impl SimWorld {
    /// World with signed-in credentials and the default join timeout.
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    /// World with a custom channel configuration.
    pub fn with_config(config: ChannelConfig) -> Self {
        let env = SimEnv::new();
        let credentials = SharedCredentials::new(rotated(0));
        let manager = ConnectionManager::new(env.clone(), credentials.clone(), config);

        Self {
            env,
            credentials,
            manager,
            server: SimServer::seeded(),
            transports: BTreeSet::new(),
            refuse_opens: 0,
            in_flight: VecDeque::new(),
            published: Vec::new(),
            rotation: 0,
        }
    }

    /// Apply an operation.
    ///
    /// # Errors
    ///
    /// Returns whatever the manager returned for a caller intent. Deliveries,
    /// faults, and time never fail.
    pub fn apply(&mut self, op: &Operation) -> Result<(), ChannelError> {
        match op {
            Operation::OpenPrivate { counterpart } => {
                let context = ChatContext::private(VIEWER, user(*counterpart));
                let (_, actions) = self.manager.open_channel(context)?;
                self.execute(actions);
            },
            Operation::OpenGroup { group } => {
                let name = GROUPS[usize::from(*group) % GROUPS.len()];
                let (_, actions) = self.manager.open_channel(ChatContext::group(VIEWER, name))?;
                self.execute(actions);
            },
            Operation::Send { content } => {
                let actions = self.manager.send_message(&content.text())?;
                self.execute(actions);
            },
            Operation::AddMember { user: selector } => {
                let id = user(*selector);
                let name = self.username(id);
                let actions = self.manager.add_member(Member::new(id, name))?;
                self.execute(actions);
            },
            Operation::RemoveMember { user: selector } => {
                let actions = self.manager.remove_member(&user(*selector).into())?;
                self.execute(actions);
            },
            Operation::RefreshRoster => {
                let group = self.current_group().unwrap_or(GROUPS[0]).to_owned();
                let roster = self.server.roster(&group, VIEWER).unwrap_or_default();
                let actions = self.manager.apply_roster(&group, roster)?;
                self.execute(actions);
            },
            Operation::Close => {
                let actions = self.manager.close();
                self.execute(actions);
            },
            Operation::DeliverOne => {
                self.deliver_one();
            },
            Operation::DeliverAll => while self.deliver_one() {},
            Operation::PeerClose => {
                if let Some(id) = self.take_current_transport() {
                    self.in_flight
                        .push_back((id, TransportEvent::Closed { reason: "1000 bye".into() }));
                }
            },
            Operation::TransportError => {
                if let Some(id) = self.take_current_transport() {
                    self.in_flight.push_back((id, TransportEvent::Error("connection reset".into())));
                }
            },
            Operation::RefuseNextOpen => self.refuse_opens += 1,
            Operation::ClearCredentials => self.credentials.clear(),
            Operation::RotateCredentials => {
                self.rotation += 1;
                self.credentials.rotate(rotated(self.rotation));
            },
            Operation::Advance { centis } => {
                self.env.advance(Duration::from_millis(u64::from(*centis) * 100));
                let actions = self.manager.tick(self.env.now());
                self.execute(actions);
            },
        }
        Ok(())
    }

    /// The manager under test.
    pub fn manager(&self) -> &ConnectionManager<SimEnv, SharedCredentials> {
        &self.manager
    }

    /// The simulated server.
    pub fn server(&self) -> &SimServer {
        &self.server
    }

    /// Every action the manager produced, in execution order.
    pub fn published(&self) -> &[ChannelAction] {
        &self.published
    }

    /// Events waiting for delivery.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Transports currently open.
    pub fn open_transports(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.transports.iter().copied()
    }

    /// Group of the current context, if it is a group.
    pub fn current_group(&self) -> Option<&str> {
        self.manager.context().and_then(ChatContext::group_name)
    }

    /// Server-side log of the current context.
    pub fn server_log(&self) -> Option<&[Message]> {
        match self.manager.context()? {
            ChatContext::Group { group_name, .. } => self.server.group_log(group_name),
            ChatContext::Private { counterpart_id, .. } => {
                self.server.private_log(1, counterpart_id.as_u64()?)
            },
        }
    }

    /// Snapshot for invariant checking.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::capture(&self.manager, self.open_transports())
    }

    fn deliver_one(&mut self) -> bool {
        let Some((connection, event)) = self.in_flight.pop_front() else {
            return false;
        };
        let actions = self.manager.handle_transport(connection, event);
        self.execute(actions);
        true
    }

    fn take_current_transport(&mut self) -> Option<ConnectionId> {
        let id = self.manager.current_connection()?.id;
        self.transports.remove(&id).then_some(id)
    }

    fn execute(&mut self, actions: Vec<ChannelAction>) {
        let mut pending = VecDeque::from(actions);

        while let Some(action) = pending.pop_front() {
            match &action {
                ChannelAction::OpenTransport { connection, .. } => {
                    if self.refuse_opens > 0 {
                        self.refuse_opens -= 1;
                        pending.extend(self.manager.handle_transport(
                            *connection,
                            TransportEvent::Error("refused by simulation".into()),
                        ));
                    } else {
                        self.transports.insert(*connection);
                        self.in_flight.push_back((*connection, TransportEvent::Opened));
                    }
                },
                ChannelAction::SendFrame { connection, frame } => {
                    if self.transports.contains(connection) {
                        for reply in self.server.handle(frame.as_str()) {
                            self.in_flight.push_back((*connection, TransportEvent::Message(reply)));
                        }
                    } else {
                        pending.extend(self.manager.handle_transport(
                            *connection,
                            TransportEvent::Error("transport closed".into()),
                        ));
                    }
                },
                ChannelAction::CloseTransport { connection }
                | ChannelAction::ConnectionLost { connection, .. } => {
                    self.transports.remove(connection);
                },
                ChannelAction::StateChanged { .. }
                | ChannelAction::HistoryReplaced { .. }
                | ChannelAction::MessageAppended { .. }
                | ChannelAction::RosterChanged { .. }
                | ChannelAction::Notice { .. } => {},
            }

            debug!(?action, "executed");
            self.published.push(action);
        }
    }

    fn username(&self, id: u64) -> String {
        self.server
            .users()
            .into_iter()
            .find(|m| m.id.as_u64() == Some(id))
            .map(|m| m.username)
            .unwrap_or_default()
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn user(selector: u8) -> u64 {
    u64::from(selector % USERS) + 1
}

fn rotated(generation: u64) -> Credentials {
    Credentials::new(format!("access-{generation}"), format!("csrf-{generation}"))
}
