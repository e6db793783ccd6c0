//! Channel connection state machine.
//!
//! The [`ConnectionManager`] owns the lifecycle of at most one live channel.
//! It uses the action pattern: methods take events (and time, for ticks) and
//! return actions for the driver to execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ open  ┌────────────┐ Opened  ┌────────┐ first frame ┌────────┐
//! │ Idle │──────>│ Connecting │────────>│ Joined │────────────>│ Active │
//! └──────┘       └────────────┘ +join   └────────┘             └────────┘
//!                      │                    │                       │
//!                      │   error/timeout    │                 close │
//!                      ↓                    ↓                       ↓
//!                 ┌────────┐           ┌────────┐             ┌─────────┐
//!                 │ Failed │<──────────│ Failed │             │ Closing │
//!                 └────────┘           └────────┘             └─────────┘
//!                                                                   │
//!                                                                   ↓
//!                                                             ┌────────┐
//!                                                             │ Closed │
//!                                                             └────────┘
//! ```
//!
//! Every transport callback is tagged with the [`ConnectionId`] it belongs
//! to. Callbacks for anything but the current connection are ignored, so a
//! late frame from a torn-down channel never touches the new one.

use std::{fmt, time::Duration};

use murmur_proto::{
    InboundEvent, Member, OutboundAction, RosterSnapshot, Snapshot, SnapshotScope, WireId, decode,
    encode,
    payloads::{AddGroupMember, GroupMessageBody, RemoveGroupMember, SendGroupMessage, SendPrivateMessage},
};
use tracing::{debug, error, info, warn};

use crate::{
    auth::CredentialSource,
    context::ChatContext,
    env::Environment,
    error::ChannelError,
    event::{ChannelAction, ChannelEvent, TransportEvent},
    membership::{MembershipTracker, Roster},
    registry::{ChannelConnection, ChannelRegistry},
    store::MessageStore,
};

/// Time allowed between requesting an open and the first decoded frame.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifies one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Channel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// No channel requested
    Idle,
    /// Transport open requested
    Connecting,
    /// Transport open, join sent, no frame decoded yet
    Joined,
    /// At least one frame decoded; sends allowed
    Active,
    /// Local close requested
    Closing,
    /// Closed locally or by the peer
    Closed,
    /// Ended by an error or timeout
    Failed,
}

impl ChannelState {
    /// True for Closed and Failed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// True while the connection holds (or is acquiring) a transport.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Joined | Self::Active)
    }
}

/// Channel configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Time allowed for open + join + first frame
    pub join_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { join_timeout: DEFAULT_JOIN_TIMEOUT }
    }
}

/// Owner of the current chat channel.
///
/// Routes decoded frames to the [`MessageStore`] and [`MembershipTracker`] and
/// gates outgoing actions on the channel being Active.
///
/// Generic over the [`Environment`] (time) and the [`CredentialSource`] that
/// is consulted on every join and send.
pub struct ConnectionManager<E: Environment, A: CredentialSource> {
    env: E,
    credentials: A,
    config: ChannelConfig,
    registry: ChannelRegistry<E::Instant>,
    current: Option<ConnectionId>,
    next_id: u64,
    store: MessageStore,
    membership: MembershipTracker,
}

impl<E: Environment, A: CredentialSource> ConnectionManager<E, A> {
    /// Create a manager with no channel.
    pub fn new(env: E, credentials: A, config: ChannelConfig) -> Self {
        Self {
            env,
            credentials,
            config,
            registry: ChannelRegistry::new(),
            current: None,
            next_id: 1,
            store: MessageStore::new(),
            membership: MembershipTracker::new(),
        }
    }

    /// State of the current channel; `Idle` if none was opened.
    pub fn state(&self) -> ChannelState {
        self.current_connection().map_or(ChannelState::Idle, |c| c.state)
    }

    /// The current connection record.
    pub fn current_connection(&self) -> Option<&ChannelConnection<E::Instant>> {
        self.current.and_then(|id| self.registry.get(id))
    }

    /// Context of the current channel.
    pub fn context(&self) -> Option<&ChatContext> {
        self.current_connection().map(|c| &c.context)
    }

    /// Current channel's message log, oldest first.
    pub fn messages(&self) -> &[murmur_proto::Message] {
        match self.context() {
            Some(context) => self.store.read(&context.key()),
            None => &[],
        }
    }

    /// Message logs.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Group rosters.
    pub fn membership(&self) -> &MembershipTracker {
        &self.membership
    }

    /// Connection registry.
    pub fn registry(&self) -> &ChannelRegistry<E::Instant> {
        &self.registry
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Only caller intents fail (open, send, membership, roster refresh).
    /// Transport callbacks and ticks never return an error; failures they
    /// cause surface as [`ChannelAction::ConnectionLost`].
    pub fn handle(
        &mut self,
        event: ChannelEvent<E::Instant>,
    ) -> Result<Vec<ChannelAction>, ChannelError> {
        match event {
            ChannelEvent::Open { context } => self.open_channel(context).map(|(_, actions)| actions),
            ChannelEvent::SendMessage { content } => self.send_message(&content),
            ChannelEvent::AddMember { member } => self.add_member(member),
            ChannelEvent::RemoveMember { user_id } => self.remove_member(&user_id),
            ChannelEvent::RosterRefreshed { group_name, roster } => {
                self.apply_roster(&group_name, roster)
            },
            ChannelEvent::Close => Ok(self.close()),
            ChannelEvent::Transport { connection, event } => {
                Ok(self.handle_transport(connection, event))
            },
            ChannelEvent::Tick { now } => Ok(self.tick(now)),
        }
    }

    /// Open a channel for `context`.
    ///
    /// A live channel for a different context is closed first, and its close
    /// is ordered before the new open. Re-opening the context of the current
    /// live channel returns its id and changes nothing.
    ///
    /// # Errors
    ///
    /// - `ChannelError::AuthMissing` if either token is absent; no transport
    ///   is opened and the current channel is untouched
    pub fn open_channel(
        &mut self,
        context: ChatContext,
    ) -> Result<(ConnectionId, Vec<ChannelAction>), ChannelError> {
        if self.credentials.complete().is_none() {
            warn!(%context, "open rejected: credentials missing");
            return Err(ChannelError::AuthMissing);
        }

        if let Some(live) = self.registry.live()
            && live.context == context
        {
            debug!(connection = %live.id, %context, "channel already open");
            return Ok((live.id, Vec::new()));
        }

        let mut actions = self.close();

        if let Some(previous) = self.current.take().and_then(|id| self.registry.get(id)) {
            let previous = previous.context.clone();
            self.store.clear(&previous.key());
            if previous != context
                && let Some(group) = previous.group_name()
            {
                self.membership.clear(group);
            }
        }
        // A log lives exactly as long as its connection.
        self.store.clear(&context.key());
        self.registry.retire_terminal();

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;

        let connection = ChannelConnection::connecting(id, context.clone(), self.env.now());
        if !self.registry.register(connection) {
            // close() above leaves nothing live, so this is a registry bug.
            return Err(ChannelError::Protocol(format!("registry refused {id}")));
        }
        self.current = Some(id);

        debug!(connection = %id, %context, "opening channel");
        actions.push(ChannelAction::StateChanged {
            connection: id,
            from: ChannelState::Idle,
            to: ChannelState::Connecting,
        });
        actions.push(ChannelAction::OpenTransport { connection: id, context });

        Ok((id, actions))
    }

    /// Close the current channel.
    ///
    /// Moves through Closing to Closed without waiting for the transport.
    /// Idempotent: closing a terminal or absent channel does nothing.
    pub fn close(&mut self) -> Vec<ChannelAction> {
        let Some(id) = self.current else {
            return Vec::new();
        };
        if !self.state().is_live() {
            return Vec::new();
        }

        let mut actions = Vec::with_capacity(3);
        actions.extend(self.transition(id, ChannelState::Closing));
        actions.push(ChannelAction::CloseTransport { connection: id });
        actions.extend(self.transition(id, ChannelState::Closed));
        actions
    }

    /// Post a message to the current channel.
    ///
    /// Private messages carry the viewer as sender and a wall-clock timestamp;
    /// group messages leave the timestamp to the server. Nothing is stored
    /// locally: the server echoes the message back as an increment.
    ///
    /// # Errors
    ///
    /// - `ChannelError::ChannelNotReady` unless Active (the message is dropped)
    /// - `ChannelError::ChatIdUnknown` for a private channel without a chat id
    /// - `ChannelError::AuthMissing` if credentials are absent
    pub fn send_message(&mut self, content: &str) -> Result<Vec<ChannelAction>, ChannelError> {
        let connection = self.require_active("send_message")?;
        let id = connection.id;

        let action = match &connection.context {
            ChatContext::Private { self_identity, .. } => {
                let chat_id = connection.chat_id.clone().ok_or(ChannelError::ChatIdUnknown)?;
                OutboundAction::SendPrivateMessage(SendPrivateMessage {
                    chat_id,
                    message: murmur_proto::Message::new(
                        self_identity.clone(),
                        content,
                        self.env.timestamp(),
                    ),
                })
            },
            ChatContext::Group { group_name, self_identity } => {
                OutboundAction::SendGroupMessage(SendGroupMessage {
                    group: group_name.clone(),
                    message: GroupMessageBody {
                        sender: self_identity.clone(),
                        content: content.to_owned(),
                    },
                })
            },
        };

        Ok(vec![self.send_frame(id, &action)?])
    }

    /// Ask the server to add `member` to the current group.
    ///
    /// The member shows up in the roster immediately as a pending add.
    ///
    /// # Errors
    ///
    /// - `ChannelError::ChannelNotReady` unless Active
    /// - `ChannelError::NotAGroupChannel` on a private channel
    /// - `ChannelError::AuthMissing` if credentials are absent
    pub fn add_member(&mut self, member: Member) -> Result<Vec<ChannelAction>, ChannelError> {
        let (id, group_name, self_identity) = self.require_group("add_member")?;

        let action = OutboundAction::AddGroupMember(AddGroupMember {
            group_name: group_name.clone(),
            user_id: member.id.clone(),
            adder: self_identity,
        });
        let send = self.send_frame(id, &action)?;

        self.membership.apply_local_add(&group_name, member);
        Ok(vec![send, self.roster_changed(&group_name)])
    }

    /// Ask the server to remove `user_id` from the current group.
    ///
    /// The member is hidden immediately as a pending removal. The server
    /// enforces admin rights; a rejection arrives as a notice and the next
    /// roster snapshot restores the member.
    ///
    /// # Errors
    ///
    /// - `ChannelError::ChannelNotReady` unless Active
    /// - `ChannelError::NotAGroupChannel` on a private channel
    /// - `ChannelError::AuthMissing` if credentials are absent
    pub fn remove_member(&mut self, user_id: &WireId) -> Result<Vec<ChannelAction>, ChannelError> {
        let (id, group_name, self_identity) = self.require_group("remove_member")?;

        let action = OutboundAction::RemoveGroupMember(RemoveGroupMember {
            group_name: group_name.clone(),
            user_id: user_id.clone(),
            admin: self_identity,
        });
        let send = self.send_frame(id, &action)?;

        self.membership.apply_local_remove(&group_name, user_id);
        Ok(vec![send, self.roster_changed(&group_name)])
    }

    /// Apply an authoritative roster fetched out of band.
    ///
    /// Rosters for a group other than the current channel's are stale and
    /// ignored.
    ///
    /// # Errors
    ///
    /// - `ChannelError::NoChannel` if no channel was ever opened
    pub fn apply_roster(
        &mut self,
        group_name: &str,
        roster: Roster,
    ) -> Result<Vec<ChannelAction>, ChannelError> {
        let context = self.context().ok_or(ChannelError::NoChannel)?;
        if context.group_name() != Some(group_name) {
            debug!(group_name, "ignoring roster for a group that is not open");
            return Ok(Vec::new());
        }

        self.membership.snapshot(group_name, roster);
        Ok(vec![self.roster_changed(group_name)])
    }

    /// Process a transport callback.
    pub fn handle_transport(
        &mut self,
        connection: ConnectionId,
        event: TransportEvent,
    ) -> Vec<ChannelAction> {
        if self.current != Some(connection) {
            debug!(%connection, "ignoring callback for a stale connection");
            return Vec::new();
        }
        let state = self.state();
        if state.is_terminal() {
            debug!(%connection, ?state, "ignoring callback for an ended connection");
            return Vec::new();
        }

        match (state, event) {
            (ChannelState::Connecting, TransportEvent::Opened) => self.join(connection),
            (_, TransportEvent::Opened) => {
                warn!(%connection, ?state, "unexpected open callback");
                Vec::new()
            },
            (ChannelState::Joined | ChannelState::Active, TransportEvent::Message(text)) => {
                self.handle_frame(connection, &text)
            },
            (_, TransportEvent::Message(_)) => {
                warn!(%connection, ?state, "dropping frame received before join");
                Vec::new()
            },
            (_, TransportEvent::Error(reason)) => {
                self.fail(connection, ChannelError::Transport(reason))
            },
            (_, TransportEvent::Closed { reason }) => {
                info!(%connection, %reason, "transport closed by peer");
                let mut actions: Vec<_> =
                    self.transition(connection, ChannelState::Closed).into_iter().collect();
                actions.push(ChannelAction::ConnectionLost {
                    connection,
                    error: ChannelError::TransportClosed { reason },
                });
                actions
            },
        }
    }

    /// Process periodic maintenance (join timeout).
    pub fn tick(&mut self, now: E::Instant) -> Vec<ChannelAction> {
        let Some(connection) = self.current_connection() else {
            return Vec::new();
        };
        if !matches!(connection.state, ChannelState::Connecting | ChannelState::Joined) {
            return Vec::new();
        }

        if now < connection.opened_at {
            return Vec::new();
        }
        let elapsed = now - connection.opened_at;
        if elapsed <= self.config.join_timeout {
            return Vec::new();
        }

        let id = connection.id;
        self.fail(id, ChannelError::JoinTimeout { elapsed })
    }

    fn join(&mut self, id: ConnectionId) -> Vec<ChannelAction> {
        let Some(connection) = self.registry.get(id) else {
            return Vec::new();
        };
        let join = connection.context.join_action();

        match self.send_frame(id, &join) {
            Ok(send) => {
                let mut actions = vec![send];
                actions.extend(self.transition(id, ChannelState::Joined));
                actions
            },
            Err(error) => self.fail(id, error),
        }
    }

    fn handle_frame(&mut self, id: ConnectionId, text: &str) -> Vec<ChannelAction> {
        let event = match decode(text) {
            Ok(event) => event,
            Err(error) => {
                warn!(connection = %id, %error, "dropping undecodable frame");
                return Vec::new();
            },
        };

        let mut actions = Vec::new();
        if self.state() == ChannelState::Joined {
            actions.extend(self.transition(id, ChannelState::Active));
        }

        let Some(connection) = self.registry.get_mut(id) else {
            return actions;
        };
        let context = connection.context.clone();
        let key = context.key();

        debug!(connection = %id, frame = event.name(), "routing frame");
        match event {
            InboundEvent::Snapshot(Snapshot { scope, channel_id, history }) => {
                match (scope, &context) {
                    (SnapshotScope::Private, ChatContext::Private { .. }) => {
                        connection.chat_id = Some(channel_id);
                    },
                    (SnapshotScope::Group, ChatContext::Group { .. }) => {},
                    _ => warn!(connection = %id, ?scope, "snapshot scope does not match channel"),
                }
                self.store.replace(&key, history.clone());
                actions.push(ChannelAction::HistoryReplaced { key, messages: history });
            },
            InboundEvent::RosterSnapshot(roster) => {
                actions.extend(self.route_roster(id, &context, roster));
            },
            InboundEvent::Increment(message) => {
                self.store.append(&key, message.clone());
                actions.push(ChannelAction::MessageAppended { key, message });
            },
            InboundEvent::Notice { content } => {
                info!(connection = %id, %content, "server notice");
                actions.push(ChannelAction::Notice { connection: id, content });
            },
        }
        actions
    }

    fn route_roster(
        &mut self,
        id: ConnectionId,
        context: &ChatContext,
        roster: RosterSnapshot,
    ) -> Option<ChannelAction> {
        let Some(group) = context.group_name() else {
            warn!(connection = %id, "dropping roster frame on a private channel");
            return None;
        };
        if let Some(named) = roster.group_name.as_deref()
            && named != group
        {
            warn!(connection = %id, named, "dropping roster frame for another group");
            return None;
        }

        let group = group.to_owned();
        self.membership.snapshot(&group, roster.into());
        Some(self.roster_changed(&group))
    }

    fn require_active(
        &self,
        operation: &'static str,
    ) -> Result<&ChannelConnection<E::Instant>, ChannelError> {
        match self.current_connection() {
            Some(connection) if connection.state == ChannelState::Active => Ok(connection),
            other => {
                let state = other.map_or(ChannelState::Idle, |c| c.state);
                warn!(operation, ?state, "dropping action: channel not ready");
                Err(ChannelError::ChannelNotReady { state })
            },
        }
    }

    fn require_group(
        &self,
        operation: &'static str,
    ) -> Result<(ConnectionId, String, String), ChannelError> {
        let connection = self.require_active(operation)?;
        match &connection.context {
            ChatContext::Group { group_name, self_identity } => {
                Ok((connection.id, group_name.clone(), self_identity.clone()))
            },
            ChatContext::Private { .. } => Err(ChannelError::NotAGroupChannel),
        }
    }

    fn send_frame(
        &self,
        id: ConnectionId,
        action: &OutboundAction,
    ) -> Result<ChannelAction, ChannelError> {
        let credentials = self.credentials.complete().ok_or(ChannelError::AuthMissing)?;
        let frame = encode(action, &credentials)?;
        debug!(connection = %id, action = action.kind().wire_name(), "sending frame");
        Ok(ChannelAction::SendFrame { connection: id, frame })
    }

    fn roster_changed(&self, group_name: &str) -> ChannelAction {
        ChannelAction::RosterChanged {
            group_name: group_name.to_owned(),
            members: self.membership.members(group_name).into_iter().cloned().collect(),
            is_self_admin: self.membership.is_admin(group_name),
        }
    }

    fn fail(&mut self, id: ConnectionId, error: ChannelError) -> Vec<ChannelAction> {
        error!(connection = %id, %error, "channel failed");
        let mut actions: Vec<_> = self.transition(id, ChannelState::Failed).into_iter().collect();
        actions.push(ChannelAction::CloseTransport { connection: id });
        actions.push(ChannelAction::ConnectionLost { connection: id, error });
        actions
    }

    fn transition(&mut self, id: ConnectionId, to: ChannelState) -> Option<ChannelAction> {
        let connection = self.registry.get_mut(id)?;
        let from = connection.state;
        if from == to {
            return None;
        }
        connection.state = to;
        debug!(connection = %id, ?from, ?to, "state changed");
        Some(ChannelAction::StateChanged { connection: id, from, to })
    }
}
