//! Channel registry.
//!
//! Maps chat contexts to their connection records, with a reverse index from
//! connection id to context so transport callbacks can be routed without a
//! scan. The registry is the single place that enforces the process-wide
//! rule: at most one live connection (Connecting, Joined, or Active) at a
//! time. Registration fails while another live connection exists.

use std::collections::HashMap;

use murmur_proto::WireId;

use crate::{
    connection::{ChannelState, ConnectionId},
    context::ChatContext,
};

/// One connection attempt for one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConnection<I> {
    /// Connection id; transport callbacks carry it
    pub id: ConnectionId,
    /// Context the channel serves
    pub context: ChatContext,
    /// Lifecycle state
    pub state: ChannelState,
    /// When the open was requested
    pub opened_at: I,
    /// Chat id from the private history snapshot
    pub chat_id: Option<WireId>,
}

impl<I> ChannelConnection<I> {
    /// Fresh record in [`ChannelState::Connecting`].
    pub fn connecting(id: ConnectionId, context: ChatContext, opened_at: I) -> Self {
        Self { id, context, state: ChannelState::Connecting, opened_at, chat_id: None }
    }
}

/// Registry of channel connections keyed by context.
#[derive(Debug, Clone)]
pub struct ChannelRegistry<I> {
    channels: HashMap<ChatContext, ChannelConnection<I>>,
    contexts: HashMap<ConnectionId, ChatContext>,
}

impl<I> Default for ChannelRegistry<I> {
    fn default() -> Self {
        Self { channels: HashMap::new(), contexts: HashMap::new() }
    }
}

impl<I> ChannelRegistry<I> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection.
    ///
    /// Returns `false` if:
    /// - the id or the context is already registered, or
    /// - any registered connection is still live
    pub fn register(&mut self, connection: ChannelConnection<I>) -> bool {
        if self.contexts.contains_key(&connection.id)
            || self.channels.contains_key(&connection.context)
            || self.live().is_some()
        {
            return false;
        }

        self.contexts.insert(connection.id, connection.context.clone());
        self.channels.insert(connection.context.clone(), connection);
        true
    }

    /// Remove the connection for `context`.
    pub fn unregister(&mut self, context: &ChatContext) -> Option<ChannelConnection<I>> {
        let connection = self.channels.remove(context)?;
        self.contexts.remove(&connection.id);
        Some(connection)
    }

    /// Remove every connection in a terminal state.
    pub fn retire_terminal(&mut self) -> Vec<ChannelConnection<I>> {
        let terminal: Vec<ChatContext> = self
            .channels
            .iter()
            .filter(|(_, c)| c.state.is_terminal())
            .map(|(ctx, _)| ctx.clone())
            .collect();

        terminal.iter().filter_map(|ctx| self.unregister(ctx)).collect()
    }

    /// Connection by id.
    pub fn get(&self, id: ConnectionId) -> Option<&ChannelConnection<I>> {
        self.contexts.get(&id).and_then(|ctx| self.channels.get(ctx))
    }

    /// Mutable connection by id.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut ChannelConnection<I>> {
        let ctx = self.contexts.get(&id)?;
        self.channels.get_mut(ctx)
    }

    /// Connection for a context.
    pub fn by_context(&self, context: &ChatContext) -> Option<&ChannelConnection<I>> {
        self.channels.get(context)
    }

    /// The live connection, if any.
    pub fn live(&self) -> Option<&ChannelConnection<I>> {
        self.channels.values().find(|c| c.state.is_live())
    }

    /// Number of connections in [`ChannelState::Active`].
    pub fn active_count(&self) -> usize {
        self.channels.values().filter(|c| c.state == ChannelState::Active).count()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// All registered connections.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelConnection<I>> {
        self.channels.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64, ctx: ChatContext) -> ChannelConnection<u64> {
        ChannelConnection::connecting(ConnectionId::new(id), ctx, 0)
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ChannelRegistry::new();
        let ctx = ChatContext::private("alice", 2);

        assert!(registry.register(conn(1, ctx.clone())));
        assert_eq!(registry.get(ConnectionId::new(1)).map(|c| &c.context), Some(&ctx));
        assert_eq!(registry.by_context(&ctx).map(|c| c.id), Some(ConnectionId::new(1)));
        assert!(registry.get(ConnectionId::new(2)).is_none());
    }

    #[test]
    fn second_live_connection_is_refused() {
        let mut registry = ChannelRegistry::new();
        assert!(registry.register(conn(1, ChatContext::private("alice", 2))));
        assert!(!registry.register(conn(2, ChatContext::group("alice", "g"))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn terminal_connections_do_not_block_registration() {
        let mut registry = ChannelRegistry::new();
        let first = ChatContext::private("alice", 2);
        registry.register(conn(1, first.clone()));
        registry.get_mut(ConnectionId::new(1)).unwrap().state = ChannelState::Closed;

        assert!(registry.register(conn(2, ChatContext::group("alice", "g"))));

        let retired = registry.retire_terminal();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].context, first);
        assert!(registry.get(ConnectionId::new(1)).is_none());
    }

    #[test]
    fn unregister_removes_reverse_index() {
        let mut registry = ChannelRegistry::new();
        let ctx = ChatContext::group("alice", "g");
        registry.register(conn(7, ctx.clone()));

        assert!(registry.unregister(&ctx).is_some());
        assert!(registry.get(ConnectionId::new(7)).is_none());
        assert!(registry.is_empty());
    }
}
