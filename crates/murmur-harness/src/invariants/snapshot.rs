//! Observable state snapshots for invariant checking.
//!
//! Invariants run against a snapshot rather than live state so every check
//! sees one consistent moment.

use murmur_core::{
    ChannelKey, ChannelState, ChatContext, ConnectionId, ConnectionManager, CredentialSource,
    EntryStatus, Environment,
};
use murmur_proto::WireId;

/// Snapshot of one client's channel state and its open transports.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Every connection record still registered.
    pub channels: Vec<ChannelSnapshot>,
    /// Connection the manager considers current.
    pub current: Option<ConnectionId>,
    /// Channels with a message log.
    pub store_keys: Vec<ChannelKey>,
    /// Tracked group rosters.
    pub rosters: Vec<GroupSnapshot>,
    /// Transports the driver still holds open.
    pub open_transports: Vec<ConnectionId>,
}

impl SystemSnapshot {
    /// Create an empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture a manager plus the driver's open transports.
    pub fn capture<E: Environment, A: CredentialSource>(
        manager: &ConnectionManager<E, A>,
        open_transports: impl IntoIterator<Item = ConnectionId>,
    ) -> Self {
        let mut channels: Vec<_> = manager
            .registry()
            .iter()
            .map(|c| ChannelSnapshot { id: c.id, context: c.context.clone(), state: c.state })
            .collect();
        channels.sort_by_key(|c| c.id);

        let mut store_keys: Vec<_> = manager.store().keys().cloned().collect();
        store_keys.sort();

        let membership = manager.membership();
        let mut rosters: Vec<_> = membership
            .groups()
            .map(|group| GroupSnapshot {
                group: group.to_owned(),
                entries: membership
                    .entries(group)
                    .iter()
                    .map(|e| (e.member.id.clone(), e.status))
                    .collect(),
            })
            .collect();
        rosters.sort_by(|a, b| a.group.cmp(&b.group));

        Self {
            channels,
            current: manager.current_connection().map(|c| c.id),
            store_keys,
            rosters,
            open_transports: open_transports.into_iter().collect(),
        }
    }
}

/// One registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    /// Connection id
    pub id: ConnectionId,
    /// Context it serves
    pub context: ChatContext,
    /// Lifecycle state
    pub state: ChannelState,
}

/// One tracked group roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    /// Group name
    pub group: String,
    /// Member ids with their confirmation status, in roster order
    pub entries: Vec<(WireId, EntryStatus)>,
}
