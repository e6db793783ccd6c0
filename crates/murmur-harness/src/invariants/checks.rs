//! Standard invariant checks.

use std::collections::HashSet;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// At most one channel is live, and it is the current one.
///
/// The driver may hold at most one open transport, and it must belong to the
/// live channel. A second live channel means a context switch skipped its
/// close.
pub struct SingleActiveChannel;

impl Invariant for SingleActiveChannel {
    fn name(&self) -> &'static str {
        "single_active_channel"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let live: Vec<_> = state.channels.iter().filter(|c| c.state.is_live()).collect();

        if live.len() > 1 {
            return Err(self.violation(format!(
                "{} live channels: {:?}",
                live.len(),
                live.iter().map(|c| c.id).collect::<Vec<_>>()
            )));
        }
        if let Some(channel) = live.first()
            && state.current != Some(channel.id)
        {
            return Err(self.violation(format!(
                "live {} is not current ({:?})",
                channel.id, state.current
            )));
        }
        if state.open_transports.len() > 1 {
            return Err(self.violation(format!("open transports {:?}", state.open_transports)));
        }
        if let Some(open) = state.open_transports.first()
            && !live.iter().any(|c| c.id == *open)
        {
            return Err(self.violation(format!("transport {open} open for an ended channel")));
        }
        Ok(())
    }
}

/// A roster never lists the same user twice.
pub struct RosterHasNoDuplicates;

impl Invariant for RosterHasNoDuplicates {
    fn name(&self) -> &'static str {
        "roster_has_no_duplicates"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for roster in &state.rosters {
            let mut seen = HashSet::new();
            for (id, status) in &roster.entries {
                if !seen.insert(id) {
                    return Err(self.violation(format!(
                        "group {}: user {id} listed twice ({status:?})",
                        roster.group
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Message logs exist only for channels the registry knows.
///
/// Switching context drops the previous channel's log; a log for a channel
/// with no connection record is a leak from an earlier context.
pub struct StoreOnlyForKnownChannels;

impl Invariant for StoreOnlyForKnownChannels {
    fn name(&self) -> &'static str {
        "store_only_for_known_channels"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let known: HashSet<_> = state.channels.iter().map(|c| c.context.key()).collect();
        match state.store_keys.iter().find(|key| !known.contains(*key)) {
            Some(key) => Err(self.violation(format!("log kept for unknown channel {key:?}"))),
            None => Ok(()),
        }
    }
}

trait ViolationExt: Invariant {
    fn violation(&self, message: String) -> Violation {
        Violation { invariant: self.name(), message }
    }
}

impl<T: Invariant> ViolationExt for T {}

#[cfg(test)]
mod tests {
    use murmur_core::{ChannelState, ChatContext, ConnectionId, EntryStatus};
    use murmur_proto::WireId;

    use super::*;
    use crate::invariants::{ChannelSnapshot, GroupSnapshot};

    fn channel(id: u64, state: ChannelState) -> ChannelSnapshot {
        ChannelSnapshot {
            id: ConnectionId::new(id),
            context: ChatContext::private("alice", id),
            state,
        }
    }

    #[test]
    fn two_live_channels_violate() {
        let state = SystemSnapshot {
            channels: vec![channel(1, ChannelState::Active), channel(2, ChannelState::Connecting)],
            current: Some(ConnectionId::new(2)),
            ..SystemSnapshot::empty()
        };
        assert!(SingleActiveChannel.check(&state).is_err());
    }

    #[test]
    fn transport_of_closed_channel_violates() {
        let state = SystemSnapshot {
            channels: vec![channel(1, ChannelState::Closed)],
            current: Some(ConnectionId::new(1)),
            open_transports: vec![ConnectionId::new(1)],
            ..SystemSnapshot::empty()
        };
        let violation = SingleActiveChannel.check(&state).unwrap_err();
        assert_eq!(violation.invariant, "single_active_channel");
    }

    #[test]
    fn duplicate_roster_entry_violates() {
        let state = SystemSnapshot {
            rosters: vec![GroupSnapshot {
                group: "rust".into(),
                entries: vec![
                    (WireId::from(1u64), EntryStatus::Confirmed),
                    (WireId::from(1u64), EntryStatus::PendingAdd),
                ],
            }],
            ..SystemSnapshot::empty()
        };
        assert!(RosterHasNoDuplicates.check(&state).is_err());
    }

    #[test]
    fn orphaned_log_violates() {
        let state = SystemSnapshot {
            channels: vec![channel(1, ChannelState::Active)],
            store_keys: vec![ChatContext::group("alice", "ops").key()],
            ..SystemSnapshot::empty()
        };
        assert!(StoreOnlyForKnownChannels.check(&state).is_err());
    }
}
