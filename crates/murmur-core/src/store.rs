//! Per-channel message logs.
//!
//! A log is replaced wholesale by a history snapshot and grown by increments.
//! Arrival order is the only order: no sorting by timestamp, no dedup.

use std::collections::HashMap;

use murmur_proto::Message;

use crate::context::ChannelKey;

/// Ordered message logs keyed by channel.
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    logs: HashMap<ChannelKey, Vec<Message>>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the channel's log and install `messages` in its place.
    ///
    /// The swap is a single assignment, so no reader observes a mix of old
    /// and new entries.
    pub fn replace(&mut self, key: &ChannelKey, messages: Vec<Message>) {
        self.logs.insert(key.clone(), messages);
    }

    /// Append one message in arrival order.
    ///
    /// An increment that beats the snapshot starts the log.
    pub fn append(&mut self, key: &ChannelKey, message: Message) {
        self.logs.entry(key.clone()).or_default().push(message);
    }

    /// The channel's log, oldest first. Empty if nothing was received.
    ///
    /// Borrowing a slice makes every read a fresh, restartable view.
    pub fn read(&self, key: &ChannelKey) -> &[Message] {
        self.logs.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of messages in the channel's log.
    pub fn len(&self, key: &ChannelKey) -> usize {
        self.read(key).len()
    }

    /// Drop the channel's log.
    pub fn clear(&mut self, key: &ChannelKey) -> Option<Vec<Message>> {
        self.logs.remove(key)
    }

    /// Keys that currently hold a log.
    pub fn keys(&self) -> impl Iterator<Item = &ChannelKey> {
        self.logs.keys()
    }
}
