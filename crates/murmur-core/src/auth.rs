//! Session credentials as seen by the channel core.
//!
//! The core never stores a credential pair on a connection. Every join and
//! every send asks the [`CredentialSource`] again, so a token rotated
//! elsewhere takes effect on the next action.

use std::sync::{Arc, RwLock};

use murmur_proto::Credentials;

/// Read-only view of the current session's credentials.
pub trait CredentialSource: Send + Sync {
    /// Current credential pair, or `None` when signed out.
    fn current(&self) -> Option<Credentials>;

    /// Current pair if both tokens are non-empty.
    fn complete(&self) -> Option<Credentials> {
        self.current().filter(Credentials::is_complete)
    }
}

/// A fixed credential pair.
#[derive(Debug, Clone)]
pub struct StaticCredentials(Option<Credentials>);

impl StaticCredentials {
    /// Always return `credentials`.
    pub fn new(credentials: Credentials) -> Self {
        Self(Some(credentials))
    }

    /// A source with no credentials.
    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn current(&self) -> Option<Credentials> {
        self.0.clone()
    }
}

/// Credentials shared with whatever component owns sign-in.
///
/// Clones share one slot. Rotating or clearing through any clone is seen by
/// all of them on the next read.
#[derive(Debug, Clone, Default)]
pub struct SharedCredentials {
    slot: Arc<RwLock<Option<Credentials>>>,
}

impl SharedCredentials {
    /// Start with `credentials`.
    pub fn new(credentials: Credentials) -> Self {
        Self { slot: Arc::new(RwLock::new(Some(credentials))) }
    }

    /// Replace the current pair.
    pub fn rotate(&self, credentials: Credentials) {
        match self.slot.write() {
            Ok(mut slot) => *slot = Some(credentials),
            Err(poisoned) => *poisoned.into_inner() = Some(credentials),
        }
    }

    /// Sign out.
    pub fn clear(&self) {
        match self.slot.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl CredentialSource for SharedCredentials {
    fn current(&self) -> Option<Credentials> {
        match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<T: CredentialSource + ?Sized> CredentialSource for Arc<T> {
    fn current(&self) -> Option<Credentials> {
        (**self).current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_pair_is_not_complete() {
        let source = StaticCredentials::new(Credentials::new("tok", ""));
        assert!(source.current().is_some());
        assert!(source.complete().is_none());
    }

    #[test]
    fn rotation_is_visible_through_clones() {
        let shared = SharedCredentials::new(Credentials::new("old", "csrf"));
        let reader = shared.clone();

        shared.rotate(Credentials::new("new", "csrf"));
        assert_eq!(reader.current().unwrap().access_token(), "new");

        shared.clear();
        assert!(reader.current().is_none());
    }
}
