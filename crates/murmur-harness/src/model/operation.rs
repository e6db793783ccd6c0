//! Operations for model-based testing.
//!
//! Operations cover caller intents, delivery of in-flight frames, network
//! faults, credential changes, and time. They are generated by proptest (and
//! by the fuzzer via `Arbitrary`) and applied to a [`SimWorld`].
//!
//! [`SimWorld`]: super::SimWorld

use arbitrary::Arbitrary;

/// Small message body so the search space stays manageable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct SmallText(pub u8);

impl SmallText {
    /// Message text.
    pub fn text(self) -> String {
        format!("m{}", self.0)
    }
}

/// Operations that can be applied to the world.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Open the private chat with user `counterpart % 4 + 1`.
    OpenPrivate {
        /// Counterpart selector
        counterpart: u8,
    },

    /// Open group `rust` (even) or `ops` (odd).
    OpenGroup {
        /// Group selector
        group: u8,
    },

    /// Post a message to the current channel.
    Send {
        /// Body
        content: SmallText,
    },

    /// Add user `user % 4 + 1` to the current group.
    AddMember {
        /// User selector
        user: u8,
    },

    /// Remove user `user % 4 + 1` from the current group.
    RemoveMember {
        /// User selector
        user: u8,
    },

    /// Fetch the current group's roster from the server and apply it.
    RefreshRoster,

    /// Close the current channel.
    Close,

    /// Deliver the next in-flight event.
    DeliverOne,

    /// Deliver every in-flight event.
    DeliverAll,

    /// The peer closes the current transport.
    PeerClose,

    /// The current transport fails.
    TransportError,

    /// Refuse the next transport open.
    RefuseNextOpen,

    /// Sign out: both tokens become unavailable.
    ClearCredentials,

    /// Sign in again with a rotated pair.
    RotateCredentials,

    /// Advance virtual time.
    Advance {
        /// Milliseconds, scaled by 100
        centis: u8,
    },
}
