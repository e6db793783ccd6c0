//! Text rendering of channel actions.

use std::fmt::Write;

use murmur_core::{ChannelAction, ChannelState};
use murmur_proto::{Member, Message};

/// Lines to print for `action`, or `None` if it is not user-visible.
pub fn render_action(action: &ChannelAction) -> Option<String> {
    match action {
        ChannelAction::HistoryReplaced { messages, .. } => {
            let mut out = format!("-- history ({} messages) --", messages.len());
            for message in messages {
                let _ = write!(out, "\n{}", render_message(message));
            }
            Some(out)
        },
        ChannelAction::MessageAppended { message, .. } => Some(render_message(message)),
        ChannelAction::RosterChanged { group_name, members, is_self_admin } => {
            let role = if *is_self_admin { " (you are admin)" } else { "" };
            Some(format!("-- {group_name}: {}{role} --", render_members(members)))
        },
        ChannelAction::Notice { content, .. } => Some(format!("!! {content}")),
        ChannelAction::StateChanged { to, .. } => match to {
            ChannelState::Active => Some("-- connected --".to_owned()),
            ChannelState::Closed => Some("-- closed --".to_owned()),
            _ => None,
        },
        ChannelAction::ConnectionLost { error, .. } => Some(format!("!! connection lost: {error}")),
        ChannelAction::OpenTransport { .. }
        | ChannelAction::SendFrame { .. }
        | ChannelAction::CloseTransport { .. } => None,
    }
}

/// Comma-separated `name#id` list.
pub fn render_members(members: &[Member]) -> String {
    if members.is_empty() {
        return "no members".to_owned();
    }
    members.iter().map(|m| format!("{}#{}", m.username, m.id)).collect::<Vec<_>>().join(", ")
}

fn render_message(message: &Message) -> String {
    format!("[{}] {}: {}", message.timestamp, message.sender, message.content)
}

#[cfg(test)]
mod tests {
    use murmur_core::{ChannelError, ChatContext, ConnectionId};

    use super::*;

    #[test]
    fn history_lists_every_message() {
        let action = ChannelAction::HistoryReplaced {
            key: ChatContext::group("alice", "rust").key(),
            messages: vec![
                Message::new("bob", "hi", "2024-01-01T00:00:00"),
                Message::new("alice", "hey", "2024-01-01T00:00:05"),
            ],
        };
        insta::assert_snapshot!(render_action(&action).unwrap_or_default(), @r"
        -- history (2 messages) --
        [2024-01-01T00:00:00] bob: hi
        [2024-01-01T00:00:05] alice: hey
        ");
    }

    #[test]
    fn roster_and_failures_are_visible() {
        let roster = ChannelAction::RosterChanged {
            group_name: "rust".into(),
            members: vec![Member::new(2, "bob"), Member::new(1, "alice")],
            is_self_admin: true,
        };
        assert_eq!(
            render_action(&roster).as_deref(),
            Some("-- rust: bob#2, alice#1 (you are admin) --")
        );

        let lost = ChannelAction::ConnectionLost {
            connection: ConnectionId::new(1),
            error: ChannelError::TransportClosed { reason: "1001 going away".into() },
        };
        assert_eq!(
            render_action(&lost).as_deref(),
            Some("!! connection lost: transport closed: 1001 going away")
        );
    }

    #[test]
    fn transport_work_is_silent() {
        let action = ChannelAction::CloseTransport { connection: ConnectionId::new(3) };
        assert_eq!(render_action(&action), None);
    }
}
