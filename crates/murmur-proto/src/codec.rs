//! Frame encoding and classification.
//!
//! # Outbound
//!
//! ```text
//! {"action": "<wire name>", "data": {...}, "access_token": "...", "csrf_token": "..."}
//! ```
//!
//! # Inbound
//!
//! Inbound frames carry no tag. Classification looks at the parsed structure,
//! in this order:
//!
//! | present fields                      | event            |
//! |-------------------------------------|------------------|
//! | `history` + `chat_id`/`group_id`    | `Snapshot`       |
//! | `members`                           | `RosterSnapshot` |
//! | `sender_username`                   | `Increment`      |
//! | `content` only                      | `Notice`         |
//!
//! Anything else, including non-JSON text, is a [`DecodeError`].

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    Credentials, DecodeError, InboundEvent, Message, ProtocolError, RosterSnapshot, Snapshot,
    SnapshotScope, WireId,
    errors::Result,
    payloads::{ActionKind, OutboundAction},
};

/// An encoded outbound frame, ready to be written as one text message.
///
/// The text embeds both credential tokens, so `Debug` prints only the action
/// kind and length.
#[derive(Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    kind: ActionKind,
    text: String,
}

impl OutboundFrame {
    /// Action this frame carries.
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// JSON text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consume into the JSON text.
    pub fn into_text(self) -> String {
        self.text
    }
}

impl fmt::Debug for OutboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundFrame")
            .field("kind", &self.kind)
            .field("len", &self.text.len())
            .finish()
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    action: &'static str,
    data: &'a T,
    access_token: &'a str,
    csrf_token: &'a str,
}

/// Encode an action with the caller's credentials.
///
/// Credentials must be fetched by the caller immediately before this call;
/// the codec never caches them.
///
/// # Errors
///
/// - `ProtocolError::IncompleteCredentials` if either token is empty
/// - `ProtocolError::JsonEncode` if serialization fails
pub fn encode(action: &OutboundAction, credentials: &Credentials) -> Result<OutboundFrame> {
    if let Some(missing) = credentials.missing_token() {
        return Err(ProtocolError::IncompleteCredentials { missing });
    }

    let kind = action.kind();
    let name = kind.wire_name();
    let text = match action {
        OutboundAction::JoinPrivate(data) => envelope(name, data, credentials),
        OutboundAction::SendPrivateMessage(data) => envelope(name, data, credentials),
        OutboundAction::JoinGroup(data) => envelope(name, data, credentials),
        OutboundAction::SendGroupMessage(data) => envelope(name, data, credentials),
        OutboundAction::AddGroupMember(data) => envelope(name, data, credentials),
        OutboundAction::RemoveGroupMember(data) => envelope(name, data, credentials),
    }?;

    Ok(OutboundFrame { kind, text })
}

fn envelope<T: Serialize>(
    action: &'static str,
    data: &T,
    credentials: &Credentials,
) -> Result<String> {
    let envelope = Envelope {
        action,
        data,
        access_token: credentials.access_token(),
        csrf_token: credentials.anti_forgery_token(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Classify one inbound text frame.
///
/// # Errors
///
/// Returns [`DecodeError`] for non-JSON text, non-object JSON, or an object
/// missing the fields its apparent shape requires. Never panics.
pub fn decode(raw: &str) -> std::result::Result<InboundEvent, DecodeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::NotJson(e.to_string()))?;
    let found = json_type(&value);
    let Value::Object(object) = value else {
        return Err(DecodeError::NotAnObject { found });
    };

    if object.contains_key("history") {
        return decode_snapshot(object);
    }
    if object.contains_key("members") {
        return decode_roster(object);
    }
    if object.contains_key("sender_username") {
        return decode_increment(object);
    }

    match object.get("content") {
        Some(Value::String(content)) => Ok(InboundEvent::Notice { content: content.clone() }),
        Some(other) => Err(DecodeError::InvalidField {
            frame: "notice",
            reason: format!("content is {}, expected string", json_type(other)),
        }),
        None => Err(DecodeError::MissingField { frame: "increment", field: "sender_username" }),
    }
}

fn decode_snapshot(mut object: Map<String, Value>) -> std::result::Result<InboundEvent, DecodeError> {
    let (scope, raw_id) = if let Some(id) = object.remove("chat_id") {
        (SnapshotScope::Private, id)
    } else if let Some(id) = object.remove("group_id") {
        (SnapshotScope::Group, id)
    } else {
        return Err(DecodeError::MissingField { frame: "snapshot", field: "chat_id" });
    };

    let channel_id: WireId = serde_json::from_value(raw_id).map_err(invalid("snapshot"))?;
    let history: Vec<Message> = match object.remove("history") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => serde_json::from_value(value).map_err(invalid("snapshot"))?,
    };

    Ok(InboundEvent::Snapshot(Snapshot { scope, channel_id, history }))
}

fn decode_roster(object: Map<String, Value>) -> std::result::Result<InboundEvent, DecodeError> {
    let roster: RosterSnapshot =
        serde_json::from_value(Value::Object(object)).map_err(invalid("roster"))?;
    Ok(InboundEvent::RosterSnapshot(roster))
}

fn decode_increment(object: Map<String, Value>) -> std::result::Result<InboundEvent, DecodeError> {
    for field in ["content", "timestamp"] {
        if !object.contains_key(field) {
            return Err(DecodeError::MissingField { frame: "increment", field });
        }
    }
    let message: Message =
        serde_json::from_value(Value::Object(object)).map_err(invalid("increment"))?;
    Ok(InboundEvent::Increment(message))
}

fn invalid(frame: &'static str) -> impl Fn(serde_json::Error) -> DecodeError {
    move |e| DecodeError::InvalidField { frame, reason: e.to_string() }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::{GroupMessageBody, IdentityRef, JoinPrivate, SendGroupMessage};

    fn creds() -> Credentials {
        Credentials::new("tok", "csrf")
    }

    #[test]
    fn join_private_frame_layout() {
        let action = OutboundAction::JoinPrivate(JoinPrivate {
            self_identity: IdentityRef { username: "alice".into() },
            counterpart_id: WireId::from(2),
        });
        let frame = encode(&action, &creds()).unwrap();

        assert_eq!(frame.kind(), ActionKind::JoinPrivate);
        insta::assert_snapshot!(
            frame.as_str(),
            @r#"{"action":"join_private_chat","data":{"user1":{"username":"alice"},"user2_id":2},"access_token":"tok","csrf_token":"csrf"}"#
        );
    }

    #[test]
    fn group_message_addresses_group_by_name() {
        let action = OutboundAction::SendGroupMessage(SendGroupMessage {
            group: "rustaceans".into(),
            message: GroupMessageBody { sender: "alice".into(), content: "hi".into() },
        });
        let frame = encode(&action, &creds()).unwrap();
        let json: Value = serde_json::from_str(frame.as_str()).unwrap();

        assert_eq!(json["action"], "send_group_message");
        assert_eq!(json["data"]["group_id"], "rustaceans");
        assert_eq!(json["data"]["message"]["sender_username"], "alice");
        assert!(json["data"]["message"].get("timestamp").is_none());
    }

    #[test]
    fn empty_token_is_rejected() {
        let action = OutboundAction::JoinPrivate(JoinPrivate {
            self_identity: IdentityRef { username: "alice".into() },
            counterpart_id: WireId::from(2),
        });
        let result = encode(&action, &Credentials::new("tok", ""));
        assert_eq!(result, Err(ProtocolError::IncompleteCredentials { missing: "csrf_token" }));
    }

    #[test]
    fn debug_hides_frame_text() {
        let action = OutboundAction::JoinPrivate(JoinPrivate {
            self_identity: IdentityRef { username: "alice".into() },
            counterpart_id: WireId::from(2),
        });
        let frame = encode(&action, &creds()).unwrap();
        assert!(!format!("{frame:?}").contains("tok"));
    }

    #[test]
    fn private_snapshot_is_classified() {
        let event = decode(r#"{"chat_id":"42","history":[]}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::Snapshot(Snapshot {
                scope: SnapshotScope::Private,
                channel_id: WireId::from("42"),
                history: vec![],
            })
        );
    }

    #[test]
    fn group_snapshot_uses_group_id() {
        let raw = r#"{"group_id":7,"history":[{"sender_username":"a","content":"x","timestamp":"t"}]}"#;
        let InboundEvent::Snapshot(snapshot) = decode(raw).unwrap() else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.scope, SnapshotScope::Group);
        assert_eq!(snapshot.channel_id, WireId::from(7));
        assert_eq!(snapshot.history, vec![Message::new("a", "x", "t")]);
    }

    #[test]
    fn null_history_is_empty() {
        let InboundEvent::Snapshot(snapshot) = decode(r#"{"chat_id":1,"history":null}"#).unwrap()
        else {
            panic!("expected snapshot");
        };
        assert!(snapshot.history.is_empty());
    }

    #[test]
    fn history_without_id_is_rejected() {
        assert_eq!(
            decode(r#"{"history":[]}"#),
            Err(DecodeError::MissingField { frame: "snapshot", field: "chat_id" })
        );
    }

    #[test]
    fn roster_is_classified() {
        let raw = r#"{"group_name":"g","members":[{"id":1,"username":"alice"}],"admin":true}"#;
        let InboundEvent::RosterSnapshot(roster) = decode(raw).unwrap() else {
            panic!("expected roster");
        };
        assert_eq!(roster.group_name.as_deref(), Some("g"));
        assert_eq!(roster.admin, Some(true));
        assert_eq!(roster.members.len(), 1);
    }

    #[test]
    fn increment_is_classified() {
        let raw = r#"{"sender_username":"bob","content":"hey","timestamp":"2024-01-01T00:00:00Z"}"#;
        assert_eq!(
            decode(raw).unwrap(),
            InboundEvent::Increment(Message::new("bob", "hey", "2024-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn increment_without_timestamp_is_rejected() {
        assert_eq!(
            decode(r#"{"sender_username":"bob","content":"hey"}"#),
            Err(DecodeError::MissingField { frame: "increment", field: "timestamp" })
        );
    }

    #[test]
    fn content_only_object_is_a_notice() {
        let raw = r#"{"content":"User is not in the group. You can not send messages"}"#;
        assert!(matches!(decode(raw).unwrap(), InboundEvent::Notice { .. }));
    }

    #[test]
    fn malformed_input_is_a_decode_error() {
        assert!(matches!(decode("Unknown action"), Err(DecodeError::NotJson(_))));
        assert_eq!(decode("[1,2]"), Err(DecodeError::NotAnObject { found: "array" }));
        assert_eq!(
            decode("{}"),
            Err(DecodeError::MissingField { frame: "increment", field: "sender_username" })
        );
        assert!(matches!(
            decode(r#"{"sender_username":1,"content":"x","timestamp":"t"}"#),
            Err(DecodeError::InvalidField { frame: "increment", .. })
        ));
    }
}
