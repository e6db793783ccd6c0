//! Fuzz target for inbound frame classification
//!
//! # Strategy
//!
//! - Raw text: arbitrary UTF-8, most of it not JSON
//! - Shaped objects: JSON objects built from the keys the classifier looks
//!   at, with values of arbitrary type, so inputs reach every branch
//!
//! # Invariants
//!
//! - `decode` never panics; invalid input returns an error
//! - A decoded snapshot or roster keeps every entry the frame carried

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use murmur_proto::{InboundEvent, decode};
use serde_json::{Map, Value, json};

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(String),
    Shaped(Vec<(Key, Val)>),
}

#[derive(Debug, Arbitrary)]
enum Key {
    ChatId,
    GroupId,
    History,
    Members,
    GroupName,
    SenderUsername,
    Content,
    Timestamp,
    Admin,
    Other(String),
}

#[derive(Debug, Arbitrary)]
enum Val {
    Null,
    Bool(bool),
    Number(u64),
    Text(String),
    Messages(Vec<(String, String, String)>),
    Members(Vec<(u64, String)>),
    Empty,
}

impl Key {
    fn name(&self) -> &str {
        match self {
            Self::ChatId => "chat_id",
            Self::GroupId => "group_id",
            Self::History => "history",
            Self::Members => "members",
            Self::GroupName => "group_name",
            Self::SenderUsername => "sender_username",
            Self::Content => "content",
            Self::Timestamp => "timestamp",
            Self::Admin => "admin",
            Self::Other(name) => name,
        }
    }
}

impl Val {
    fn into_json(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => json!(b),
            Self::Number(n) => json!(n),
            Self::Text(s) => json!(s),
            Self::Messages(messages) => messages
                .into_iter()
                .map(|(s, c, t)| json!({ "sender_username": s, "content": c, "timestamp": t }))
                .collect(),
            Self::Members(members) => {
                members.into_iter().map(|(id, u)| json!({ "id": id, "username": u })).collect()
            },
            Self::Empty => json!({}),
        }
    }
}

fuzz_target!(|input: Input| {
    let (text, object) = match input {
        Input::Raw(text) => (text, None),
        Input::Shaped(fields) => {
            let object: Map<String, Value> =
                fields.into_iter().map(|(k, v)| (k.name().to_owned(), v.into_json())).collect();
            (Value::Object(object.clone()).to_string(), Some(object))
        },
    };

    let Ok(event) = decode(&text) else {
        return;
    };
    let Some(object) = object else {
        return;
    };

    match event {
        InboundEvent::Snapshot(snapshot) => {
            let carried = object.get("history").and_then(Value::as_array).map_or(0, Vec::len);
            assert_eq!(snapshot.history.len(), carried, "snapshot lost history entries");
        },
        InboundEvent::RosterSnapshot(roster) => {
            let carried = object.get("members").and_then(Value::as_array).map_or(0, Vec::len);
            assert_eq!(roster.members.len(), carried, "roster lost members");
        },
        InboundEvent::Increment(_) | InboundEvent::Notice { .. } => {},
    }
});
