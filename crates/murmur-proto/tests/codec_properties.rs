//! Property tests for the frame codec.
//!
//! Outbound: every encoded frame is a JSON object naming its action and
//! carrying both credential tokens. Inbound: decoding never panics, and the
//! classification of well-formed frames is stable.

use murmur_proto::{
    ActionKind, Credentials, InboundEvent, Message, OutboundAction, SnapshotScope, WireId, decode,
    encode,
    payloads::{
        AddGroupMember, GroupMessageBody, IdentityRef, JoinGroup, JoinPrivate, RemoveGroupMember,
        SendGroupMessage, SendPrivateMessage,
    },
};
use proptest::prelude::*;
use serde_json::Value;

fn wire_id() -> impl Strategy<Value = WireId> {
    prop_oneof![any::<u64>().prop_map(WireId::from), "[a-z0-9]{1,8}".prop_map(WireId::from),]
}

fn message() -> impl Strategy<Value = Message> {
    ("[a-z]{1,12}", ".{0,40}", "[0-9T:\\-Z]{0,24}")
        .prop_map(|(sender, content, timestamp)| Message::new(sender, content, timestamp))
}

fn outbound_action() -> impl Strategy<Value = OutboundAction> {
    let name = "[a-z]{1,12}";
    prop_oneof![
        (name, wire_id()).prop_map(|(username, counterpart_id)| {
            OutboundAction::JoinPrivate(JoinPrivate {
                self_identity: IdentityRef { username },
                counterpart_id,
            })
        }),
        (wire_id(), message()).prop_map(|(chat_id, message)| {
            OutboundAction::SendPrivateMessage(SendPrivateMessage { chat_id, message })
        }),
        (name, name).prop_map(|(group_name, self_identity)| {
            OutboundAction::JoinGroup(JoinGroup { group_name, self_identity })
        }),
        (name, name, ".{0,40}").prop_map(|(group, sender, content)| {
            OutboundAction::SendGroupMessage(SendGroupMessage {
                group,
                message: GroupMessageBody { sender, content },
            })
        }),
        (name, wire_id(), name).prop_map(|(group_name, user_id, adder)| {
            OutboundAction::AddGroupMember(AddGroupMember { group_name, user_id, adder })
        }),
        (name, wire_id(), name).prop_map(|(group_name, user_id, admin)| {
            OutboundAction::RemoveGroupMember(RemoveGroupMember { group_name, user_id, admin })
        }),
    ]
}

proptest! {
    #[test]
    fn encoded_frames_carry_both_tokens(
        action in outbound_action(),
        access in "[A-Za-z0-9._\\-]{1,32}",
        csrf in "[A-Za-z0-9]{1,32}",
    ) {
        let frame = encode(&action, &Credentials::new(access.clone(), csrf.clone())).unwrap();
        let json: Value = serde_json::from_str(frame.as_str()).unwrap();

        prop_assert!(json.is_object());
        prop_assert_eq!(json["access_token"].as_str(), Some(access.as_str()));
        prop_assert_eq!(json["csrf_token"].as_str(), Some(csrf.as_str()));
        prop_assert_eq!(json["action"].as_str(), Some(action.kind().wire_name()));
        prop_assert!(json["data"].is_object());
    }

    #[test]
    fn decode_never_panics(raw in ".{0,256}") {
        let _ = decode(&raw);
    }

    #[test]
    fn decode_never_panics_on_objects(
        keys in prop::collection::vec(
            prop_oneof![
                Just("chat_id"), Just("group_id"), Just("history"), Just("members"),
                Just("sender_username"), Just("content"), Just("timestamp"), Just("admin"),
            ],
            0..6,
        ),
        value in prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
            Just(Value::Array(vec![])),
        ],
    ) {
        let object: serde_json::Map<String, Value> =
            keys.into_iter().map(|k| (k.to_string(), value.clone())).collect();
        let _ = decode(&Value::Object(object).to_string());
    }

    #[test]
    fn snapshots_keep_history_order(id in wire_id(), history in prop::collection::vec(message(), 0..10)) {
        let raw = serde_json::json!({ "chat_id": id, "history": history }).to_string();
        let InboundEvent::Snapshot(snapshot) = decode(&raw).unwrap() else {
            return Err(TestCaseError::fail("expected snapshot"));
        };

        prop_assert_eq!(snapshot.scope, SnapshotScope::Private);
        prop_assert_eq!(snapshot.channel_id, id);
        prop_assert_eq!(snapshot.history, history);
    }

    #[test]
    fn increments_decode_to_the_sent_message(msg in message()) {
        let raw = serde_json::to_string(&msg).unwrap();
        prop_assert_eq!(decode(&raw).unwrap(), InboundEvent::Increment(msg));
    }
}

#[test]
fn every_action_kind_has_a_generated_case() {
    let names: Vec<_> = ActionKind::ALL.iter().map(|k| k.wire_name()).collect();
    insta::assert_snapshot!(names.join("\n"), @r"
    join_private_chat
    send_private_message
    join_group_chat
    send_group_message
    add_user_to_group_chat
    remove_user_from_group_chat
    ");
}

#[test]
fn send_private_message_frame_layout() {
    let action = OutboundAction::SendPrivateMessage(SendPrivateMessage {
        chat_id: WireId::from(42),
        message: Message::new("alice", "hi bob", "2024-01-01T00:00:00.000Z"),
    });
    let frame = encode(&action, &Credentials::new("a", "c")).unwrap();

    insta::assert_snapshot!(
        frame.as_str(),
        @r#"{"action":"send_private_message","data":{"chat_id":42,"message":{"sender_username":"alice","content":"hi bob","timestamp":"2024-01-01T00:00:00.000Z"}},"access_token":"a","csrf_token":"c"}"#
    );
}
