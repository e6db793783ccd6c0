//! In-memory chat server.
//!
//! A pure model of the server side of a channel: every inbound text frame
//! yields the frames the server would send back on the same connection.
//! It keeps users, private chats, groups, and their message logs, and
//! answers rejected actions with `{"content": ...}` notices the way the real
//! server does.
//!
//! Timestamps come from a counter, so replies are deterministic.

use std::collections::{BTreeMap, BTreeSet};

use murmur_core::Roster;
use murmur_proto::{Member, Message, WireId};
use serde_json::{Value, json};

/// Reply to a frame the server does not understand. Not JSON.
pub const UNKNOWN_ACTION: &str = "Unknown action";

#[derive(Debug, Clone)]
struct Group {
    id: u64,
    admin: u64,
    members: BTreeSet<u64>,
    log: Vec<Message>,
}

impl Group {
    fn contains(&self, user: u64) -> bool {
        user == self.admin || self.members.contains(&user)
    }
}

/// Simulated chat server.
#[derive(Debug, Clone, Default)]
pub struct SimServer {
    users: BTreeMap<u64, String>,
    private: BTreeMap<(u64, u64), (u64, Vec<Message>)>,
    groups: BTreeMap<String, Group>,
    next_id: u64,
    clock: u64,
}

impl SimServer {
    /// Empty server.
    pub fn new() -> Self {
        Self { next_id: 1, ..Self::default() }
    }

    /// Server with four users and two groups:
    ///
    /// - `rust`: admin `alice`, member `bob`
    /// - `ops`: admin `bob`, members `alice` and `carol`
    pub fn seeded() -> Self {
        let mut server = Self::new();
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
            server.add_user(id, name);
        }
        server.create_group("rust", 1, &[2]);
        server.create_group("ops", 2, &[1, 3]);
        server
    }

    /// Register a user.
    pub fn add_user(&mut self, id: u64, username: &str) {
        self.users.insert(id, username.to_owned());
    }

    /// Create a group.
    pub fn create_group(&mut self, name: &str, admin: u64, members: &[u64]) {
        let id = self.allocate();
        self.groups.insert(name.to_owned(), Group {
            id,
            admin,
            members: members.iter().copied().collect(),
            log: Vec::new(),
        });
    }

    /// Every registered user.
    pub fn users(&self) -> Vec<Member> {
        self.users.iter().map(|(id, name)| Member::new(*id, name.clone())).collect()
    }

    /// Authoritative roster of `group` as seen by `viewer`, admin included.
    pub fn roster(&self, group: &str, viewer: &str) -> Option<Roster> {
        let group = self.groups.get(group)?;
        let mut ids: Vec<u64> = group.members.iter().copied().collect();
        if !ids.contains(&group.admin) {
            ids.push(group.admin);
        }

        let members = ids
            .into_iter()
            .filter_map(|id| self.users.get(&id).map(|name| Member::new(id, name.clone())))
            .collect();
        let is_admin = self.user_id(viewer) == Some(group.admin);
        Some(Roster::new(members, is_admin))
    }

    /// Message log of a group.
    pub fn group_log(&self, group: &str) -> Option<&[Message]> {
        self.groups.get(group).map(|g| g.log.as_slice())
    }

    /// Message log of the private chat between two users.
    pub fn private_log(&self, a: u64, b: u64) -> Option<&[Message]> {
        self.private.get(&pair(a, b)).map(|(_, log)| log.as_slice())
    }

    /// Process one inbound frame and return the replies, in send order.
    pub fn handle(&mut self, text: &str) -> Vec<String> {
        let Ok(frame) = serde_json::from_str::<Value>(text) else {
            return vec![UNKNOWN_ACTION.to_owned()];
        };
        let data = &frame["data"];

        let replies = match frame["action"].as_str() {
            Some("join_private_chat") => self.join_private(data),
            Some("send_private_message") => self.send_private(data),
            Some("join_group_chat") => self.join_group(data),
            Some("send_group_message") => self.send_group(data),
            Some("add_user_to_group_chat") => self.add_member(data),
            Some("remove_user_from_group_chat") => self.remove_member(data),
            _ => return vec![UNKNOWN_ACTION.to_owned()],
        };
        replies.into_iter().map(|v| v.to_string()).collect()
    }

    fn join_private(&mut self, data: &Value) -> Vec<Value> {
        let Some(me) = data["user1"]["username"].as_str().and_then(|u| self.user_id(u)) else {
            return vec![notice("Missing user information for private chat")];
        };
        let Some(other) = data["user2_id"].as_u64() else {
            return vec![notice("Missing user information for private chat")];
        };

        let key = pair(me, other);
        if !self.private.contains_key(&key) {
            let id = self.allocate();
            self.private.insert(key, (id, Vec::new()));
        }
        let (chat_id, log) = &self.private[&key];
        vec![json!({ "chat_id": chat_id, "history": log })]
    }

    fn send_private(&mut self, data: &Value) -> Vec<Value> {
        let Some(chat_id) = data["chat_id"].as_u64() else {
            return vec![notice("Missing chat_id")];
        };
        let Ok(message) = serde_json::from_value::<Message>(data["message"].clone()) else {
            return vec![notice("Missing message")];
        };
        let Some((_, log)) = self.private.values_mut().find(|(id, _)| *id == chat_id) else {
            return vec![notice("Chat not found")];
        };

        log.push(message.clone());
        vec![json!(message)]
    }

    fn join_group(&mut self, data: &Value) -> Vec<Value> {
        let user = data["user_name"].as_str().and_then(|u| self.user_id(u));
        let Some(group) = data["group_name"].as_str().and_then(|g| self.groups.get(g)) else {
            return vec![notice("Group not found")];
        };
        match user {
            Some(user) if group.contains(user) => {
                vec![json!({ "group_id": group.id, "history": group.log })]
            },
            _ => vec![notice("User is not a member of the group.")],
        }
    }

    fn send_group(&mut self, data: &Value) -> Vec<Value> {
        let sender = data["message"]["sender_username"].as_str().unwrap_or_default().to_owned();
        let content = data["message"]["content"].as_str().unwrap_or_default().to_owned();
        let Some(name) = data["group_id"].as_str() else {
            return vec![notice("Missing group_id or message for group chat")];
        };
        self.post(name, &sender, content)
            .map_or_else(|| vec![notice("User is not in the group. You can not send messages")], |m| {
                vec![json!(m)]
            })
    }

    fn add_member(&mut self, data: &Value) -> Vec<Value> {
        let adder = data["adder_name"].as_str().unwrap_or_default().to_owned();
        let Some(name) = data["group_name"].as_str() else {
            return vec![notice("Missing group")];
        };
        let Some(user) = wire_u64(&data["user_id"]).filter(|id| self.users.contains_key(id)) else {
            return vec![notice("User does not exist")];
        };
        let adder_id = self.user_id(&adder);
        let Some(group) = self.groups.get_mut(name) else {
            return vec![notice("Group chat does not exist")];
        };
        if !adder_id.is_some_and(|a| group.contains(a)) {
            return vec![notice("User is not in the group. You can not add another user to this group")];
        }

        group.members.insert(user);
        let added = self.users.get(&user).cloned().unwrap_or_default();
        let mut replies = Vec::new();
        if let Some(message) = self.post(name, &adder, format!("I added {added}")) {
            replies.push(json!(message));
        }
        replies.extend(self.roster_frame(name));
        replies
    }

    fn remove_member(&mut self, data: &Value) -> Vec<Value> {
        let admin = data["admin_name"].as_str().and_then(|a| self.user_id(a));
        let user = wire_u64(&data["user_id"]);
        let Some(name) = data["group_name"].as_str() else {
            return vec![notice("There is no such group")];
        };
        let Some(group) = self.groups.get_mut(name) else {
            return vec![notice("There is no such group")];
        };
        let Some(user) = user.filter(|u| group.members.contains(u)) else {
            return vec![notice("User is not in the group.")];
        };
        if admin != Some(group.admin) {
            return vec![notice("You are not the admin, you cannot delete users.")];
        }

        group.members.remove(&user);
        self.roster_frame(name).into_iter().collect()
    }

    fn roster_frame(&self, group: &str) -> Option<Value> {
        let roster = self.roster(group, "")?;
        Some(json!({ "group_name": group, "members": roster.members }))
    }

    fn post(&mut self, group: &str, sender: &str, content: String) -> Option<Message> {
        let sender_id = self.user_id(sender)?;
        let timestamp = self.tick();
        let group = self.groups.get_mut(group).filter(|g| g.contains(sender_id))?;

        let message = Message::new(sender, content, timestamp);
        group.log.push(message.clone());
        Some(message)
    }

    fn user_id(&self, username: &str) -> Option<u64> {
        self.users.iter().find(|(_, name)| name.as_str() == username).map(|(id, _)| *id)
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn tick(&mut self) -> String {
        self.clock += 1;
        format!("2024-01-01T00:00:{:02}.{:03}", (self.clock / 1000) % 60, self.clock % 1000)
    }
}

fn pair(a: u64, b: u64) -> (u64, u64) {
    (a.min(b), a.max(b))
}

fn notice(content: &str) -> Value {
    json!({ "content": content })
}

fn wire_u64(value: &Value) -> Option<u64> {
    serde_json::from_value::<WireId>(value.clone()).ok().and_then(|id| match id {
        WireId::Numeric(n) => Some(n),
        WireId::Text(s) => s.parse().ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(action: &str, data: Value) -> String {
        json!({ "action": action, "data": data, "access_token": "t", "csrf_token": "c" }).to_string()
    }

    #[test]
    fn private_join_creates_chat_once() {
        let mut server = SimServer::seeded();
        let join = frame("join_private_chat", json!({ "user1": {"username": "alice"}, "user2_id": 2 }));

        let first = server.handle(&join);
        let second = server.handle(&join);
        assert_eq!(first, second);
        assert!(first[0].contains(r#""history":[]"#));
    }

    #[test]
    fn group_send_is_echoed_and_logged() {
        let mut server = SimServer::seeded();
        let replies = server.handle(&frame(
            "send_group_message",
            json!({ "group_id": "rust", "message": {"sender_username": "bob", "content": "hi"} }),
        ));

        assert_eq!(replies.len(), 1);
        assert_eq!(server.group_log("rust").map(<[Message]>::len), Some(1));
    }

    #[test]
    fn outsider_cannot_join_or_post() {
        let mut server = SimServer::seeded();
        let join = server.handle(&frame("join_group_chat", json!({ "group_name": "rust", "user_name": "dave" })));
        assert_eq!(join, vec![r#"{"content":"User is not a member of the group."}"#.to_owned()]);

        let post = server.handle(&frame(
            "send_group_message",
            json!({ "group_id": "rust", "message": {"sender_username": "dave", "content": "x"} }),
        ));
        assert!(post[0].contains("You can not send messages"));
    }

    #[test]
    fn only_admin_removes() {
        let mut server = SimServer::seeded();
        let denied = server.handle(&frame(
            "remove_user_from_group_chat",
            json!({ "group_name": "ops", "user_id": 3, "admin_name": "alice" }),
        ));
        assert!(denied[0].contains("not the admin"));

        let removed = server.handle(&frame(
            "remove_user_from_group_chat",
            json!({ "group_name": "rust", "user_id": 2, "admin_name": "alice" }),
        ));
        assert!(removed[0].contains(r#""members""#));
        assert_eq!(server.roster("rust", "alice").map(|r| r.members), Some(vec![Member::new(1, "alice")]));
    }

    #[test]
    fn add_posts_announcement_then_roster() {
        let mut server = SimServer::seeded();
        let replies = server.handle(&frame(
            "add_user_to_group_chat",
            json!({ "group_name": "rust", "user_id": 4, "adder_name": "alice" }),
        ));

        assert_eq!(replies.len(), 2);
        assert!(replies[0].contains("I added dave"));
        assert!(replies[1].contains("dave"));
    }

    #[test]
    fn join_then_add_frames() {
        let mut server = SimServer::seeded();
        let mut replies =
            server.handle(&frame("join_group_chat", json!({ "group_name": "rust", "user_name": "alice" })));
        replies.extend(server.handle(&frame(
            "add_user_to_group_chat",
            json!({ "group_name": "rust", "user_id": 4, "adder_name": "alice" }),
        )));

        insta::assert_snapshot!(replies.join("\n"), @r#"
        {"group_id":1,"history":[]}
        {"content":"I added dave","sender_username":"alice","timestamp":"2024-01-01T00:00:00.001"}
        {"group_name":"rust","members":[{"id":2,"username":"bob"},{"id":4,"username":"dave"},{"id":1,"username":"alice"}]}
        "#);
    }

    #[test]
    fn garbage_gets_plain_text_reply() {
        let mut server = SimServer::seeded();
        assert_eq!(server.handle("not json"), vec![UNKNOWN_ACTION.to_owned()]);
        assert_eq!(server.handle(&frame("fly", json!({}))), vec![UNKNOWN_ACTION.to_owned()]);
    }
}
