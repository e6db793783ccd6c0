//! Result shapes of the request/response directory endpoints.
//!
//! These are consumed around the channel lifecycle (user lists for context
//! construction, member lists and admin status for roster refresh). They are
//! plain data; the HTTP client lives in `murmur-client`.

use serde::{Deserialize, Serialize};

use crate::{Member, WireId};

/// One entry of `GET /users/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User id.
    pub id: WireId,
    /// Username.
    pub username: String,
    /// Email address, when the endpoint includes it.
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserRecord> for Member {
    fn from(record: UserRecord) -> Self {
        Self { id: record.id, username: record.username }
    }
}

/// Body of `GET /all_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    /// Every registered user.
    pub users: Vec<Member>,
}

/// One entry of `GET /groups/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group name (unique server-wide).
    pub group_name: String,
}

/// Body of `POST /group_create/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    /// Name for the new group.
    pub group_name: String,
    /// Username that becomes the group admin.
    pub admin_username: String,
}

/// Response of `POST /group_create/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCreated {
    /// Server status text.
    pub message: String,
    /// Name of the created group.
    pub group_name: String,
    /// Admin username.
    pub admin_user: String,
}

/// Response of `GET /group/{name}/members`.
///
/// The server reports an unknown group as `{"error": ...}` with a success
/// status, so both shapes are accepted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupMembersResponse {
    /// Member list (admin included).
    Members {
        /// Group name.
        group_name: String,
        /// Members.
        members: Vec<Member>,
    },
    /// Lookup failure.
    Error {
        /// Server error text.
        error: String,
    },
}

/// Response of `GET /{group}/check_admin/{username}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStatus {
    /// Whether the user administers the group.
    pub admin: bool,
}

/// Body of `POST /groups/{group}/add_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddUserRequest {
    /// User being added.
    pub user_id: WireId,
    /// Id of the member performing the add.
    pub adder_id: WireId,
}

/// Generic `{message}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Server status text.
    #[serde(alias = "msg")]
    pub message: String,
}

/// FastAPI-style error body (`{"detail": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Server-provided detail text.
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_response_accepts_both_shapes() {
        let ok: GroupMembersResponse = serde_json::from_str(
            r#"{"group_name":"rust","members":[{"id":1,"username":"alice"}]}"#,
        )
        .unwrap();
        assert!(matches!(ok, GroupMembersResponse::Members { ref members, .. } if members.len() == 1));

        let err: GroupMembersResponse =
            serde_json::from_str(r#"{"error":"Group not found"}"#).unwrap();
        assert_eq!(err, GroupMembersResponse::Error { error: "Group not found".into() });
    }

    #[test]
    fn user_record_converts_to_member() {
        let record: UserRecord =
            serde_json::from_str(r#"{"username":"bob","email":"b@x.io","id":2}"#).unwrap();
        assert_eq!(Member::from(record), Member::new(2, "bob"));
    }
}
