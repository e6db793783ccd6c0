//! REST implementation of [`Directory`].
//!
//! Every request carries the current credentials as `Authorization: Bearer`
//! and `X-CSRF-TOKEN`, read fresh from the [`CredentialSource`] per call.

use murmur_core::CredentialSource;
use murmur_proto::{
    Member, WireId,
    payloads::directory::{
        Acknowledgement, AddUserRequest, AdminStatus, CreateGroupRequest, ErrorDetail,
        GroupCreated, GroupMembersResponse, GroupSummary, UserList, UserRecord,
    },
};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{config::ClientConfig, directory::Directory, error::DirectoryError};

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Directory backed by the server's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpDirectory<A: CredentialSource> {
    client: Client,
    base: Url,
    credentials: A,
}

impl<A: CredentialSource> HttpDirectory<A> {
    /// Create a directory client for `config.server_url`.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::InvalidUrl` if the server URL does not parse
    /// or cannot carry a path.
    pub fn new(config: &ClientConfig, credentials: A) -> Result<Self, DirectoryError> {
        let base = Url::parse(config.http_base())
            .map_err(|e| DirectoryError::InvalidUrl(format!("{}: {e}", config.http_base())))?;
        if base.cannot_be_a_base() {
            return Err(DirectoryError::InvalidUrl(base.to_string()));
        }
        Ok(Self { client: Client::new(), base, credentials })
    }

    /// Base URL plus percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Result<Url, DirectoryError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| DirectoryError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DirectoryError> {
        let credentials = self.credentials.complete().ok_or(DirectoryError::AuthMissing)?;

        let response = request
            .bearer_auth(credentials.access_token())
            .header(CSRF_HEADER, credentials.anti_forgery_token())
            .send()
            .await
            .map_err(|e| DirectoryError::Http(e.to_string()))?;

        let status = response.status();
        debug!(url = %response.url(), %status, "directory response");

        if !status.is_success() {
            let detail = match response.json::<ErrorDetail>().await {
                Ok(body) => body.detail,
                Err(_) => status.canonical_reason().unwrap_or_default().to_owned(),
            };
            warn!(%status, %detail, "directory request rejected");
            return Err(DirectoryError::Status { status: status.as_u16(), detail });
        }

        response.json::<T>().await.map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

impl<A: CredentialSource> Directory for HttpDirectory<A> {
    async fn list_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let url = self.url(&["users", ""])?;
        self.send(self.client.get(url)).await
    }

    async fn all_users(&self) -> Result<Vec<Member>, DirectoryError> {
        let url = self.url(&["all_user"])?;
        let list: UserList = self.send(self.client.get(url)).await?;
        Ok(list.users)
    }

    async fn list_groups(&self) -> Result<Vec<GroupSummary>, DirectoryError> {
        let url = self.url(&["groups", ""])?;
        self.send(self.client.get(url)).await
    }

    async fn create_group(
        &self,
        group_name: &str,
        admin_username: &str,
    ) -> Result<GroupCreated, DirectoryError> {
        let url = self.url(&["group_create", ""])?;
        let body = CreateGroupRequest {
            group_name: group_name.to_owned(),
            admin_username: admin_username.to_owned(),
        };
        self.send(self.client.post(url).json(&body)).await
    }

    async fn delete_group(
        &self,
        group_name: &str,
        admin_username: &str,
    ) -> Result<Acknowledgement, DirectoryError> {
        let url = self.url(&["group", group_name, "delete", admin_username])?;
        self.send(self.client.delete(url)).await
    }

    async fn group_members(&self, group_name: &str) -> Result<Vec<Member>, DirectoryError> {
        let url = self.url(&["group", group_name, "members"])?;
        match self.send(self.client.get(url)).await? {
            GroupMembersResponse::Members { members, .. } => Ok(members),
            GroupMembersResponse::Error { error } => {
                Err(DirectoryError::NotFound(format!("{group_name}: {error}")))
            },
        }
    }

    async fn check_admin(&self, group_name: &str, username: &str) -> Result<bool, DirectoryError> {
        let url = self.url(&[group_name, "check_admin", username])?;
        let status: AdminStatus = self.send(self.client.get(url)).await?;
        Ok(status.admin)
    }

    async fn add_user_to_group(
        &self,
        group_id: &WireId,
        user_id: &WireId,
        adder_id: &WireId,
    ) -> Result<Acknowledgement, DirectoryError> {
        let group_id = group_id.to_string();
        let url = self.url(&["groups", &group_id, "add_user"])?;
        let body = AddUserRequest { user_id: user_id.clone(), adder_id: adder_id.clone() };
        self.send(self.client.post(url).json(&body)).await
    }
}
