//! Request/response directory: users, groups, rosters.
//!
//! Directory calls sit around the channel lifecycle. They are used to pick a
//! chat context and to fetch the authoritative roster of a group, which is
//! then fed to the runtime as a [`Command::RefreshRoster`].
//!
//! [`Command::RefreshRoster`]: crate::Command::RefreshRoster

use std::future::Future;

use murmur_core::Roster;
use murmur_proto::{
    Member, WireId,
    payloads::directory::{Acknowledgement, GroupCreated, GroupSummary, UserRecord},
};
use tracing::debug;

use crate::error::DirectoryError;

/// Directory operations.
///
/// # Implementations
///
/// - [`HttpDirectory`](crate::HttpDirectory): REST client (feature
///   `transport`)
/// - In-memory fakes in tests
pub trait Directory: Send + Sync {
    /// Every registered user, with email when the server includes it.
    fn list_users(&self) -> impl Future<Output = Result<Vec<UserRecord>, DirectoryError>> + Send;

    /// Every registered user as `{id, username}`.
    fn all_users(&self) -> impl Future<Output = Result<Vec<Member>, DirectoryError>> + Send;

    /// Every group.
    fn list_groups(&self) -> impl Future<Output = Result<Vec<GroupSummary>, DirectoryError>> + Send;

    /// Create a group administered by `admin_username`.
    fn create_group(
        &self,
        group_name: &str,
        admin_username: &str,
    ) -> impl Future<Output = Result<GroupCreated, DirectoryError>> + Send;

    /// Delete a group. The server checks that `admin_username` administers it.
    fn delete_group(
        &self,
        group_name: &str,
        admin_username: &str,
    ) -> impl Future<Output = Result<Acknowledgement, DirectoryError>> + Send;

    /// Members of a group, admin included.
    ///
    /// # Errors
    ///
    /// `DirectoryError::NotFound` if the server does not know the group.
    fn group_members(
        &self,
        group_name: &str,
    ) -> impl Future<Output = Result<Vec<Member>, DirectoryError>> + Send;

    /// Whether `username` administers `group_name`.
    fn check_admin(
        &self,
        group_name: &str,
        username: &str,
    ) -> impl Future<Output = Result<bool, DirectoryError>> + Send;

    /// Add a user to a group outside of a channel.
    fn add_user_to_group(
        &self,
        group_id: &WireId,
        user_id: &WireId,
        adder_id: &WireId,
    ) -> impl Future<Output = Result<Acknowledgement, DirectoryError>> + Send;
}

/// Fetch the authoritative roster of `group_name` as seen by `self_identity`.
///
/// # Errors
///
/// Propagates the first failing directory call.
pub async fn refresh_roster<D: Directory>(
    directory: &D,
    group_name: &str,
    self_identity: &str,
) -> Result<Roster, DirectoryError> {
    let members = directory.group_members(group_name).await?;
    let is_self_admin = directory.check_admin(group_name, self_identity).await?;

    debug!(group_name, members = members.len(), is_self_admin, "roster fetched");
    Ok(Roster::new(members, is_self_admin))
}
