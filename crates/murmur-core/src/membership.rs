//! Group rosters with optimistic local mutation.
//!
//! Local add/remove requests take effect immediately as tentative entries.
//! The next authoritative snapshot replaces the whole roster, so tentative
//! state never outlives a refresh: no duplicates, and nothing removed by the
//! server comes back.

use std::collections::{HashMap, HashSet};

use murmur_proto::{Member, WireId};

/// Confirmation status of a roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Present in the last authoritative snapshot
    Confirmed,
    /// Added locally, not yet confirmed
    PendingAdd,
    /// Confirmed member removed locally, not yet confirmed
    PendingRemove,
}

/// One roster row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// The member
    pub member: Member,
    /// Confirmation status
    pub status: EntryStatus,
}

/// Authoritative roster, as delivered by a snapshot frame or a directory
/// refresh.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roster {
    /// Every member, admin included
    pub members: Vec<Member>,
    /// Viewer's admin flag. `None` leaves the previous flag unchanged.
    pub is_self_admin: Option<bool>,
}

impl Roster {
    /// Roster with a known admin flag.
    pub fn new(members: Vec<Member>, is_self_admin: bool) -> Self {
        Self { members, is_self_admin: Some(is_self_admin) }
    }
}

impl From<murmur_proto::RosterSnapshot> for Roster {
    fn from(snapshot: murmur_proto::RosterSnapshot) -> Self {
        Self { members: snapshot.members, is_self_admin: snapshot.admin }
    }
}

#[derive(Debug, Clone, Default)]
struct GroupRoster {
    entries: Vec<RosterEntry>,
    is_self_admin: bool,
}

impl GroupRoster {
    fn position(&self, user_id: &WireId) -> Option<usize> {
        self.entries.iter().position(|e| &e.member.id == user_id)
    }
}

/// Rosters for every group the viewer has looked at.
#[derive(Debug, Clone, Default)]
pub struct MembershipTracker {
    groups: HashMap<String, GroupRoster>,
}

impl MembershipTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the group's roster with authoritative state.
    ///
    /// Drops every tentative entry. Duplicate ids in `roster` keep their first
    /// occurrence.
    pub fn snapshot(&mut self, group: &str, roster: Roster) {
        let group_roster = self.groups.entry(group.to_owned()).or_default();

        let mut seen = HashSet::new();
        group_roster.entries = roster
            .members
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .map(|member| RosterEntry { member, status: EntryStatus::Confirmed })
            .collect();

        if let Some(admin) = roster.is_self_admin {
            group_roster.is_self_admin = admin;
        }
    }

    /// Record a locally requested add.
    ///
    /// Idempotent: adding a visible member does nothing; adding a member with a
    /// pending removal cancels the removal.
    pub fn apply_local_add(&mut self, group: &str, member: Member) {
        let group_roster = self.groups.entry(group.to_owned()).or_default();

        match group_roster.position(&member.id) {
            Some(i) => {
                let entry = &mut group_roster.entries[i];
                if entry.status == EntryStatus::PendingRemove {
                    entry.status = EntryStatus::Confirmed;
                }
            },
            None => group_roster
                .entries
                .push(RosterEntry { member, status: EntryStatus::PendingAdd }),
        }
    }

    /// Record a locally requested removal.
    ///
    /// A pending add is withdrawn outright; a confirmed member is hidden until
    /// the next snapshot. Unknown ids are ignored.
    pub fn apply_local_remove(&mut self, group: &str, user_id: &WireId) {
        let Some(group_roster) = self.groups.get_mut(group) else {
            return;
        };
        let Some(i) = group_roster.position(user_id) else {
            return;
        };

        match group_roster.entries[i].status {
            EntryStatus::PendingAdd => {
                group_roster.entries.remove(i);
            },
            EntryStatus::Confirmed => group_roster.entries[i].status = EntryStatus::PendingRemove,
            EntryStatus::PendingRemove => {},
        }
    }

    /// Whether the viewer administers the group, per the last snapshot.
    pub fn is_admin(&self, group: &str) -> bool {
        self.groups.get(group).is_some_and(|g| g.is_self_admin)
    }

    /// Members as the viewer should see them: confirmed plus pending adds.
    pub fn members(&self, group: &str) -> Vec<&Member> {
        self.entries(group)
            .iter()
            .filter(|e| e.status != EntryStatus::PendingRemove)
            .map(|e| &e.member)
            .collect()
    }

    /// Every entry with its status, including pending removals.
    pub fn entries(&self, group: &str) -> &[RosterEntry] {
        self.groups.get(group).map(|g| g.entries.as_slice()).unwrap_or(&[])
    }

    /// Users from `all_users` who are not visible in the group: the
    /// candidates for an add.
    pub fn available_users<'a>(
        &self,
        group: &str,
        all_users: &'a [Member],
    ) -> Vec<&'a Member> {
        let visible: HashSet<&WireId> = self.members(group).into_iter().map(|m| &m.id).collect();
        all_users.iter().filter(|u| !visible.contains(&u.id)).collect()
    }

    /// Forget a group.
    pub fn clear(&mut self, group: &str) {
        self.groups.remove(group);
    }

    /// Groups with a tracked roster.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Member {
        Member::new(1, "alice")
    }

    fn bob() -> Member {
        Member::new(2, "bob")
    }

    fn carol() -> Member {
        Member::new(3, "carol")
    }

    #[test]
    fn optimistic_add_is_dropped_by_snapshot_without_it() {
        let mut tracker = MembershipTracker::new();
        tracker.snapshot("g", Roster::new(vec![alice()], true));
        tracker.apply_local_add("g", bob());
        assert_eq!(tracker.members("g"), vec![&alice(), &bob()]);

        tracker.snapshot("g", Roster::new(vec![alice()], true));
        assert_eq!(tracker.members("g"), vec![&alice()]);
    }

    #[test]
    fn confirmed_add_is_not_duplicated() {
        let mut tracker = MembershipTracker::new();
        tracker.apply_local_add("g", bob());
        tracker.apply_local_add("g", bob());
        tracker.snapshot("g", Roster::new(vec![alice(), bob()], false));

        assert_eq!(tracker.members("g"), vec![&alice(), &bob()]);
        assert!(tracker.entries("g").iter().all(|e| e.status == EntryStatus::Confirmed));
    }

    #[test]
    fn confirmed_removal_does_not_resurrect() {
        let mut tracker = MembershipTracker::new();
        tracker.snapshot("g", Roster::new(vec![alice(), bob()], true));
        tracker.apply_local_remove("g", &bob().id);
        assert_eq!(tracker.members("g"), vec![&alice()]);
        assert_eq!(tracker.entries("g")[1].status, EntryStatus::PendingRemove);

        tracker.snapshot("g", Roster::new(vec![alice()], true));
        tracker.apply_local_remove("g", &bob().id);
        assert_eq!(tracker.members("g"), vec![&alice()]);
        assert_eq!(tracker.entries("g").len(), 1);
    }

    #[test]
    fn removing_pending_add_withdraws_it() {
        let mut tracker = MembershipTracker::new();
        tracker.apply_local_add("g", carol());
        tracker.apply_local_remove("g", &carol().id);
        assert!(tracker.entries("g").is_empty());
    }

    #[test]
    fn admin_flag_comes_from_snapshot_only() {
        let mut tracker = MembershipTracker::new();
        assert!(!tracker.is_admin("g"));

        tracker.snapshot("g", Roster::new(vec![alice()], true));
        tracker.apply_local_add("g", bob());
        assert!(tracker.is_admin("g"));

        tracker.snapshot("g", Roster { members: vec![alice()], is_self_admin: None });
        assert!(tracker.is_admin("g"));

        tracker.snapshot("g", Roster::new(vec![alice()], false));
        assert!(!tracker.is_admin("g"));
    }

    #[test]
    fn available_users_excludes_visible_members() {
        let mut tracker = MembershipTracker::new();
        tracker.snapshot("g", Roster::new(vec![alice(), bob()], true));
        tracker.apply_local_remove("g", &bob().id);

        let everyone = vec![alice(), bob(), carol()];
        assert_eq!(tracker.available_users("g", &everyone), vec![&bob(), &carol()]);
    }

    #[test]
    fn snapshot_drops_duplicate_ids() {
        let mut tracker = MembershipTracker::new();
        tracker.snapshot("g", Roster::new(vec![alice(), alice(), bob()], false));
        assert_eq!(tracker.entries("g").len(), 2);
    }
}
