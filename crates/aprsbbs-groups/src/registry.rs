//! Group registry: creates groups and tracks who is in each one.

use std::collections::{BTreeSet, HashMap};

use aprsbbs_protocol::Identity;

use crate::{GroupError, GroupName};

/// All live groups and their members.
///
/// Not synchronized; the gateway keeps it behind one mutex so each call
/// is atomic with respect to the other tasks.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<GroupName, BTreeSet<Identity>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group with `creator` as its only member.
    pub fn create(&mut self, name: &GroupName, creator: &Identity) -> Result<(), GroupError> {
        if self.groups.contains_key(name) {
            return Err(GroupError::DuplicateGroup(name.clone()));
        }
        self.groups
            .insert(name.clone(), BTreeSet::from([creator.clone()]));
        tracing::info!(group = %name, %creator, "group created");
        Ok(())
    }

    /// Adds `member` to an existing group.
    pub fn join(&mut self, name: &GroupName, member: &Identity) -> Result<(), GroupError> {
        let members = self
            .groups
            .get_mut(name)
            .ok_or_else(|| GroupError::NoSuchGroup(name.clone()))?;
        if !members.insert(member.clone()) {
            return Err(GroupError::AlreadyMember(name.clone()));
        }
        tracing::debug!(group = %name, %member, size = members.len(), "member joined");
        Ok(())
    }

    /// Removes `member` from a group. The group is dropped once empty.
    ///
    /// Leaving a group that does not exist reports [`GroupError::NotMember`]
    /// too: from the caller's side both cases mean "you are not in it".
    pub fn leave(&mut self, name: &GroupName, member: &Identity) -> Result<(), GroupError> {
        let members = self
            .groups
            .get_mut(name)
            .filter(|members| members.contains(member))
            .ok_or_else(|| GroupError::NotMember(name.clone()))?;
        members.remove(member);
        tracing::debug!(group = %name, %member, size = members.len(), "member left");

        if members.is_empty() {
            self.groups.remove(name);
            tracing::info!(group = %name, "group removed (no members left)");
        }
        Ok(())
    }

    /// Members of a group, in call-sign order.
    pub fn members(&self, name: &GroupName) -> Result<Vec<Identity>, GroupError> {
        self.groups
            .get(name)
            .map(|members| members.iter().cloned().collect())
            .ok_or_else(|| GroupError::NoSuchGroup(name.clone()))
    }

    pub fn exists(&self, name: &GroupName) -> bool {
        self.groups.contains_key(name)
    }

    pub fn is_member(&self, name: &GroupName, who: &Identity) -> bool {
        self.groups
            .get(name)
            .is_some_and(|members| members.contains(who))
    }

    /// Number of live groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
