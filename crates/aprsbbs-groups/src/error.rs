//! Error types for the group layer.
//!
//! The `Display` text of every variant is the exact reply sent back to
//! the station that issued the command.

use crate::GroupName;

/// Errors that can occur during group operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    /// `create` on a name that is already taken.
    #[error("Group '{0}' already exists.")]
    DuplicateGroup(GroupName),

    /// `join` or `msg` on a group nobody has created.
    #[error("Group '{0}' does not exist.")]
    NoSuchGroup(GroupName),

    /// `join` by a station that is already in the group.
    #[error("You are already a member of '{0}'.")]
    AlreadyMember(GroupName),

    /// `leave` by a station that is not in the group (or no such group).
    #[error("You are not a member of '{0}'.")]
    NotMember(GroupName),

    /// The name is empty or contains whitespace.
    #[error("Invalid group name '{0}'.")]
    InvalidName(String),
}
