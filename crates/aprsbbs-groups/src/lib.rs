//! # aprsbbs-groups
//!
//! Named chat groups for the BBS. A group is a set of stations that
//! receive every `group msg` sent to it.
//!
//! ```text
//! GroupRegistry
//!  ├── "ops"   → { IZ1ABC, K1XYZ-7 }
//!  └── "swap"  → { N2QQQ }
//! ```
//!
//! Membership lives in memory only and is lost on restart. A group
//! disappears when its last member leaves.

mod error;
mod registry;

pub use error::GroupError;
pub use registry::GroupRegistry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A group name, compared case-insensitively (stored lower-cased).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupName(String);

impl GroupName {
    /// Longest accepted name, in characters.
    pub const MAX_LEN: usize = 20;

    /// Validates a name: non-empty, no whitespace, at most
    /// [`MAX_LEN`](Self::MAX_LEN) characters.
    pub fn new(raw: &str) -> Result<Self, GroupError> {
        if raw.is_empty()
            || raw.contains(char::is_whitespace)
            || raw.chars().count() > Self::MAX_LEN
        {
            return Err(GroupError::InvalidName(raw.to_string()));
        }
        Ok(Self(raw.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GroupName {
    type Err = GroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GroupName {
    type Error = GroupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<GroupName> for String {
    fn from(name: GroupName) -> Self {
        name.0
    }
}
