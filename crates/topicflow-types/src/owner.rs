//! Owner (tenant) identifiers.
//!
//! Every topic record, cursor and message belongs to exactly one owner.
//! Owner ids are embedded in storage keys as `{prefix}:{owner}:...`, so the
//! `:` separator is never allowed inside an owner id.

use serde::{Deserialize, Serialize};

use crate::error::TopicFlowError;

/// Maximum accepted owner id length.
pub const MAX_OWNER_LEN: usize = 128;

/// A validated owner identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Parse and validate an owner id.
    pub fn parse(raw: &str) -> Result<Self, TopicFlowError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TopicFlowError::InvalidOwner("owner id is empty".to_string()));
        }
        if trimmed.len() > MAX_OWNER_LEN {
            return Err(TopicFlowError::InvalidOwner(format!(
                "owner id longer than {} characters",
                MAX_OWNER_LEN
            )));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@')))
        {
            return Err(TopicFlowError::InvalidOwner(format!(
                "owner id contains forbidden character {:?}",
                bad
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parse an optional owner id, rejecting `None`.
    pub fn require(raw: Option<&str>) -> Result<Self, TopicFlowError> {
        match raw {
            Some(value) => Self::parse(value),
            None => Err(TopicFlowError::InvalidOwner("owner id is missing".to_string())),
        }
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = TopicFlowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerId> for String {
    fn from(owner: OwnerId) -> Self {
        owner.0
    }
}

impl AsRef<str> for OwnerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
