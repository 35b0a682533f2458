//! Strongly-typed identifiers used across the workspace.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IdError, IdResult};

/// Stable identifier of an authenticated subject (user name, service account, ...).
///
/// Subjects are opaque strings chosen by the credential store. The only
/// constraints enforced here are: non-empty, and no control characters (these
/// would let a subject forge log lines in audit output).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(value: impl Into<String>) -> IdResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdError::Empty("SubjectId"));
        }
        if let Some(found) = value.chars().find(|c| c.is_control()) {
            return Err(IdError::InvalidCharacter {
                kind: "SubjectId",
                found,
            });
        }
        Ok(Self(value))
    }

    /// Placeholder subject that no credential store should ever hand out.
    pub fn anonymous() -> Self {
        Self(String::from("anonymous"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SubjectId {
    type Error = IdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.0
    }
}

impl FromStr for SubjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl PartialEq<str> for SubjectId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SubjectId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Unique identifier of an issued token (the `jti` claim).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(Uuid);

impl TokenId {
    /// Fresh time-ordered (UUIDv7) id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TokenId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for TokenId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for TokenId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for TokenId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self).map_err(|e| IdError::Malformed {
            kind: "TokenId",
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_rejects_empty_and_blank() {
        assert_eq!(SubjectId::new(""), Err(IdError::Empty("SubjectId")));
        assert_eq!(SubjectId::new("   "), Err(IdError::Empty("SubjectId")));
    }

    #[test]
    fn subject_rejects_control_characters() {
        let err = SubjectId::new("alice\nadmin").unwrap_err();
        assert_eq!(
            err,
            IdError::InvalidCharacter {
                kind: "SubjectId",
                found: '\n'
            }
        );
    }

    #[test]
    fn subject_serde_is_a_plain_string_and_validates() {
        let subject = SubjectId::new("alice").unwrap();
        let json = serde_json::to_string(&subject).unwrap();
        assert_eq!(json, "\"alice\"");

        let back: SubjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, subject);

        assert!(serde_json::from_str::<SubjectId>("\"\"").is_err());
    }

    #[test]
    fn token_id_parses_its_display_form() {
        let id = TokenId::new();
        let parsed: TokenId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        let err = "not-a-uuid".parse::<TokenId>().unwrap_err();
        assert!(matches!(err, IdError::Malformed { kind: "TokenId", .. }));
    }
}
