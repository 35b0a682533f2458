use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Authority;

/// Default prefix that distinguishes role authorities from plain permissions.
pub const DEFAULT_ROLE_PREFIX: &str = "ROLE_";

/// Role name used by `hasRole(..)` checks.
///
/// A role is granted when the principal holds either the bare role name or the
/// role name with the configured prefix (`ADMIN` matches `ADMIN` and `ROLE_ADMIN`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `authority` grants this role under `prefix`.
    pub fn is_granted_by(&self, authority: &Authority, prefix: &str) -> bool {
        let held = authority.as_str();
        if held == self.as_str() {
            return true;
        }
        if prefix.is_empty() {
            return false;
        }
        held.strip_prefix(prefix) == Some(self.as_str())
            || self.as_str().strip_prefix(prefix) == Some(held)
    }

    /// The authority string this role is stored as under `prefix`.
    pub fn to_authority(&self, prefix: &str) -> Authority {
        if prefix.is_empty() || self.as_str().starts_with(prefix) {
            Authority::new(self.as_str().to_owned())
        } else {
            Authority::new(format!("{prefix}{}", self.as_str()))
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_and_bare_forms_match() {
        let prefixed = Authority::new("ROLE_ADMIN");
        assert!(Role::new("ADMIN").is_granted_by(&prefixed, DEFAULT_ROLE_PREFIX));
        assert!(Role::new("ROLE_ADMIN").is_granted_by(&prefixed, DEFAULT_ROLE_PREFIX));

        let bare = Authority::new("ADMIN");
        assert!(Role::new("ROLE_ADMIN").is_granted_by(&bare, DEFAULT_ROLE_PREFIX));
    }

    #[test]
    fn different_roles_do_not_match() {
        let held = Authority::new("ROLE_ADMIN");
        assert!(!Role::new("USER").is_granted_by(&held, DEFAULT_ROLE_PREFIX));
        assert!(!Role::new("ROLE_USER").is_granted_by(&held, DEFAULT_ROLE_PREFIX));
        // Without a prefix only exact matches count.
        assert!(!Role::new("ADMIN").is_granted_by(&held, ""));
    }

    #[test]
    fn to_authority_adds_prefix_once() {
        assert_eq!(Role::new("ADMIN").to_authority("ROLE_").as_str(), "ROLE_ADMIN");
        assert_eq!(Role::new("ROLE_ADMIN").to_authority("ROLE_").as_str(), "ROLE_ADMIN");
        assert_eq!(Role::new("ADMIN").to_authority("").as_str(), "ADMIN");
    }
}
