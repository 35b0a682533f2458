use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A granted authority: a role (`ROLE_ADMIN`) or a permission (`order.read`).
///
/// Authorities are opaque strings at this layer. The special wildcard `"*"`
/// satisfies every `hasAuthority(..)` check but never a role check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(Cow<'static, str>);

impl Authority {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Authority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Authority {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Authority {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
