use secrecy::{ExposeSecret, SecretString};

/// Proof of identity presented by a caller for one authentication attempt.
///
/// Built by the transport layer from already-extracted strings (a decoded
/// `Basic` pair or a bearer token). Secrets are redacted from `Debug`.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Identifier + secret pair.
    Password {
        identifier: String,
        secret: SecretString,
    },
    /// Previously issued token.
    Bearer(SecretString),
}

/// Shape of a credential, safe to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Password,
    Bearer,
}

impl core::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CredentialKind::Password => f.write_str("password"),
            CredentialKind::Bearer => f.write_str("bearer"),
        }
    }
}

impl Credential {
    pub fn password(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Password {
            identifier: identifier.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(SecretString::from(token.into()))
    }

    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::Password { .. } => CredentialKind::Password,
            Credential::Bearer(_) => CredentialKind::Bearer,
        }
    }

    pub(crate) fn bearer_token(&self) -> Option<&str> {
        match self {
            Credential::Bearer(token) => Some(token.expose_secret()),
            Credential::Password { .. } => None,
        }
    }
}
