use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use warden_core::SubjectId;

use crate::{AuthError, AuthResult, Authority, Credential, Principal};

use super::CredentialProvider;

/// Credential record as held by the external credential store.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub subject: SubjectId,
    /// Opaque one-way hash; only the [`SecretMatcher`] understands its format.
    pub secret_hash: SecretString,
    pub authorities: Vec<Authority>,
    /// Disabled records never authenticate.
    pub enabled: bool,
}

impl StoredCredential {
    pub fn new<I, A>(subject: SubjectId, secret_hash: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Authority>,
    {
        Self {
            subject,
            secret_hash: SecretString::from(secret_hash.into()),
            authorities: authorities.into_iter().map(Into::into).collect(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// The credential store failed (as opposed to "not found").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("credential lookup failed: {0}")]
pub struct LookupError(pub String);

/// Resolves an identifier to its stored credential.
///
/// Implemented outside this crate (database, directory, ...). May suspend.
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    async fn lookup(&self, identifier: &str) -> Result<Option<StoredCredential>, LookupError>;
}

/// One-way compare of a presented secret against a stored hash.
pub trait SecretMatcher: Send + Sync {
    fn matches(&self, presented: &SecretString, stored: &StoredCredential) -> bool;
}

/// Verifies identifier/secret pairs against an external credential store.
pub struct PasswordProvider {
    lookup: Arc<dyn CredentialLookup>,
    matcher: Arc<dyn SecretMatcher>,
    decoy: StoredCredential,
}

impl PasswordProvider {
    /// Uses a placeholder decoy; prefer [`PasswordProvider::with_decoy`] with a
    /// hash the matcher can actually verify.
    pub fn new(lookup: Arc<dyn CredentialLookup>, matcher: Arc<dyn SecretMatcher>) -> Self {
        // Compared against when the identifier is unknown, so both paths run the matcher.
        let decoy = StoredCredential {
            subject: SubjectId::anonymous(),
            secret_hash: SecretString::from(String::from("$decoy$")),
            authorities: Vec::new(),
            enabled: false,
        };
        Self {
            lookup,
            matcher,
            decoy,
        }
    }

    /// Replace the record matched against for unknown identifiers. The
    /// matcher's answer for it is ignored.
    pub fn with_decoy(mut self, decoy: StoredCredential) -> Self {
        self.decoy = decoy;
        self
    }
}

#[async_trait]
impl CredentialProvider for PasswordProvider {
    fn name(&self) -> &'static str {
        "password"
    }

    fn supports(&self, credential: &Credential) -> bool {
        matches!(credential, Credential::Password { .. })
    }

    async fn authenticate(&self, credential: &Credential) -> AuthResult<Principal> {
        let Credential::Password { identifier, secret } = credential else {
            return Err(AuthError::UnsupportedCredential);
        };

        let stored = self
            .lookup
            .lookup(identifier)
            .await
            .map_err(|e| AuthError::unavailable(e.0))?;

        let Some(stored) = stored else {
            let _ = self.matcher.matches(secret, &self.decoy);
            tracing::debug!(provider = self.name(), "unknown identifier");
            return Err(AuthError::BadCredentials);
        };

        if !self.matcher.matches(secret, &stored) {
            tracing::debug!(provider = self.name(), subject = %stored.subject, "secret mismatch");
            return Err(AuthError::BadCredentials);
        }
        if !stored.enabled {
            tracing::debug!(provider = self.name(), subject = %stored.subject, "credential disabled");
            return Err(AuthError::BadCredentials);
        }

        Ok(Principal::new(stored.subject, stored.authorities))
    }
}
