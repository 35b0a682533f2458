//! Pluggable credential verifiers.
//!
//! Each provider handles exactly one credential shape. The
//! [`AuthenticationManager`](crate::AuthenticationManager) tries providers in a
//! fixed order and only ever invokes the first one that supports a credential.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{AuthResult, Credential, Principal};

mod password;
mod store;
mod token;

pub use password::{CredentialLookup, LookupError, PasswordProvider, SecretMatcher, StoredCredential};
pub use store::InMemoryCredentialStore;
pub use token::TokenProvider;

/// A credential verifier.
///
/// Implementations hold no per-call mutable state: `authenticate` may be called
/// concurrently from many units of work.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short stable name for logs.
    fn name(&self) -> &'static str;

    fn supports(&self, credential: &Credential) -> bool;

    /// Verify `credential`.
    ///
    /// Fails with `BadCredentials` when the credential is rejected and
    /// `ProviderUnavailable` when a dependency is down. The returned principal is
    /// not yet marked authenticated; the manager does that.
    async fn authenticate(&self, credential: &Credential) -> AuthResult<Principal>;
}

#[async_trait]
impl<P> CredentialProvider for Arc<P>
where
    P: CredentialProvider + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn supports(&self, credential: &Credential) -> bool {
        (**self).supports(credential)
    }

    async fn authenticate(&self, credential: &Credential) -> AuthResult<Principal> {
        (**self).authenticate(credential).await
    }
}
