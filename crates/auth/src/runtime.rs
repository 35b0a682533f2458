//! Wires configuration, providers, manager and evaluator into one handle.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use warden_core::{Clock, SystemClock};

use crate::config::{AuthConfig, ConfigError, ProviderKind, check_ttl};
use crate::provider::{
    CredentialLookup, PasswordProvider, SecretMatcher, StoredCredential, TokenProvider,
};
use crate::{
    AuthError, AuthResult, AuthenticationManager, AuthorizationEvaluator, Credential,
    InMemoryRevocationList, IssuedToken, Principal, SecurityContext, TokenCodec, TokenError,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RevokeError {
    #[error("token revocation is not enabled")]
    Disabled,

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Everything a host needs at request time, built once at startup.
///
/// Cheap to clone; all parts are immutable or internally synchronized.
#[derive(Debug, Clone)]
pub struct AuthRuntime {
    codec: Arc<TokenCodec>,
    manager: AuthenticationManager,
    evaluator: AuthorizationEvaluator,
    revocations: Option<Arc<InMemoryRevocationList>>,
}

pub struct AuthRuntimeBuilder {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    store: Option<(Arc<dyn CredentialLookup>, Arc<dyn SecretMatcher>)>,
    decoy: Option<StoredCredential>,
    revocations: Option<Arc<InMemoryRevocationList>>,
}

impl AuthRuntimeBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn credential_store(
        mut self,
        lookup: Arc<dyn CredentialLookup>,
        matcher: Arc<dyn SecretMatcher>,
    ) -> Self {
        self.store = Some((lookup, matcher));
        self
    }

    /// Record the password provider matches against when an identifier is
    /// unknown. Give it a hash your [`SecretMatcher`] can verify so that path
    /// costs the same as a wrong secret.
    pub fn decoy_credential(mut self, decoy: StoredCredential) -> Self {
        self.decoy = Some(decoy);
        self
    }

    /// Enable [`AuthRuntime::revoke`] backed by an in-memory deny-list.
    pub fn revocations(mut self, list: Arc<InMemoryRevocationList>) -> Self {
        self.revocations = Some(list);
        self
    }

    pub fn build(self) -> Result<AuthRuntime, ConfigError> {
        let AuthConfig {
            signing_key,
            default_ttl,
            providers,
            role_prefix,
        } = self.config;
        // The fields are public, so values set without the builder land here.
        let default_ttl = check_ttl(default_ttl)?;

        let codec = Arc::new(TokenCodec::new(Arc::new(signing_key), self.clock, default_ttl));

        let mut manager = AuthenticationManager::builder();
        for kind in &providers {
            manager = match kind {
                ProviderKind::Password => {
                    let (lookup, matcher) = self
                        .store
                        .clone()
                        .ok_or(ConfigError::MissingCredentialStore)?;
                    let mut provider = PasswordProvider::new(lookup, matcher);
                    if let Some(decoy) = &self.decoy {
                        provider = provider.with_decoy(decoy.clone());
                    }
                    manager.provider(provider)
                }
                ProviderKind::Token => {
                    let mut provider = TokenProvider::new(codec.clone());
                    if let Some(list) = &self.revocations {
                        provider = provider.with_revocations(list.clone());
                    }
                    manager.provider(provider)
                }
            };
        }
        let manager = manager.build();

        tracing::info!(
            providers = ?manager.provider_names(),
            revocation = self.revocations.is_some(),
            "auth runtime ready"
        );

        Ok(AuthRuntime {
            codec,
            manager,
            evaluator: AuthorizationEvaluator::with_role_prefix(role_prefix),
            revocations: self.revocations,
        })
    }
}

impl AuthRuntime {
    pub fn builder(config: AuthConfig) -> AuthRuntimeBuilder {
        AuthRuntimeBuilder {
            config,
            clock: Arc::new(SystemClock),
            store: None,
            decoy: None,
            revocations: None,
        }
    }

    /// Runtime on the system clock with the given credential store.
    pub fn from_config(
        config: AuthConfig,
        lookup: Arc<dyn CredentialLookup>,
        matcher: Arc<dyn SecretMatcher>,
    ) -> Result<Self, ConfigError> {
        Self::builder(config).credential_store(lookup, matcher).build()
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn manager(&self) -> &AuthenticationManager {
        &self.manager
    }

    pub fn evaluator(&self) -> &AuthorizationEvaluator {
        &self.evaluator
    }

    /// Authenticate and mint a fresh token with the default TTL.
    pub async fn login(&self, credential: &Credential) -> AuthResult<(Principal, IssuedToken)> {
        let principal = self.manager.authenticate(credential).await?;
        let issued = self
            .codec
            .issue_for(&principal, self.codec.default_ttl())
            .map_err(AuthError::from)?;
        Ok((principal, issued))
    }

    /// Authenticate `credential`, then run `fut` as one unit of work bound to
    /// the resulting principal.
    ///
    /// On failure `fut` is dropped without being polled.
    pub async fn handle<F>(&self, credential: &Credential, fut: F) -> AuthResult<F::Output>
    where
        F: Future,
    {
        let principal = self.manager.authenticate(credential).await?;
        Ok(SecurityContext::scope(Some(principal), fut).await)
    }

    /// Revoke a token issued by this runtime.
    ///
    /// Already-expired tokens need no entry and are accepted as-is. Entries
    /// for tokens that have expired since are pruned on every call.
    pub fn revoke(&self, token: &str) -> Result<(), RevokeError> {
        let list = self.revocations.as_ref().ok_or(RevokeError::Disabled)?;
        list.prune(self.codec.now());
        match self.codec.parse(token) {
            Ok(claims) => {
                list.revoke(&claims);
                Ok(())
            }
            Err(TokenError::Expired) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
