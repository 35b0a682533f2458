//! Single entry point over the provider chain.

use std::sync::Arc;

use warden_observability::AUDIT_TARGET;

use crate::provider::CredentialProvider;
use crate::{AuthError, AuthResult, Credential, Principal};

/// Runs a credential through the first provider that supports it.
///
/// - one credential, one provider: a rejected credential is never retried
///   against a later provider
/// - no retries: a failure is terminal for the attempt
/// - the provider list is immutable after [`AuthenticationManagerBuilder::build`]
#[derive(Clone)]
pub struct AuthenticationManager {
    providers: Arc<[Arc<dyn CredentialProvider>]>,
}

impl core::fmt::Debug for AuthenticationManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthenticationManager")
            .field("providers", &self.provider_names())
            .finish()
    }
}

#[derive(Default)]
pub struct AuthenticationManagerBuilder {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl AuthenticationManagerBuilder {
    /// Append a provider; providers are tried in insertion order.
    pub fn provider(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn shared_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> AuthenticationManager {
        AuthenticationManager {
            providers: self.providers.into(),
        }
    }
}

impl AuthenticationManager {
    pub fn builder() -> AuthenticationManagerBuilder {
        AuthenticationManagerBuilder::default()
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Authenticate `credential`, returning an authenticated principal.
    ///
    /// Fails with `UnsupportedCredential` when no provider supports the
    /// credential; otherwise mirrors the selected provider's failure.
    pub async fn authenticate(&self, credential: &Credential) -> AuthResult<Principal> {
        let kind = credential.kind();
        let Some(provider) = self.providers.iter().find(|p| p.supports(credential)) else {
            tracing::warn!(credential = %kind, "no provider supports credential");
            return Err(AuthError::UnsupportedCredential);
        };

        tracing::debug!(credential = %kind, provider = provider.name(), "provider selected");

        match provider.authenticate(credential).await {
            Ok(principal) => {
                let principal = principal.into_authenticated();
                tracing::info!(
                    target: AUDIT_TARGET,
                    provider = provider.name(),
                    subject = %principal.subject(),
                    "authentication succeeded"
                );
                Ok(principal)
            }
            Err(err) => {
                tracing::warn!(
                    target: AUDIT_TARGET,
                    provider = provider.name(),
                    error.kind = err.kind(),
                    error = %err,
                    "authentication failed"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use warden_core::SubjectId;

    use super::*;
    use crate::CredentialKind;

    /// Provider that accepts one credential kind and counts invocations.
    struct Scripted {
        name: &'static str,
        accepts: CredentialKind,
        outcome: Result<&'static str, AuthError>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(
            name: &'static str,
            accepts: CredentialKind,
            outcome: Result<&'static str, AuthError>,
        ) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    accepts,
                    outcome,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl CredentialProvider for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports(&self, credential: &Credential) -> bool {
            credential.kind() == self.accepts
        }

        async fn authenticate(&self, _credential: &Credential) -> AuthResult<Principal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .clone()
                .map(|subject| Principal::new(SubjectId::new(subject).unwrap(), ["ROLE_USER"]))
        }
    }

    #[tokio::test]
    async fn success_marks_principal_authenticated() {
        let (scripted, _) = Scripted::new("pw", CredentialKind::Password, Ok("alice"));
        let manager = AuthenticationManager::builder().provider(scripted).build();

        let principal = manager
            .authenticate(&Credential::password("alice", "x"))
            .await
            .unwrap();
        assert!(principal.is_authenticated());
        assert_eq!(principal.subject(), "alice");
    }

    #[tokio::test]
    async fn no_supporting_provider_is_unsupported() {
        let (scripted, calls) = Scripted::new("pw", CredentialKind::Password, Ok("alice"));
        let manager = AuthenticationManager::builder().provider(scripted).build();

        let err = manager.authenticate(&Credential::bearer("t")).await.unwrap_err();
        assert_eq!(err, AuthError::UnsupportedCredential);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let empty = AuthenticationManager::builder().build();
        assert_eq!(
            empty.authenticate(&Credential::bearer("t")).await.unwrap_err(),
            AuthError::UnsupportedCredential
        );
    }

    #[tokio::test]
    async fn failure_does_not_fall_back_to_a_later_provider() {
        let (first, first_calls) =
            Scripted::new("first", CredentialKind::Password, Err(AuthError::BadCredentials));
        let (second, second_calls) = Scripted::new("second", CredentialKind::Password, Ok("alice"));
        let manager = AuthenticationManager::builder()
            .provider(first)
            .provider(second)
            .build();

        let err = manager
            .authenticate(&Credential::password("alice", "x"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::BadCredentials);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_kind_is_mirrored() {
        let (scripted, _) = Scripted::new(
            "pw",
            CredentialKind::Password,
            Err(AuthError::unavailable("store down")),
        );
        let manager = AuthenticationManager::builder().provider(scripted).build();
        let err = manager
            .authenticate(&Credential::password("alice", "x"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::ProviderUnavailable("store down".into()));
    }

    /// The single supporting provider is the only one invoked, wherever it sits.
    #[tokio::test]
    async fn selection_is_independent_of_position() {
        for position in 0..4 {
            let mut builder = AuthenticationManager::builder();
            let mut others = Vec::new();
            let mut target_calls = None;
            for slot in 0..4 {
                if slot == position {
                    let (scripted, calls) = Scripted::new("target", CredentialKind::Bearer, Ok("svc"));
                    builder = builder.provider(scripted);
                    target_calls = Some(calls);
                } else {
                    let (scripted, calls) = Scripted::new("other", CredentialKind::Password, Ok("x"));
                    builder = builder.provider(scripted);
                    others.push(calls);
                }
            }
            let manager = builder.build();

            let principal = manager.authenticate(&Credential::bearer("t")).await.unwrap();
            assert_eq!(principal.subject(), "svc");
            assert_eq!(target_calls.unwrap().load(Ordering::SeqCst), 1);
            assert!(others.iter().all(|c| c.load(Ordering::SeqCst) == 0));
        }
    }
}
