use std::sync::Arc;

use async_trait::async_trait;

use crate::{AuthError, AuthResult, Credential, Principal, RevocationCheck, TokenCodec};

use super::CredentialProvider;

/// Verifies bearer tokens previously issued by a [`TokenCodec`].
pub struct TokenProvider {
    codec: Arc<TokenCodec>,
    revocations: Option<Arc<dyn RevocationCheck>>,
}

impl TokenProvider {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self {
            codec,
            revocations: None,
        }
    }

    pub fn with_revocations(mut self, revocations: Arc<dyn RevocationCheck>) -> Self {
        self.revocations = Some(revocations);
        self
    }
}

#[async_trait]
impl CredentialProvider for TokenProvider {
    fn name(&self) -> &'static str {
        "token"
    }

    fn supports(&self, credential: &Credential) -> bool {
        matches!(credential, Credential::Bearer(_))
    }

    async fn authenticate(&self, credential: &Credential) -> AuthResult<Principal> {
        let token = credential
            .bearer_token()
            .ok_or(AuthError::UnsupportedCredential)?;

        let claims = self.codec.parse(token)?;

        if let Some(revocations) = &self.revocations {
            if revocations.is_revoked(&claims) {
                tracing::debug!(provider = self.name(), jti = %claims.jti, "token revoked");
                return Err(AuthError::BadCredentials);
            }
        }

        Ok(Principal::from_claims(&claims))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use warden_core::{ManualClock, SubjectId};

    use super::*;
    use crate::{Authority, InMemoryRevocationList, SigningKey};

    fn codec() -> (Arc<TokenCodec>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let key = Arc::new(SigningKey::from_material(&[9u8; 32]).unwrap());
        (
            Arc::new(TokenCodec::new(key, clock.clone(), Duration::minutes(5))),
            clock,
        )
    }

    fn alice() -> SubjectId {
        SubjectId::new("alice").unwrap()
    }

    #[tokio::test]
    async fn maps_claims_to_principal() {
        let (codec, _) = codec();
        let issued = codec.issue_default(&alice(), ["ROLE_ADMIN"]).unwrap();

        let principal = TokenProvider::new(codec)
            .authenticate(&Credential::bearer(issued.token))
            .await
            .unwrap();
        assert_eq!(principal.subject(), "alice");
        assert!(principal.authorities().contains(&Authority::new("ROLE_ADMIN")));
        assert!(!principal.is_authenticated());
    }

    #[tokio::test]
    async fn expired_token_fails_with_expired() {
        let (codec, clock) = codec();
        let issued = codec.issue(&alice(), ["ROLE_USER"], Duration::seconds(1)).unwrap();
        clock.advance(Duration::seconds(2));

        let err = TokenProvider::new(codec)
            .authenticate(&Credential::bearer(issued.token))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::Expired);
    }

    #[tokio::test]
    async fn revoked_token_is_bad_credentials() {
        let (codec, _) = codec();
        let issued = codec.issue_default(&alice(), ["ROLE_USER"]).unwrap();
        let list = Arc::new(InMemoryRevocationList::new());
        list.revoke(&issued.claims);

        let err = TokenProvider::new(codec)
            .with_revocations(list)
            .authenticate(&Credential::bearer(issued.token))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::BadCredentials);
    }
}
