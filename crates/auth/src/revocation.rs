//! Optional token revocation.
//!
//! Tokens are stateless: by default nothing but expiry invalidates them. A
//! host that needs logout or compromise handling plugs a [`RevocationCheck`]
//! into the [`TokenProvider`](crate::TokenProvider). The codec stays pure.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use warden_core::TokenId;
use warden_observability::AUDIT_TARGET;

use crate::Claims;

/// Answers "has this token been revoked?".
pub trait RevocationCheck: Send + Sync {
    fn is_revoked(&self, claims: &Claims) -> bool;
}

/// In-memory deny-list keyed by `jti`.
///
/// Entries only need to live until the token would have expired anyway;
/// [`InMemoryRevocationList::prune`] drops them after that.
/// [`AuthRuntime::revoke`](crate::AuthRuntime::revoke) prunes before every
/// insert; a host driving the list directly prunes it itself.
#[derive(Debug, Default)]
pub struct InMemoryRevocationList {
    revoked: RwLock<HashMap<TokenId, DateTime<Utc>>>,
}

impl InMemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, claims: &Claims) {
        let mut revoked = self.revoked.write().unwrap_or_else(PoisonError::into_inner);
        revoked.insert(claims.jti, claims.exp);
        tracing::info!(target: AUDIT_TARGET, subject = %claims.sub, jti = %claims.jti, "token revoked");
    }

    /// Remove entries whose token has expired by `now`. Returns how many were dropped.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut revoked = self.revoked.write().unwrap_or_else(PoisonError::into_inner);
        let before = revoked.len();
        revoked.retain(|_, exp| now < *exp);
        before - revoked.len()
    }

    pub fn len(&self) -> usize {
        self.revoked.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RevocationCheck for InMemoryRevocationList {
    fn is_revoked(&self, claims: &Claims) -> bool {
        self.revoked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&claims.jti)
    }
}
