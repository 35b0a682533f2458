use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{SubjectId, TokenId};

use crate::{Authority, TokenError};

/// Claims carried inside a token envelope.
///
/// Wire shape: `{"sub": .., "authorities": [..], "iat": <unix s>, "exp": <unix s>, "jti": ..}`.
/// Timestamps are whole seconds; sub-second precision is dropped at issue time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject / principal identifier.
    pub sub: SubjectId,

    /// Roles and permissions granted to the subject.
    #[serde(default)]
    pub authorities: Vec<Authority>,

    /// Issued-at timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiration timestamp (exclusive).
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,

    /// Token identifier, used by revocation lists.
    pub jti: TokenId,
}

impl Claims {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.exp
    }
}

/// Deterministically validate the claims' time window against `now`.
///
/// Valid iff `iat <= now < exp`. Signature verification happens before this
/// in [`crate::TokenCodec::parse`].
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if claims.exp <= claims.iat {
        return Err(TokenError::malformed("invalid time window (exp <= iat)"));
    }
    if now < claims.iat {
        return Err(TokenError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}
