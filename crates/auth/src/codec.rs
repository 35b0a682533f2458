//! Signed token envelope: `<base64url(claims json)>.<base64url(mac)>`.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, DurationRound, Utc};
use subtle::ConstantTimeEq;

use warden_core::{Clock, SubjectId, TokenId};

use crate::claims::validate_claims;
use crate::{Authority, Claims, Principal, SigningKey, TokenError};

const MISSING_CLAIMS: &str = "expected a claims segment followed by '.' and a signature";

/// A freshly minted token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

/// Issues and parses signed tokens.
///
/// Pure over its inputs plus the configured key and clock; safe to share.
#[derive(Clone)]
pub struct TokenCodec {
    key: Arc<SigningKey>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("key", &self.key)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(key: Arc<SigningKey>, clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            key,
            clock,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `subject` valid for `[now, now + ttl)`.
    pub fn issue<I, A>(
        &self,
        subject: &SubjectId,
        authorities: I,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Authority>,
    {
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidTtl);
        }
        let iat = truncate_to_second(self.clock.now());
        let exp = iat
            .checked_add_signed(ttl)
            .ok_or(TokenError::InvalidTtl)?;
        let exp = truncate_to_second(exp);
        if exp <= iat {
            // Sub-second ttl.
            return Err(TokenError::InvalidTtl);
        }

        let claims = Claims {
            sub: subject.clone(),
            authorities: authorities.into_iter().map(Into::into).collect(),
            iat,
            exp,
            jti: TokenId::new(),
        };
        let token = self.encode(&claims)?;
        tracing::debug!(subject = %claims.sub, jti = %claims.jti, exp = %claims.exp, "token issued");
        Ok(IssuedToken { token, claims })
    }

    pub fn issue_default<I, A>(
        &self,
        subject: &SubjectId,
        authorities: I,
    ) -> Result<IssuedToken, TokenError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Authority>,
    {
        self.issue(subject, authorities, self.default_ttl)
    }

    pub fn issue_for(&self, principal: &Principal, ttl: Duration) -> Result<IssuedToken, TokenError> {
        self.issue(principal.subject(), principal.authorities().iter().cloned(), ttl)
    }

    /// Verify and decode a token.
    ///
    /// The signature is checked (in constant time) before anything inside the
    /// claims is trusted, so a forged token is reported as `InvalidSignature`
    /// and never as `Expired`. Only a token with no claims segment at all is
    /// `Malformed`; any other signature mismatch, including a signature
    /// segment that is not valid base64 or has the wrong length, is
    /// `InvalidSignature`.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let (claims_segment, signature_segment) = split_envelope(token)?;

        let expected = URL_SAFE_NO_PAD.encode(self.key.mac(claims_segment.as_bytes()));
        if !bool::from(expected.as_bytes().ct_eq(signature_segment.as_bytes())) {
            return Err(TokenError::InvalidSignature);
        }

        let raw = URL_SAFE_NO_PAD
            .decode(claims_segment)
            .map_err(|e| TokenError::malformed(format!("claims segment: {e}")))?;
        let claims: Claims = serde_json::from_slice(&raw)
            .map_err(|e| TokenError::malformed(format!("claims: {e}")))?;

        validate_claims(&claims, self.clock.now())?;
        Ok(claims)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims).map_err(|e| TokenError::Encoding(e.to_string()))?;
        let claims_segment = URL_SAFE_NO_PAD.encode(json);
        let mac = self.key.mac(claims_segment.as_bytes());
        Ok(format!("{claims_segment}.{}", URL_SAFE_NO_PAD.encode(mac)))
    }
}

/// Splits at the last `.`; the signature segment never contains one.
fn split_envelope(token: &str) -> Result<(&str, &str), TokenError> {
    match token.rsplit_once('.') {
        Some((claims, signature)) if !claims.is_empty() => Ok((claims, signature)),
        _ => Err(TokenError::malformed(MISSING_CLAIMS)),
    }
}

fn truncate_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::seconds(1)).unwrap_or(at)
}
