//! Authentication error taxonomy.
//!
//! Internally every failure keeps its precise kind for audit logging.
//! Externally, [`AuthError::public_failure`] collapses everything except
//! dependency outages into one generic "cannot authenticate" answer.

use thiserror::Error;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Failure of a token codec operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The envelope could not be split or one of its segments could not be decoded.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not match the claims under the configured key.
    #[error("invalid token signature")]
    InvalidSignature,

    /// `now >= exp`.
    #[error("token has expired")]
    Expired,

    /// `now < iat`.
    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    /// Issuing with a zero or negative time-to-live.
    #[error("token ttl must be positive")]
    InvalidTtl,

    /// The claims could not be encoded.
    #[error("claims encoding failed: {0}")]
    Encoding(String),
}

impl TokenError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

/// Failure of an authentication attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No configured provider recognizes the credential shape.
    #[error("unsupported credential")]
    UnsupportedCredential,

    /// The selected provider rejected the credential.
    ///
    /// The message is deliberately identical for unknown subjects and wrong secrets.
    #[error("bad credentials")]
    BadCredentials,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("invalid token signature")]
    InvalidSignature,

    /// A dependency of the provider (e.g. the credential store) failed.
    #[error("credential provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// What a caller outside the auth boundary is allowed to learn about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicFailure {
    /// Generic "cannot authenticate"; never says why.
    AuthenticationFailed,
    /// Not the caller's fault; the request may be retried later.
    TryAgain,
}

impl core::fmt::Display for PublicFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PublicFailure::AuthenticationFailed => f.write_str("authentication failed"),
            PublicFailure::TryAgain => f.write_str("authentication temporarily unavailable"),
        }
    }
}

impl AuthError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    pub fn public_failure(&self) -> PublicFailure {
        match self {
            AuthError::ProviderUnavailable(_) => PublicFailure::TryAgain,
            AuthError::UnsupportedCredential
            | AuthError::BadCredentials
            | AuthError::Expired
            | AuthError::NotYetValid
            | AuthError::MalformedToken(_)
            | AuthError::InvalidSignature => PublicFailure::AuthenticationFailed,
        }
    }

    /// Stable short name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::UnsupportedCredential => "unsupported_credential",
            AuthError::BadCredentials => "bad_credentials",
            AuthError::Expired => "expired",
            AuthError::NotYetValid => "not_yet_valid",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::ProviderUnavailable(_) => "provider_unavailable",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Malformed(msg) => AuthError::MalformedToken(msg),
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Expired => AuthError::Expired,
            TokenError::NotYetValid => AuthError::NotYetValid,
            // Only reachable when issuing; a presented token never hits these.
            TokenError::InvalidTtl | TokenError::Encoding(_) => {
                AuthError::MalformedToken(value.to_string())
            }
        }
    }
}
