//! `warden-auth`: authentication and authorization core.
//!
//! Credentials go through a provider chain and come out as a [`Principal`];
//! the principal is bound to the current unit of work by [`SecurityContext`];
//! [`AuthorizationEvaluator`] decides [`AuthorityExpression`]s against it.
//!
//! Transport, storage and password hashing stay outside this crate.

pub mod authority;
pub mod authorize;
pub mod claims;
pub mod codec;
pub mod config;
pub mod context;
pub mod credential;
pub mod error;
pub mod expression;
pub mod key;
pub mod manager;
pub mod principal;
pub mod provider;
pub mod revocation;
pub mod roles;
pub mod runtime;

pub use authority::Authority;
pub use authorize::{
    AccessDenied, AuthorizationEvaluator, Decision, Denial, DenialKind, ResourceContext,
};
pub use claims::{Claims, validate_claims};
pub use codec::{IssuedToken, TokenCodec};
pub use config::{AuthConfig, ConfigError, ProviderKind};
pub use context::{ContextError, SecurityContext};
pub use credential::{Credential, CredentialKind};
pub use error::{AuthError, AuthResult, PublicFailure, TokenError};
pub use expression::{AuthorityExpression, ExpressionError, OwnerRef};
pub use key::{KeyError, SigningKey};
pub use manager::{AuthenticationManager, AuthenticationManagerBuilder};
pub use principal::Principal;
pub use provider::{
    CredentialLookup, CredentialProvider, InMemoryCredentialStore, LookupError, PasswordProvider,
    SecretMatcher, StoredCredential, TokenProvider,
};
pub use revocation::{InMemoryRevocationList, RevocationCheck};
pub use roles::{DEFAULT_ROLE_PREFIX, Role};
pub use runtime::{AuthRuntime, AuthRuntimeBuilder, RevokeError};
