use std::collections::BTreeSet;

use serde::Serialize;

use warden_core::SubjectId;

use crate::{Authority, Claims, Role};

/// A verified identity and the authorities granted to it.
///
/// Providers build principals with [`Principal::new`], which always yields
/// `authenticated == false`. Only the authentication manager can mark a
/// principal authenticated, so a principal assembled anywhere else never
/// passes an authorization check.
///
/// Not `Deserialize`: a principal is never rebuilt from bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    subject: SubjectId,
    authorities: BTreeSet<Authority>,
    authenticated: bool,
}

impl Principal {
    pub fn new<I, A>(subject: SubjectId, authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Authority>,
    {
        Self {
            subject,
            authorities: authorities.into_iter().map(Into::into).collect(),
            authenticated: false,
        }
    }

    pub(crate) fn from_claims(claims: &Claims) -> Self {
        Self::new(claims.sub.clone(), claims.authorities.iter().cloned())
    }

    pub(crate) fn into_authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn authorities(&self) -> &BTreeSet<Authority> {
        &self.authorities
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn has_authority(&self, authority: &Authority) -> bool {
        self.authorities.contains(authority) || self.authorities.iter().any(Authority::is_wildcard)
    }

    pub fn has_role(&self, role: &Role, prefix: &str) -> bool {
        self.authorities.iter().any(|a| role.is_granted_by(a, prefix))
    }
}
