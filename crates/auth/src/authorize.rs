use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use warden_observability::AUDIT_TARGET;

use crate::expression::{AuthorityExpression, MAX_DEPTH, OwnerRef};
use crate::roles::DEFAULT_ROLE_PREFIX;
use crate::{Principal, SecurityContext};

/// Named values an expression may refer to with `#key` (typically the owner of
/// the resource being accessed).
pub trait ResourceContext {
    fn resolve(&self, key: &str) -> Option<Cow<'_, str>>;
}

/// No resource values.
impl ResourceContext for () {
    fn resolve(&self, _key: &str) -> Option<Cow<'_, str>> {
        None
    }
}

impl ResourceContext for HashMap<String, String> {
    fn resolve(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl ResourceContext for BTreeMap<String, String> {
    fn resolve(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl<const N: usize> ResourceContext for [(&str, &str); N] {
    fn resolve(&self, key: &str) -> Option<Cow<'_, str>> {
        self.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| Cow::Borrowed(*v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// No principal bound, or the principal was never authenticated.
    Unauthenticated,
    MissingRole,
    MissingAuthority,
    NotOwner,
    /// `isOwner(#key)` referenced a value the caller did not supply.
    UnresolvedResource,
    /// A `not(..)` whose operand was satisfied.
    Negated,
    DenyAll,
    /// The expression nests deeper than [`MAX_DEPTH`].
    TooDeep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub kind: DenialKind,
    pub reason: String,
}

impl Denial {
    fn new(kind: DenialKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    fn unauthenticated() -> Self {
        Self::new(DenialKind::Unauthenticated, "unauthenticated")
    }
}

impl core::fmt::Display for Denial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "denial", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allow => None,
            Decision::Deny(denial) => Some(denial),
        }
    }

    pub fn into_result(self) -> Result<(), AccessDenied> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(AccessDenied(denial)),
        }
    }
}

/// Returned by the guard helpers when the operation was not run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("access denied: {0}")]
pub struct AccessDenied(pub Denial);

impl AccessDenied {
    pub fn denial(&self) -> &Denial {
        &self.0
    }
}

/// Outcome of one sub-expression.
///
/// `Abort` is a denial that no enclosing `or`/`not` can turn into an allow: a
/// missing resource value fails the whole check.
enum Step {
    Allow,
    Deny(Denial),
    Abort(Denial),
}

/// Decides [`AuthorityExpression`]s against principals.
///
/// Evaluation is pure: the same principal, expression and resource values
/// always yield the same decision. `and`/`or` short-circuit left to right.
#[derive(Debug, Clone)]
pub struct AuthorizationEvaluator {
    role_prefix: String,
}

impl Default for AuthorizationEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationEvaluator {
    pub fn new() -> Self {
        Self::with_role_prefix(DEFAULT_ROLE_PREFIX)
    }

    pub fn with_role_prefix(prefix: impl Into<String>) -> Self {
        Self {
            role_prefix: prefix.into(),
        }
    }

    pub fn role_prefix(&self) -> &str {
        &self.role_prefix
    }

    /// Decide `expr` for the principal bound to the current unit of work.
    pub fn check<R>(&self, expr: &AuthorityExpression, resources: &R) -> Decision
    where
        R: ResourceContext + ?Sized,
    {
        let principal = SecurityContext::current();
        let decision = self.evaluate(principal.as_deref(), expr, resources);

        if let Decision::Deny(denial) = &decision {
            tracing::info!(
                target: AUDIT_TARGET,
                subject = principal.as_ref().map(|p| p.subject().as_str()),
                expression = %expr,
                denial.kind = ?denial.kind,
                reason = %denial.reason,
                "access denied"
            );
        } else {
            tracing::debug!(expression = %expr, "access granted");
        }

        decision
    }

    pub fn evaluate<R>(
        &self,
        principal: Option<&Principal>,
        expr: &AuthorityExpression,
        resources: &R,
    ) -> Decision
    where
        R: ResourceContext + ?Sized,
    {
        let Some(principal) = principal.filter(|p| p.is_authenticated()) else {
            return Decision::Deny(Denial::unauthenticated());
        };

        match self.step(principal, expr, resources, 1) {
            Step::Allow => Decision::Allow,
            Step::Deny(denial) | Step::Abort(denial) => Decision::Deny(denial),
        }
    }

    /// Run `op` only when `expr` allows the current principal.
    pub fn guard<R, T>(
        &self,
        expr: &AuthorityExpression,
        resources: &R,
        op: impl FnOnce() -> T,
    ) -> Result<T, AccessDenied>
    where
        R: ResourceContext + ?Sized,
    {
        self.check(expr, resources).into_result()?;
        Ok(op())
    }

    /// Async counterpart of [`AuthorizationEvaluator::guard`]; `fut` is only
    /// polled after an `Allow`.
    pub async fn guard_async<R, F>(
        &self,
        expr: &AuthorityExpression,
        resources: &R,
        fut: F,
    ) -> Result<F::Output, AccessDenied>
    where
        R: ResourceContext + ?Sized,
        F: Future,
    {
        self.check(expr, resources).into_result()?;
        Ok(fut.await)
    }

    fn step<R>(
        &self,
        principal: &Principal,
        expr: &AuthorityExpression,
        resources: &R,
        depth: usize,
    ) -> Step
    where
        R: ResourceContext + ?Sized,
    {
        use AuthorityExpression as E;

        if depth > MAX_DEPTH {
            return Step::Abort(Denial::new(
                DenialKind::TooDeep,
                format!("expression nested deeper than {MAX_DEPTH} levels"),
            ));
        }
        let next = depth + 1;

        match expr {
            E::PermitAll => Step::Allow,
            E::DenyAll => Step::Deny(Denial::new(DenialKind::DenyAll, "denyAll")),
            E::HasRole(role) => {
                if principal.has_role(role, &self.role_prefix) {
                    Step::Allow
                } else {
                    Step::Deny(Denial::new(
                        DenialKind::MissingRole,
                        format!("missing role '{role}'"),
                    ))
                }
            }
            E::HasAuthority(authority) => {
                if principal.has_authority(authority) {
                    Step::Allow
                } else {
                    Step::Deny(Denial::new(
                        DenialKind::MissingAuthority,
                        format!("missing authority '{authority}'"),
                    ))
                }
            }
            E::IsOwner(owner) => {
                let expected = match owner {
                    OwnerRef::Literal(value) => Cow::Borrowed(value.as_str()),
                    OwnerRef::Resource(key) => match resources.resolve(key) {
                        Some(value) => value,
                        None => {
                            return Step::Abort(Denial::new(
                                DenialKind::UnresolvedResource,
                                format!("resource value '#{key}' was not supplied"),
                            ));
                        }
                    },
                };
                if principal.subject().as_str() == expected {
                    Step::Allow
                } else {
                    Step::Deny(Denial::new(
                        DenialKind::NotOwner,
                        format!("'{}' is not the owner", principal.subject()),
                    ))
                }
            }
            E::And(lhs, rhs) => match self.step(principal, lhs, resources, next) {
                Step::Allow => self.step(principal, rhs, resources, next),
                denied => denied,
            },
            E::Or(lhs, rhs) => match self.step(principal, lhs, resources, next) {
                Step::Allow => Step::Allow,
                Step::Abort(denial) => Step::Abort(denial),
                Step::Deny(first) => match self.step(principal, rhs, resources, next) {
                    Step::Deny(second) => Step::Deny(Denial {
                        kind: second.kind,
                        reason: format!("{}; {}", first.reason, second.reason),
                    }),
                    other => other,
                },
            },
            E::Not(inner) => match self.step(principal, inner, resources, next) {
                Step::Allow => Step::Deny(Denial::new(
                    DenialKind::Negated,
                    format!("negated condition holds: {inner}"),
                )),
                Step::Deny(_) => Step::Allow,
                Step::Abort(denial) => Step::Abort(denial),
            },
        }
    }
}
