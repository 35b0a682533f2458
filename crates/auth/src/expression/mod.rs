//! Boolean authority expressions.
//!
//! Build them in code:
//!
//! ```
//! use warden_auth::expression::{has_authority, has_role, is_owner_of};
//!
//! let expr = has_role("ADMIN").or(has_authority("order.read").and(is_owner_of("owner")));
//! assert_eq!(expr.to_string(), "hasRole('ADMIN') or hasAuthority('order.read') and isOwner(#owner)");
//! ```
//!
//! or parse them from text with [`str::parse`]; `Display` output parses back to
//! the same expression.

use std::fmt;

use crate::{Authority, Role};

mod parser;

pub use parser::ExpressionError;

/// Deepest expression tree the parser produces and the evaluator descends.
///
/// A leaf has depth 1; each `and`, `or` and `not` adds one level above its
/// deepest operand.
pub const MAX_DEPTH: usize = 64;

/// Whose ownership `isOwner(..)` compares the principal's subject against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerRef {
    /// A fixed owner id: `isOwner('alice')`.
    Literal(String),
    /// A named resource value supplied at check time: `isOwner(#order.owner)`.
    Resource(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthorityExpression {
    PermitAll,
    DenyAll,
    HasRole(Role),
    HasAuthority(Authority),
    IsOwner(OwnerRef),
    And(Box<AuthorityExpression>, Box<AuthorityExpression>),
    Or(Box<AuthorityExpression>, Box<AuthorityExpression>),
    Not(Box<AuthorityExpression>),
}

pub fn permit_all() -> AuthorityExpression {
    AuthorityExpression::PermitAll
}

pub fn deny_all() -> AuthorityExpression {
    AuthorityExpression::DenyAll
}

pub fn has_role(role: impl Into<String>) -> AuthorityExpression {
    AuthorityExpression::HasRole(Role::new(role.into()))
}

pub fn has_authority(authority: impl Into<String>) -> AuthorityExpression {
    AuthorityExpression::HasAuthority(Authority::new(authority.into()))
}

/// `isOwner('<owner>')` against a literal owner id.
pub fn is_owner(owner: impl Into<String>) -> AuthorityExpression {
    AuthorityExpression::IsOwner(OwnerRef::Literal(owner.into()))
}

/// `isOwner(#<key>)` against a resource value resolved at check time.
pub fn is_owner_of(resource_key: impl Into<String>) -> AuthorityExpression {
    AuthorityExpression::IsOwner(OwnerRef::Resource(resource_key.into()))
}

impl AuthorityExpression {
    pub fn and(self, rhs: AuthorityExpression) -> Self {
        Self::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: AuthorityExpression) -> Self {
        Self::Or(Box::new(self), Box::new(rhs))
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Resource keys this expression may consult, in first-use order.
    pub fn resource_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            Self::IsOwner(OwnerRef::Resource(key)) => {
                if !keys.contains(&key.as_str()) {
                    keys.push(key);
                }
            }
            Self::And(l, r) | Self::Or(l, r) => {
                l.collect_keys(keys);
                r.collect_keys(keys);
            }
            Self::Not(inner) => inner.collect_keys(keys),
            Self::PermitAll
            | Self::DenyAll
            | Self::HasRole(_)
            | Self::HasAuthority(_)
            | Self::IsOwner(OwnerRef::Literal(_)) => {}
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => 1,
            Self::And(..) => 2,
            _ => 3,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl std::ops::Not for AuthorityExpression {
    type Output = AuthorityExpression;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("'")
}

impl fmt::Display for AuthorityExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermitAll => f.write_str("permitAll"),
            Self::DenyAll => f.write_str("denyAll"),
            Self::HasRole(role) => {
                f.write_str("hasRole(")?;
                write_quoted(f, role.as_str())?;
                f.write_str(")")
            }
            Self::HasAuthority(authority) => {
                f.write_str("hasAuthority(")?;
                write_quoted(f, authority.as_str())?;
                f.write_str(")")
            }
            Self::IsOwner(OwnerRef::Literal(owner)) => {
                f.write_str("isOwner(")?;
                write_quoted(f, owner)?;
                f.write_str(")")
            }
            Self::IsOwner(OwnerRef::Resource(key)) => write!(f, "isOwner(#{key})"),
            // Left-associative: the right operand needs parens at equal precedence.
            Self::And(l, r) => {
                l.fmt_operand(f, 2)?;
                f.write_str(" and ")?;
                r.fmt_operand(f, 3)
            }
            Self::Or(l, r) => {
                l.fmt_operand(f, 1)?;
                f.write_str(" or ")?;
                r.fmt_operand(f, 2)
            }
            Self::Not(inner) => {
                f.write_str("not ")?;
                inner.fmt_operand(f, 3)
            }
        }
    }
}
