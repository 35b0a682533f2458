//! Tracing setup shared by warden hosts.

/// Target of security audit events (authentication outcomes, access denials,
/// revocations). Route or filter on it with `RUST_LOG=warden::audit=info`.
pub const AUDIT_TARGET: &str = "warden::audit";

/// Initialize process-wide tracing.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, formatting).
pub mod tracing;
