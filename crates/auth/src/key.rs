//! Token signing key.

use secrecy::{ExposeSecret, SecretBox};
use thiserror::Error;

/// Minimum accepted length of raw key material, in bytes.
pub const MIN_KEY_MATERIAL_LEN: usize = 32;

const KEY_DERIVATION_CONTEXT: &str = "warden 2024 token signing key v1";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("signing key material too short: {actual} bytes (minimum {MIN_KEY_MATERIAL_LEN})")]
    TooShort { actual: usize },
}

/// Server-held key used to MAC token envelopes.
///
/// Loaded once at startup and immutable afterwards. The derived key is zeroized
/// on drop and redacted from `Debug` output.
pub struct SigningKey {
    key: SecretBox<[u8; 32]>,
}

impl SigningKey {
    /// Derive a signing key from raw material (e.g. a configured secret).
    ///
    /// Material of any length ≥ 32 bytes is accepted and run through BLAKE3's
    /// key derivation so that the MAC key is always uniformly 32 bytes.
    pub fn from_material(material: &[u8]) -> Result<Self, KeyError> {
        if material.len() < MIN_KEY_MATERIAL_LEN {
            return Err(KeyError::TooShort {
                actual: material.len(),
            });
        }
        let derived = blake3::derive_key(KEY_DERIVATION_CONTEXT, material);
        Ok(Self {
            key: SecretBox::new(Box::new(derived)),
        })
    }

    /// Keyed BLAKE3 MAC over `data`.
    pub(crate) fn mac(&self, data: &[u8]) -> [u8; 32] {
        *blake3::keyed_hash(self.key.expose_secret(), data).as_bytes()
    }
}

impl core::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_material_is_rejected() {
        let err = SigningKey::from_material(b"too-short").unwrap_err();
        assert_eq!(err, KeyError::TooShort { actual: 9 });
    }

    #[test]
    fn mac_is_deterministic_per_key() {
        let a = SigningKey::from_material(&[7u8; 32]).unwrap();
        let a2 = SigningKey::from_material(&[7u8; 32]).unwrap();
        let b = SigningKey::from_material(&[8u8; 32]).unwrap();

        assert_eq!(a.mac(b"claims"), a2.mac(b"claims"));
        assert_ne!(a.mac(b"claims"), b.mac(b"claims"));
        assert_ne!(a.mac(b"claims"), a.mac(b"claimz"));
    }

    #[test]
    fn debug_never_prints_key_bytes() {
        let key = SigningKey::from_material(&[0x41u8; 40]).unwrap();
        assert_eq!(format!("{key:?}"), "SigningKey([REDACTED])");
    }
}
