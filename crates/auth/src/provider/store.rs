use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{CredentialLookup, LookupError, StoredCredential};

/// In-memory credential store.
///
/// Intended for tests/dev. Identifiers are matched exactly.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: RwLock<HashMap<String, StoredCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `identifier`.
    pub fn insert(&self, identifier: impl Into<String>, record: StoredCredential) {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        records.insert(identifier.into(), record);
    }

    pub fn remove(&self, identifier: &str) -> Option<StoredCredential> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        records.remove(identifier)
    }
}

#[async_trait]
impl CredentialLookup for InMemoryCredentialStore {
    async fn lookup(&self, identifier: &str) -> Result<Option<StoredCredential>, LookupError> {
        let records = self
            .records
            .read()
            .map_err(|_| LookupError("lock poisoned".to_string()))?;
        Ok(records.get(identifier).cloned())
    }
}
