use std::collections::HashSet;

use parking_lot::RwLock;

/// API keys confirmed valid during this process lifetime.
///
/// Only confirmed-valid replies are recorded. There is no removal path, a
/// revoked key stays trusted until restart.
#[derive(Debug, Default)]
pub struct VerifiedKeySet {
    keys: RwLock<HashSet<String>>,
}

impl VerifiedKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, api_key: &str) -> bool {
        self.keys.read().contains(api_key)
    }

    /// Returns `true` when the key was not known before.
    pub fn insert(&self, api_key: &str) -> bool {
        self.keys.write().insert(api_key.to_string())
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}
