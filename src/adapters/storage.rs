use dashmap::DashMap;

/// Client-side key/value storage the auth token lives in.
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl CredentialStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone()).filter(|v| !v.is_empty())
    }
}
