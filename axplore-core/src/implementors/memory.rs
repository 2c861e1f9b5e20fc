use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{PreferenceBackend, Result};

/// An in-process preference store.
///
/// Hosts that bridge to the OS key-value store implement
/// [PreferenceBackend] themselves, this one backs tests and previews.
#[derive(Default)]
pub struct MemoryPreferences {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Default::default()
    }
}

#[async_trait]
impl PreferenceBackend for MemoryPreferences {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }
}
