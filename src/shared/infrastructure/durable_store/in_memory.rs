// In memory implementation of the KeyValueStore port.
//
// Shares its contents between clones of the same Arc, which lets tests drop a
// session and open a new one over the "same disk".

use crate::shared::infrastructure::durable_store::{DurableStoreError, KeyValueStore, Records};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    namespaces: RwLock<HashMap<String, Records>>,
    is_offline: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&self) {
        self.is_offline.fetch_xor(true, Ordering::SeqCst);
    }

    /// Number of successful `write_all` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), DurableStoreError> {
        if self.is_offline.load(Ordering::SeqCst) {
            return Err(DurableStoreError::Unavailable("Key-value store offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn read_all(&self, namespace: &str) -> Result<Records, DurableStoreError> {
        self.check_online()?;
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn write_all(&self, namespace: &str, records: &Records) -> Result<(), DurableStoreError> {
        self.check_online()?;
        self.namespaces
            .write()
            .await
            .insert(namespace.to_string(), records.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self, namespace: &str) -> Result<(), DurableStoreError> {
        self.check_online()?;
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }
}
