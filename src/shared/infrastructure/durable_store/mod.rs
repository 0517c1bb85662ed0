// Durable local key-value store port.
//
// A namespace holds one map of records. Writers always replace the whole map,
// so a reader never observes a partially applied batch.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

pub type Records = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum DurableStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn read_all(&self, namespace: &str) -> Result<Records, DurableStoreError>;
    async fn write_all(&self, namespace: &str, records: &Records) -> Result<(), DurableStoreError>;
    async fn clear(&self, namespace: &str) -> Result<(), DurableStoreError>;
}

pub mod in_memory;
pub mod json_file;
