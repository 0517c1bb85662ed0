// File backed implementation of the KeyValueStore port.
//
// Each namespace is one JSON document `<dir>/<namespace>.json`. Writes land in a
// temporary sibling first and are renamed over the target, so a crash mid-write
// leaves the previous document intact.

use crate::shared::infrastructure::durable_store::{DurableStoreError, KeyValueStore, Records};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }
}

#[async_trait::async_trait]
impl KeyValueStore for JsonFileStore {
    async fn read_all(&self, namespace: &str) -> Result<Records, DurableStoreError> {
        match tokio::fs::read(self.document_path(namespace)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Records::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_all(&self, namespace: &str, records: &Records) -> Result<(), DurableStoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.document_path(namespace);
        let staging = self.dir.join(format!("{namespace}.json.tmp"));
        let bytes = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &target).await?;
        tracing::trace!(path = %target.display(), records = records.len(), "namespace written");
        Ok(())
    }

    async fn clear(&self, namespace: &str) -> Result<(), DurableStoreError> {
        match tokio::fs::remove_file(self.document_path(namespace)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
