use std::path::PathBuf;

use axum::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A record that can live in a keyed collection.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> Uuid;
}

/// Storage interface over a keyed collection, so the backing
/// implementation is swappable without touching flow logic.
#[async_trait]
pub trait Collection<T: Record>: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<T>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<T>>;
    /// Insert, or replace the record with the same id.
    async fn put(&self, record: T) -> anyhow::Result<()>;
    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// Flat JSON-array file backend. Records are loaded once at open and
/// held in memory; every mutation rewrites the whole file while the
/// write lock is held, so concurrent writers cannot lose updates.
/// Insertion order is preserved.
pub struct JsonCollection<T> {
    path: PathBuf,
    records: RwLock<Vec<T>>,
}

impl<T: Record> JsonCollection<T> {
    /// A missing or unreadable file yields an empty collection.
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = %path.display(), "unreadable collection file, starting empty");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    async fn persist(&self, records: &[T]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec(records)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl<T: Record> Collection<T> for JsonCollection<T> {
    async fn list(&self) -> anyhow::Result<Vec<T>> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<T>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id() == id)
            .cloned())
    }

    async fn put(&self, record: T) -> anyhow::Result<()> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.persist(&records).await
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.persist(&records).await?;
        Ok(true)
    }
}
