// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The storage capability restore and retention are written against

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// A boxed, owned byte stream
pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// List, get and delete against the backup store
///
/// Keys are hierarchical; `list` returns every object below `prefix` and
/// `list_children` only the objects directly under it.
/// `delete_batch` removes all given keys in one request where the backend
/// supports it; a key that is already gone is not an error.
#[async_trait]
pub trait BackupStorage: Send + Sync {
    async fn list(&self, prefix: &Path) -> Result<Vec<ObjectMeta>>;

    async fn list_children(&self, prefix: &Path) -> Result<Vec<ObjectMeta>>;

    /// Open a streaming reader over one object
    async fn open(&self, key: &Path) -> Result<BoxedReader>;

    /// Read a small object fully into memory
    async fn read_all(&self, key: &Path) -> Result<Bytes>;

    async fn delete_batch(&self, keys: &[Path]) -> Result<()>;
}

/// `BackupStorage` over any `object_store::ObjectStore`
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStorage {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }
}

#[async_trait]
impl BackupStorage for ObjectStorage {
    async fn list(&self, prefix: &Path) -> Result<Vec<ObjectMeta>> {
        let objects: Vec<ObjectMeta> = self.store.list(Some(prefix)).try_collect().await?;
        log::debug!("Listed {} objects under {}", objects.len(), prefix);
        Ok(objects)
    }

    async fn list_children(&self, prefix: &Path) -> Result<Vec<ObjectMeta>> {
        let listing = self.store.list_with_delimiter(Some(prefix)).await?;
        log::debug!(
            "Listed {} objects and {} folders directly under {}",
            listing.objects.len(),
            listing.common_prefixes.len(),
            prefix
        );
        Ok(listing.objects)
    }

    async fn open(&self, key: &Path) -> Result<BoxedReader> {
        let get_result = self.store.get(key).await?;
        let stream = get_result.into_stream().map_err(std::io::Error::other);
        Ok(Box::pin(StreamReader::new(stream)))
    }

    async fn read_all(&self, key: &Path) -> Result<Bytes> {
        let get_result = self.store.get(key).await?;
        Ok(get_result.bytes().await?)
    }

    async fn delete_batch(&self, keys: &[Path]) -> Result<()> {
        let locations = stream::iter(keys.iter().cloned().map(Ok)).boxed();
        let mut deleted = self.store.delete_stream(locations);
        while let Some(result) = deleted.next().await {
            match result {
                Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
