// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Archive member sources
//!
//! A member is anything that can name itself and hand out a fresh byte
//! stream on demand. `reader()` may be called once per extraction attempt,
//! so implementations must not assume a single use.

use crate::{ArchiveError, Result};
use async_trait::async_trait;
use object_store::path::Path;
use remote::{BackupStorage, BoxedReader, RemoteError, StorageLayout};
use std::path::PathBuf;
use std::sync::Arc;

#[async_trait]
pub trait ReaderMaker: Send + Sync {
    /// Logical path; its extension selects the codec
    fn path(&self) -> &str;

    /// Open an independent stream over the member's bytes
    async fn reader(&self) -> Result<BoxedReader>;
}

/// A member stored as one object in the backup store
pub struct StoreMember {
    storage: Arc<dyn BackupStorage>,
    key: Path,
    display: String,
}

impl StoreMember {
    #[must_use]
    pub fn new(storage: Arc<dyn BackupStorage>, key: Path) -> Self {
        let display = key.to_string();
        Self {
            storage,
            key,
            display,
        }
    }
}

#[async_trait]
impl ReaderMaker for StoreMember {
    fn path(&self) -> &str {
        &self.display
    }

    async fn reader(&self) -> Result<BoxedReader> {
        self.storage
            .open(&self.key)
            .await
            .map_err(|source| ArchiveError::Open {
                path: self.display.clone(),
                source,
            })
    }
}

/// A member read from the local filesystem
pub struct FileMember {
    path: PathBuf,
    display: String,
}

impl FileMember {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.to_string_lossy().into_owned();
        Self { path, display }
    }
}

#[async_trait]
impl ReaderMaker for FileMember {
    fn path(&self) -> &str {
        &self.display
    }

    async fn reader(&self) -> Result<BoxedReader> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| ArchiveError::Open {
                path: self.display.clone(),
                source: RemoteError::Io(e),
            })?;
        Ok(Box::pin(file))
    }
}

/// Every member object stored for backup `name`, ordered by key
pub async fn backup_members(
    storage: Arc<dyn BackupStorage>,
    layout: &StorageLayout,
    name: &str,
) -> Result<Vec<Arc<dyn ReaderMaker>>> {
    let folder = layout.backup_folder(name);
    let mut keys: Vec<Path> = storage
        .list(&folder)
        .await?
        .into_iter()
        .map(|meta| meta.location)
        .collect();
    keys.sort();

    log::debug!("Backup {} has {} member(s)", name, keys.len());

    Ok(keys
        .into_iter()
        .map(|key| Arc::new(StoreMember::new(storage.clone(), key)) as Arc<dyn ReaderMaker>)
        .collect())
}
