// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Enumerating backups and reading their sentinels

use crate::sentinel::BackupSentinelDto;
use crate::{Result, RetentionError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use remote::{BackupStorage, StorageLayout, wal_file_name_from_backup};
use std::sync::Arc;

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTime {
    pub name: String,
    pub time: DateTime<Utc>,
    /// Earliest WAL segment the backup needs, when its name records one
    pub wal_file_name: Option<String>,
}

impl BackupTime {
    /// Row for `name`, deriving the WAL segment from the name
    #[must_use]
    pub fn new(name: impl Into<String>, time: DateTime<Utc>) -> Self {
        let name = name.into();
        let wal_file_name = wal_file_name_from_backup(&name).map(str::to_string);
        Self {
            name,
            time,
            wal_file_name,
        }
    }
}

#[async_trait]
pub trait BackupCatalog: Send + Sync {
    /// Every backup, newest first
    async fn list_backups(&self) -> Result<Vec<BackupTime>>;

    async fn fetch_sentinel(&self, name: &str) -> Result<BackupSentinelDto>;
}

/// Catalog read from the sentinels in a backup store
pub struct StoreCatalog {
    storage: Arc<dyn BackupStorage>,
    layout: StorageLayout,
}

impl StoreCatalog {
    #[must_use]
    pub fn new(storage: Arc<dyn BackupStorage>, layout: StorageLayout) -> Self {
        Self { storage, layout }
    }
}

/// Order rows newest first, breaking time ties by name
pub fn sort_newest_first(backups: &mut [BackupTime]) {
    backups.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| b.name.cmp(&a.name)));
}

#[async_trait]
impl BackupCatalog for StoreCatalog {
    async fn list_backups(&self) -> Result<Vec<BackupTime>> {
        let objects = self.storage.list_children(&self.layout.backups_root()).await?;
        let mut backups: Vec<BackupTime> = objects
            .into_iter()
            .filter_map(|meta| {
                let name = self.layout.backup_name_from_sentinel(&meta.location)?;
                Some(BackupTime::new(name, meta.last_modified))
            })
            .collect();
        sort_newest_first(&mut backups);
        log::debug!("Catalog holds {} backup(s)", backups.len());
        Ok(backups)
    }

    async fn fetch_sentinel(&self, name: &str) -> Result<BackupSentinelDto> {
        let bytes = self
            .storage
            .read_all(&self.layout.sentinel(name))
            .await
            .map_err(|source| RetentionError::Sentinel {
                name: name.to_string(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|e| RetentionError::MalformedSentinel {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}
