// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Removing objects in bounded batches

use crate::catalog::BackupTime;
use crate::{Result, RetentionError};
use object_store::path::Path;
use remote::{BackupStorage, StorageLayout, WAL_SEGMENT_NAME_LEN, wal_segment_base};
use std::sync::Arc;

/// Most keys sent in one delete request
pub const DELETE_BATCH_SIZE: usize = 1000;

pub struct BatchDeleter {
    storage: Arc<dyn BackupStorage>,
    layout: StorageLayout,
}

fn is_wal_segment(base: &str) -> bool {
    base.len() == WAL_SEGMENT_NAME_LEN && base.bytes().all(|b| b.is_ascii_hexdigit())
}

impl BatchDeleter {
    #[must_use]
    pub fn new(storage: Arc<dyn BackupStorage>, layout: StorageLayout) -> Self {
        Self { storage, layout }
    }

    /// Delete `keys` in batches of at most `DELETE_BATCH_SIZE`
    ///
    /// Stops at the first failed batch. Returns the number of keys deleted.
    pub async fn delete_keys(&self, keys: &[Path], what: &str) -> Result<usize> {
        let batches = keys.len().div_ceil(DELETE_BATCH_SIZE);
        for (number, batch) in keys.chunks(DELETE_BATCH_SIZE).enumerate() {
            self.storage
                .delete_batch(batch)
                .await
                .map_err(|source| RetentionError::Deletion {
                    what: what.to_string(),
                    source,
                })?;
            log::debug!(
                "Deleted batch {}/{} of {} ({} keys)",
                number + 1,
                batches,
                what,
                batch.len()
            );
        }
        Ok(keys.len())
    }

    /// Member keys stored under backup `name`'s folder
    pub async fn backup_member_keys(&self, name: &str) -> Result<Vec<Path>> {
        let mut keys: Vec<Path> = self
            .storage
            .list(&self.layout.backup_folder(name))
            .await
            .map_err(|source| RetentionError::Deletion {
                what: format!("backup {}", name),
                source,
            })?
            .into_iter()
            .map(|meta| meta.location)
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Delete a backup's members, then its sentinel and folder marker
    ///
    /// The sentinel goes last so an interrupted run leaves the backup in
    /// the catalog and a rerun finishes it.
    pub async fn delete_backup(&self, name: &str) -> Result<usize> {
        let what = format!("backup {}", name);
        let members = self.backup_member_keys(name).await?;
        let markers = [self.layout.sentinel(name), self.layout.backup_folder(name)];

        let deleted = self.delete_keys(&members, &what).await?
            + self.delete_keys(&markers, &what).await?;
        log::info!("Deleted backup {} ({} objects)", name, deleted);
        Ok(deleted)
    }

    /// Delete each backup in turn; returns the total number of objects
    pub async fn delete_backups(&self, backups: &[BackupTime]) -> Result<usize> {
        let mut total = 0;
        for backup in backups {
            total += self.delete_backup(&backup.name).await?;
        }
        Ok(total)
    }

    /// WAL segment keys whose segment sorts strictly below `cut`
    pub async fn wal_keys_before(&self, cut: &str) -> Result<Vec<Path>> {
        let what = || format!("WAL before {}", cut);
        let mut keys: Vec<Path> = self
            .storage
            .list(&self.layout.wal_root())
            .await
            .map_err(|source| RetentionError::Deletion {
                what: what(),
                source,
            })?
            .into_iter()
            .map(|meta| meta.location)
            .filter(|key| {
                key.filename()
                    .map(wal_segment_base)
                    .is_some_and(|base| is_wal_segment(base) && base < cut)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }

    pub async fn delete_wal_before(&self, cut: &str) -> Result<usize> {
        let keys = self.wal_keys_before(cut).await?;
        let deleted = self.delete_keys(&keys, &format!("WAL before {}", cut)).await?;
        log::info!("Deleted {} WAL segment(s) before {}", deleted, cut);
        Ok(deleted)
    }
}
