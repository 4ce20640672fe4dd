// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Deciding which backups and WAL segments a `delete` removes
//!
//! The catalog is scanned once in the order it is given. Every row up to
//! and including the target is retained, every row after it is doomed. The
//! catalog lists newest first, so the retained rows are the target and
//! everything newer. The WAL cut line is the smallest WAL segment needed
//! by any retained row.

use crate::catalog::{BackupCatalog, BackupTime};
use crate::target::{DeleteArguments, DeleteTarget};
use crate::{Result, RetentionError};

/// Scan `backups` for `target`
///
/// Returns the index of the target (the catalog length when it is absent)
/// and the minimum WAL file name over every row up to and including it.
pub fn compute_deletion_skipline(backups: &[BackupTime], target: &str) -> (usize, Option<String>) {
    let mut skip = true;
    let mut skip_line = backups.len();
    let mut wal_cut: Option<&str> = None;

    for (index, backup) in backups.iter().enumerate() {
        if skip {
            log::info!("{} skipped", backup.name);
            if let Some(wal) = backup.wal_file_name.as_deref() {
                if wal_cut.is_none_or(|current| wal < current) {
                    wal_cut = Some(wal);
                }
            }
        } else {
            log::info!("{} will be deleted", backup.name);
        }
        if backup.name == target {
            skip = false;
            skip_line = index;
        }
    }

    (skip_line, wal_cut.map(str::to_string))
}

/// The computed, side-effect free outcome of planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    backups: Vec<BackupTime>,
    target: String,
    skip_line: usize,
    wal_cut_file_name: Option<String>,
}

impl DeletionPlan {
    #[must_use]
    pub fn compute(backups: Vec<BackupTime>, target: impl Into<String>) -> Self {
        let target = target.into();
        let (skip_line, wal_cut_file_name) = compute_deletion_skipline(&backups, &target);
        Self {
            backups,
            target,
            skip_line,
            wal_cut_file_name,
        }
    }

    #[must_use]
    pub fn skip_line(&self) -> usize {
        self.skip_line
    }

    /// WAL segments strictly below this name are no longer needed
    #[must_use]
    pub fn wal_cut_file_name(&self) -> Option<&str> {
        self.wal_cut_file_name.as_deref()
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn target_found(&self) -> bool {
        self.skip_line < self.backups.len()
    }

    #[must_use]
    pub fn backups(&self) -> &[BackupTime] {
        &self.backups
    }

    #[must_use]
    pub fn retained(&self) -> &[BackupTime] {
        let end = self.skip_line.saturating_add(1).min(self.backups.len());
        &self.backups[..end]
    }

    #[must_use]
    pub fn doomed(&self) -> &[BackupTime] {
        self.backups
            .get(self.skip_line.saturating_add(1)..)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn has_deletions(&self) -> bool {
        !self.doomed().is_empty()
    }

    pub fn log_summary(&self) {
        if !self.target_found() {
            log::warn!(
                "Target {} is not in the catalog of {} backup(s); nothing will be deleted",
                self.target,
                self.backups.len()
            );
            return;
        }
        log::info!(
            "Retaining {} backup(s) through {}, deleting {}",
            self.retained().len(),
            self.target,
            self.doomed().len()
        );
        for backup in self.doomed() {
            log::info!("  delete {} ({})", backup.name, backup.time);
        }
        match (self.has_deletions(), self.wal_cut_file_name()) {
            (true, Some(cut)) => log::info!("WAL segments before {} will be deleted", cut),
            (true, None) => log::info!("No WAL cut line; WAL segments are kept"),
            (false, _) => {}
        }
    }
}

/// Resolves delete arguments against a catalog into a plan
pub struct RetentionPlanner<'a> {
    catalog: &'a dyn BackupCatalog,
}

impl<'a> RetentionPlanner<'a> {
    #[must_use]
    pub fn new(catalog: &'a dyn BackupCatalog) -> Self {
        Self { catalog }
    }

    /// Read the catalog and plan; `None` when the arguments select no backup
    pub async fn plan(&self, args: &DeleteArguments) -> Result<Option<DeletionPlan>> {
        let backups = self.catalog.list_backups().await?;

        let Some(selected) = self.select(&backups, args).await? else {
            log::info!(
                "{:?} selects none of the {} backup(s); nothing to delete",
                args.target,
                backups.len()
            );
            return Ok(None);
        };

        let target = self.effective_target(&backups, selected, args).await?;
        let plan = DeletionPlan::compute(backups, target);
        Ok(Some(plan))
    }

    /// The backup named by the arguments, before incremental resolution
    async fn select(&self, backups: &[BackupTime], args: &DeleteArguments) -> Result<Option<String>> {
        match &args.target {
            DeleteTarget::Name(name) => Ok(Some(name.clone())),
            DeleteTarget::Time(time) => Ok(backups
                .iter()
                .filter(|backup| backup.time <= *time)
                .max_by(|a, b| a.time.cmp(&b.time))
                .map(|backup| backup.name.clone())),
            DeleteTarget::Count(count) if args.full() => {
                let mut full_seen = 0;
                for backup in backups {
                    if self.catalog.fetch_sentinel(&backup.name).await?.is_incremental() {
                        continue;
                    }
                    full_seen += 1;
                    if full_seen == *count {
                        return Ok(Some(backup.name.clone()));
                    }
                }
                Ok(None)
            }
            DeleteTarget::Count(count) => Ok(count
                .checked_sub(1)
                .and_then(|index| backups.get(index))
                .map(|backup| backup.name.clone())),
        }
    }

    /// Follow an incremental target to its full ancestor when allowed
    async fn effective_target(
        &self,
        backups: &[BackupTime],
        name: String,
        args: &DeleteArguments,
    ) -> Result<String> {
        if !backups.iter().any(|backup| backup.name == name) {
            return Ok(name);
        }

        let sentinel = self.catalog.fetch_sentinel(&name).await?;
        if !sentinel.is_incremental() {
            return Ok(name);
        }

        if args.find_full() {
            let Some(full_name) = sentinel.full_ancestor() else {
                return Err(RetentionError::MalformedSentinel {
                    name,
                    reason: "incremental backup without IncrementFullName".to_string(),
                });
            };
            log::info!("{} is incremental, retaining from its full backup {}", name, full_name);
            Ok(full_name.to_string())
        } else if args.full() {
            Err(RetentionError::TargetNotFull { name })
        } else {
            Err(RetentionError::IncrementalTarget { name })
        }
    }
}
