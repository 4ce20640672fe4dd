// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::Result;
use crate::catalog::BackupCatalog;
use crate::deleter::BatchDeleter;
use crate::planner::{DeletionPlan, RetentionPlanner};
use crate::target::DeleteArguments;
use remote::{BackupStorage, StorageLayout};
use std::sync::Arc;

/// What a `delete` invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The arguments selected no backup, or the target is already the oldest
    NothingToDelete,
    /// The resolved target is not in the catalog; everything is kept
    TargetMissing { target: String },
    /// The plan was computed and logged but not applied
    DryRun(DeletionPlan),
    Deleted {
        backups: usize,
        objects: usize,
        wal_segments: usize,
    },
}

/// Plan a deletion from a fresh catalog read and apply it unless dry-run
///
/// Doomed backups are removed before WAL so a failure part way never
/// leaves a surviving backup without its log. Any delete failure ends the
/// run with `RetentionError::Deletion`.
pub async fn execute_delete(
    catalog: &dyn BackupCatalog,
    storage: Arc<dyn BackupStorage>,
    layout: &StorageLayout,
    args: &DeleteArguments,
) -> Result<DeleteOutcome> {
    let Some(plan) = RetentionPlanner::new(catalog).plan(args).await? else {
        return Ok(DeleteOutcome::NothingToDelete);
    };
    plan.log_summary();

    if !plan.target_found() {
        return Ok(DeleteOutcome::TargetMissing {
            target: plan.target().to_string(),
        });
    }

    if args.dry_run {
        log::info!("Dry run finished.");
        return Ok(DeleteOutcome::DryRun(plan));
    }

    if !plan.has_deletions() {
        return Ok(DeleteOutcome::NothingToDelete);
    }

    let deleter = BatchDeleter::new(storage, layout.clone());
    let objects = deleter.delete_backups(plan.doomed()).await?;
    let wal_segments = match plan.wal_cut_file_name() {
        Some(cut) => deleter.delete_wal_before(cut).await?,
        None => 0,
    };

    Ok(DeleteOutcome::Deleted {
        backups: plan.doomed().len(),
        objects,
        wal_segments,
    })
}
