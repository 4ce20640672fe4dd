// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use retention::{DeleteArguments, DeleteOutcome, execute_delete};

use crate::common::Backend;

/// Run `delete <retain|before> ...` and report what happened
pub async fn delete_command(backend: &Backend, params: &[String], out: &mut impl Write) -> Result<()> {
    let args = DeleteArguments::parse(params)?;
    let catalog = backend.catalog();
    let outcome = execute_delete(&catalog, backend.storage.clone(), &backend.layout, &args).await?;

    match outcome {
        DeleteOutcome::NothingToDelete => writeln!(out, "Nothing to delete")?,
        DeleteOutcome::TargetMissing { target } => {
            writeln!(out, "Backup {} not found; nothing deleted", target)?
        }
        DeleteOutcome::DryRun(plan) => {
            writeln!(out, "Dry run: target {}", plan.target())?;
            for backup in plan.doomed() {
                writeln!(out, "would delete {}", backup.name)?;
            }
            if let Some(cut) = plan.wal_cut_file_name() {
                writeln!(out, "would delete WAL before {}", cut)?;
            }
            writeln!(out, "Pass --confirm to delete")?;
        }
        DeleteOutcome::Deleted {
            backups,
            objects,
            wal_segments,
        } => writeln!(
            out,
            "Deleted {} backup(s) ({} objects) and {} WAL segment(s)",
            backups, objects, wal_segments
        )?,
    }
    Ok(())
}
