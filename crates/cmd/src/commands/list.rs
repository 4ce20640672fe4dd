// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use chrono::SecondsFormat;
use retention::BackupCatalog;

use crate::common::Backend;

/// Print the catalog, newest first
pub async fn backup_list_command(backend: &Backend, out: &mut impl Write) -> Result<()> {
    let backups = backend.catalog().list_backups().await?;
    if backups.is_empty() {
        log::info!("No backups found");
        return Ok(());
    }

    writeln!(out, "{:<40} {:<22} wal_segment_backup_start", "name", "last_modified")?;
    for backup in &backups {
        writeln!(
            out,
            "{:<40} {:<22} {}",
            backup.name,
            backup.time.to_rfc3339_opts(SecondsFormat::Secs, true),
            backup.wal_file_name.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}
