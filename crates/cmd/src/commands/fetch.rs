// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use archive::{DirectoryInterpreter, backup_members};
use retention::BackupCatalog;

use crate::common::Backend;

/// Backup name that selects the newest backup in the catalog
pub const LATEST: &str = "LATEST";

async fn resolve_backup_name(backend: &Backend, name: &str) -> Result<String> {
    if name != LATEST {
        return Ok(name.to_string());
    }
    let backups = backend.catalog().list_backups().await?;
    backups
        .into_iter()
        .next()
        .map(|backup| backup.name)
        .ok_or_else(|| anyhow!("No backups found"))
}

/// Restore backup `name` (or `LATEST`) into `dest`
pub async fn backup_fetch_command(backend: &Backend, dest: &Path, name: &str) -> Result<()> {
    let name = resolve_backup_name(backend, name).await?;

    let members = backup_members(backend.storage.clone(), &backend.layout, &name).await?;
    if members.is_empty() {
        return Err(anyhow!("Backup {} not found", name));
    }

    tokio::fs::create_dir_all(dest).await?;
    log::info!(
        "Fetching backup {} ({} member(s)) into {}",
        name,
        members.len(),
        dest.display()
    );

    let extractor = backend.extractor(Arc::new(DirectoryInterpreter::new(dest)))?;
    extractor.extract_all(members).await?;

    log::info!("Backup {} restored", name);
    Ok(())
}
