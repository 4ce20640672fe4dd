// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Bundle consumers: what happens to each entry of a decoded tar stream

use async_trait::async_trait;
use std::io::{Error, ErrorKind};
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_tar::Header;

/// One entry of a bundle, handed to a `TarInterpreter`
///
/// The entry's bytes are only available while the interpreter runs; the
/// next entry is not read until `interpret` returns.
pub struct BundleEntry<'a> {
    pub path: PathBuf,
    pub header: Header,
    pub reader: &'a mut (dyn AsyncRead + Send + Unpin),
}

/// Materializes bundle entries
///
/// Called concurrently from every member being extracted, so
/// implementations must be safe to share across tasks.
#[async_trait]
pub trait TarInterpreter: Send + Sync {
    async fn interpret(&self, entry: BundleEntry<'_>) -> std::io::Result<()>;
}

/// Writes bundle entries below a destination directory
#[derive(Debug, Clone)]
pub struct DirectoryInterpreter {
    root: PathBuf,
}

impl DirectoryInterpreter {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Entry path relative to the restore root; absolute paths and `..` are refused
fn relative_entry_path(path: &Path) -> std::io::Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("refusing to extract {} outside the restore root", path.display()),
                ));
            }
        }
    }
    Ok(relative)
}

async fn ensure_parent(target: &Path) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Remove a file or link left at `target` by an earlier attempt
async fn remove_stale(target: &Path) -> std::io::Result<()> {
    match tokio::fs::symlink_metadata(target).await {
        Ok(metadata) if !metadata.is_dir() => tokio::fs::remove_file(target).await,
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl TarInterpreter for DirectoryInterpreter {
    async fn interpret(&self, entry: BundleEntry<'_>) -> std::io::Result<()> {
        let relative = relative_entry_path(&entry.path)?;
        let target = self.root.join(&relative);
        let entry_type = entry.header.entry_type();

        if entry_type.is_dir() {
            tokio::fs::create_dir_all(&target).await?;
        } else if entry_type.is_file() {
            ensure_parent(&target).await?;
            remove_stale(&target).await?;
            let mut file = tokio::fs::File::create(&target).await?;
            let size = tokio::io::copy(entry.reader, &mut file).await?;
            file.flush().await?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(mode) = entry.header.mode() {
                    tokio::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode & 0o7777))
                        .await?;
                }
            }
            log::debug!("Restored {} ({} bytes)", relative.display(), size);
        } else if entry_type.is_symlink() {
            let link = entry.header.link_name()?.ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidData,
                    format!("symlink {} has no target", relative.display()),
                )
            })?;
            ensure_parent(&target).await?;
            remove_stale(&target).await?;
            #[cfg(unix)]
            tokio::fs::symlink(&*link, &target).await?;
            #[cfg(not(unix))]
            log::warn!("Skipping symlink {} -> {}", relative.display(), link.display());
        } else {
            log::warn!(
                "Skipping unsupported entry {} ({:?})",
                relative.display(),
                entry_type
            );
        }
        Ok(())
    }
}
