// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Key conventions for backups, sentinels and WAL segments

use object_store::path::Path;

pub const BASE_BACKUPS_DIR: &str = "basebackups";
pub const WAL_DIR: &str = "wal";
pub const TAR_PARTITIONS_DIR: &str = "tar_partitions";
pub const SENTINEL_SUFFIX: &str = ".sentinel";
pub const BACKUP_NAME_PREFIX: &str = "base_";

/// WAL segment names are 24 hex digits: timeline, log id, segment
pub const WAL_SEGMENT_NAME_LEN: usize = 24;

/// Maps backup and WAL names to object keys under one server prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageLayout {
    server: String,
}

impl StorageLayout {
    #[must_use]
    pub fn new(server: impl AsRef<str>) -> Self {
        Self {
            server: server.as_ref().trim_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    fn key(&self, rest: &str) -> Path {
        if self.server.is_empty() {
            Path::from(rest)
        } else {
            Path::from(format!("{}/{}", self.server, rest))
        }
    }

    #[must_use]
    pub fn backups_root(&self) -> Path {
        self.key(BASE_BACKUPS_DIR)
    }

    /// Folder holding a backup's members; also used as its marker key
    #[must_use]
    pub fn backup_folder(&self, name: &str) -> Path {
        self.key(&format!("{}/{}", BASE_BACKUPS_DIR, name))
    }

    #[must_use]
    pub fn sentinel(&self, name: &str) -> Path {
        self.key(&format!("{}/{}{}", BASE_BACKUPS_DIR, name, SENTINEL_SUFFIX))
    }

    /// Key of the `number`-th tar partition of a backup
    #[must_use]
    pub fn partition(&self, name: &str, number: usize, extension: &str) -> Path {
        self.key(&format!(
            "{}/{}/{}/part_{}.tar.{}",
            BASE_BACKUPS_DIR, name, TAR_PARTITIONS_DIR, number, extension
        ))
    }

    #[must_use]
    pub fn wal_root(&self) -> Path {
        self.key(WAL_DIR)
    }

    #[must_use]
    pub fn wal_segment(&self, file_name: &str) -> Path {
        self.key(&format!("{}/{}", WAL_DIR, file_name))
    }

    /// Backup name for a sentinel key sitting directly under the backups root
    #[must_use]
    pub fn backup_name_from_sentinel(&self, key: &Path) -> Option<String> {
        let root = self.backups_root();
        let parts: Vec<_> = key.prefix_match(&root)?.collect();
        let [only] = parts.as_slice() else {
            return None;
        };
        let file_name: &str = only.as_ref();
        file_name
            .strip_suffix(SENTINEL_SUFFIX)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// The earliest WAL segment a backup needs, taken from its `base_<segment>` name
#[must_use]
pub fn wal_file_name_from_backup(name: &str) -> Option<&str> {
    let rest = name.strip_prefix(BACKUP_NAME_PREFIX)?;
    let segment = rest.get(..WAL_SEGMENT_NAME_LEN)?;
    segment
        .bytes()
        .all(|b| b.is_ascii_hexdigit())
        .then_some(segment)
}

/// A WAL object's name without compression or history suffixes
#[must_use]
pub fn wal_segment_base(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}
