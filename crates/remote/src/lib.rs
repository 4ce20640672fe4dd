// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Storage plumbing shared by restore and retention
//!
//! This crate owns everything that knows about the object store holding
//! base backups and WAL segments:
//!
//! - **RemoteConfig**: YAML configuration naming the store, credentials,
//!   the server key prefix, download concurrency and the optional
//!   encryption key
//! - **StorageLayout**: the key conventions for backups, sentinels and WAL
//! - **BackupStorage**: the narrow list / get / delete-batch capability the
//!   restore pipeline and the retention planner need, with an adapter over
//!   any `object_store::ObjectStore`
//!
//! # Layout
//!
//! ```text
//! <server>/basebackups/<name>/tar_partitions/part_1.tar.lz4
//! <server>/basebackups/<name>.sentinel
//! <server>/wal/000000010000000000000002.lz4
//! ```
//!
//! # Usage
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use remote::{BackupStorage, ObjectStorage, RemoteConfig, build_object_store};
//!
//! let config = RemoteConfig::load(std::path::Path::new("/etc/basekeeper.yaml")).await?;
//! let storage = ObjectStorage::new(build_object_store(&config)?);
//! let layout = config.layout();
//!
//! for meta in storage.list(&layout.backups_root()).await? {
//!     println!("{}", meta.location);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod layout;
mod storage;

pub use config::{
    CONFIG_ENV, DEFAULT_DOWNLOAD_CONCURRENCY, ENCRYPTION_KEY_LEN, RemoteConfig,
    build_object_store, resolve_config_path,
};
pub use error::RemoteError;
pub use layout::{
    BACKUP_NAME_PREFIX, BASE_BACKUPS_DIR, SENTINEL_SUFFIX, StorageLayout, TAR_PARTITIONS_DIR,
    WAL_DIR, WAL_SEGMENT_NAME_LEN, wal_file_name_from_backup, wal_segment_base,
};
pub use storage::{BackupStorage, BoxedReader, ObjectStorage};

/// Result type for remote operations
pub type Result<T> = std::result::Result<T, RemoteError>;
