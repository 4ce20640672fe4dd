// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Retention: planning and applying `delete` against a backup store
//!
//! - **target**: the `retain` / `before` argument grammar
//! - **catalog**: backups listed newest first, with their sentinels
//! - **planner**: resolves the target (following incremental backups to
//!   their full ancestor on request) and computes the skip line and WAL
//!   cut line
//! - **deleter**: removes keys in batches of at most 1000
//! - **delete**: the end-to-end `execute_delete`
//!
//! Planning never has side effects; deletion starts only after the plan is
//! complete and only when the arguments carry `--confirm`.

mod catalog;
mod delete;
mod deleter;
mod error;
mod planner;
mod sentinel;
mod target;

pub use catalog::{BackupCatalog, BackupTime, StoreCatalog, sort_newest_first};
pub use delete::{DeleteOutcome, execute_delete};
pub use deleter::{BatchDeleter, DELETE_BATCH_SIZE};
pub use error::RetentionError;
pub use planner::{DeletionPlan, RetentionPlanner, compute_deletion_skipline};
pub use sentinel::BackupSentinelDto;
pub use target::{DELETE_USAGE, DeleteArguments, DeleteMode, DeleteModifier, DeleteTarget};

pub type Result<T> = std::result::Result<T, RetentionError>;
