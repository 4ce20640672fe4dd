// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for restore operations

use remote::RemoteError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to open {path}: {source}")]
    Open { path: String, source: RemoteError },

    #[error("Failed to decrypt {path}: {source}")]
    Decrypt {
        path: String,
        source: std::io::Error,
    },

    #[error("Unsupported file type {extension:?} for {path}: {detail}")]
    UnsupportedFileType {
        path: String,
        extension: String,
        detail: String,
    },

    #[error("{extension} decompress failed for {path}. Is archive encrypted?: {source}")]
    Codec {
        path: String,
        extension: String,
        source: std::io::Error,
    },

    #[error("Failed to copy raw bundle {path}: {source}")]
    Copy {
        path: String,
        source: std::io::Error,
    },

    #[error("Bundle read failed in {path}: {source}")]
    Tar {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to materialize {entry:?} from {path}: {source}")]
    Interpret {
        path: String,
        entry: PathBuf,
        source: std::io::Error,
    },

    #[error("No archive members were provided to extract")]
    NoMembers,

    #[error("Extraction task for {path} did not complete: {reason}")]
    TaskFailed { path: String, reason: String },

    #[error("Extraction failed for {failed} member(s) after retrying: {source}")]
    Exhausted {
        failed: usize,
        source: Box<ArchiveError>,
    },

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl ArchiveError {
    /// Path of the archive member the error concerns, if any
    #[must_use]
    pub fn member_path(&self) -> Option<&str> {
        match self {
            ArchiveError::Open { path, .. }
            | ArchiveError::Decrypt { path, .. }
            | ArchiveError::UnsupportedFileType { path, .. }
            | ArchiveError::Codec { path, .. }
            | ArchiveError::Copy { path, .. }
            | ArchiveError::Tar { path, .. }
            | ArchiveError::Interpret { path, .. }
            | ArchiveError::TaskFailed { path, .. } => Some(path),
            ArchiveError::Exhausted { source, .. } => source.member_path(),
            ArchiveError::NoMembers | ArchiveError::Remote(_) => None,
        }
    }
}
