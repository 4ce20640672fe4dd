// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Concurrent restore of backup archives
//!
//! A backup is a set of members, each an independently compressed (and
//! optionally encrypted) tar bundle. Restoring streams every member
//! through decrypt, decompress and untar, with the entries handed to a
//! [`TarInterpreter`].
//!
//! # Example
//!
//! ```no_run
//! use archive::{DirectoryInterpreter, Extractor, backup_members};
//! use remote::{ObjectStorage, RemoteConfig, StorageLayout, build_object_store};
//! use std::sync::Arc;
//!
//! # async fn example(config: RemoteConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(ObjectStorage::new(build_object_store(&config)?));
//! let layout = config.layout();
//! let members = backup_members(storage, &layout, "base_000000010000000000000002").await?;
//!
//! let extractor = Extractor::new(Arc::new(DirectoryInterpreter::new("/var/lib/restore")))
//!     .with_max_concurrency(config.download_concurrency);
//! extractor.extract_all(members).await?;
//! # Ok(())
//! # }
//! ```

mod codec;
mod crypto;
mod error;
mod extract;
mod interpreter;
mod member;
mod stage;

pub use codec::{
    Codec, CodecRegistry, Decompressor, NOP_EXTENSION, RAW_BUNDLE_EXTENSION, UNLINKED_EXTENSIONS,
    file_extension,
};
pub use crypto::{Crypter, NoCrypter, SEAL_FRAME_SIZE, SEAL_MAGIC, SealedCrypter};
pub use error::ArchiveError;
pub use extract::{Extractor, MAX_EXTRACT_CONCURRENCY, PIPE_CAPACITY};
pub use interpreter::{BundleEntry, DirectoryInterpreter, TarInterpreter};
pub use member::{FileMember, ReaderMaker, StoreMember, backup_members};
pub use stage::{EmptyWriteIgnorer, decrypt_and_decompress_tar, extract_one};

pub type Result<T> = std::result::Result<T, ArchiveError>;
