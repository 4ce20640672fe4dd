// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The two halves of one member's extraction
//!
//! The producer half (`decrypt_and_decompress_tar`) turns a member into a
//! plain tar stream written into a pipe; the consumer half (`extract_one`)
//! reads that pipe and hands each entry to a `TarInterpreter`.

use crate::codec::{CodecRegistry, NOP_EXTENSION, RAW_BUNDLE_EXTENSION, UNLINKED_EXTENSIONS, file_extension};
use crate::crypto::Crypter;
use crate::interpreter::{BundleEntry, TarInterpreter};
use crate::member::ReaderMaker;
use crate::{ArchiveError, Result};
use futures::StreamExt;
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite};

/// Writer filter that swallows zero-length writes
///
/// Some decoders emit empty writes; forwarding them into a pipe would let
/// the reading side mistake them for end of stream.
#[pin_project]
#[derive(Debug)]
pub struct EmptyWriteIgnorer<W> {
    #[pin]
    inner: W,
}

impl<W> EmptyWriteIgnorer<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite> AsyncWrite for EmptyWriteIgnorer<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        self.project().inner.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.project().inner.poll_shutdown(cx)
    }
}

/// Open `member`, decrypt it if needed and decode it into `writer` as a
/// plain tar stream
pub async fn decrypt_and_decompress_tar(
    writer: &mut (dyn AsyncWrite + Send + Unpin),
    member: &dyn ReaderMaker,
    codecs: &CodecRegistry,
    crypter: &dyn Crypter,
) -> Result<()> {
    let path = member.path();
    let mut src = member.reader().await?;

    if crypter.is_used() {
        src = crypter
            .decrypt(src)
            .await
            .map_err(|source| ArchiveError::Decrypt {
                path: path.to_string(),
                source,
            })?;
    }

    let extension = file_extension(path);
    if let Some(decompressor) = codecs.find(extension) {
        let written = decompressor
            .decompress(writer, src)
            .await
            .map_err(|source| ArchiveError::Codec {
                path: path.to_string(),
                extension: extension.to_string(),
                source,
            })?;
        log::debug!("Decompressed {} bytes from {}", written, path);
        return Ok(());
    }

    match extension {
        RAW_BUNDLE_EXTENSION => {
            let copied = tokio::io::copy(&mut src, writer)
                .await
                .map_err(|source| ArchiveError::Copy {
                    path: path.to_string(),
                    source,
                })?;
            log::debug!("Copied {} raw bytes from {}", copied, path);
            Ok(())
        }
        NOP_EXTENSION => Ok(()),
        unlinked if UNLINKED_EXTENSIONS.contains(&unlinked) => {
            Err(ArchiveError::UnsupportedFileType {
                path: path.to_string(),
                extension: unlinked.to_string(),
                detail: format!("{} support is not linked into this build", unlinked),
            })
        }
        other => Err(ArchiveError::UnsupportedFileType {
            path: path.to_string(),
            extension: other.to_string(),
            detail: format!(
                "expected one of {:?}, {:?} or {:?}",
                codecs.extensions(),
                RAW_BUNDLE_EXTENSION,
                NOP_EXTENSION
            ),
        }),
    }
}

/// Read one tar bundle from `src`, interpreting its entries in order
///
/// Bytes after the end-of-archive marker are drained so the writing side
/// never sees its pipe closed early. Returns the number of entries.
pub async fn extract_one(
    interpreter: &dyn TarInterpreter,
    src: &mut (dyn AsyncRead + Send + Unpin),
    path: &str,
) -> Result<usize> {
    let tar_error = |source| ArchiveError::Tar {
        path: path.to_string(),
        source,
    };

    let mut count = 0;
    {
        let mut archive = tokio_tar::Archive::new(&mut *src);
        let mut entries = archive.entries().map_err(tar_error)?;
        while let Some(entry) = entries.next().await {
            let mut entry = entry.map_err(tar_error)?;
            let entry_path = entry.path().map_err(tar_error)?.into_owned();
            let header = entry.header().clone();
            interpreter
                .interpret(BundleEntry {
                    path: entry_path.clone(),
                    header,
                    reader: &mut entry,
                })
                .await
                .map_err(|source| ArchiveError::Interpret {
                    path: path.to_string(),
                    entry: entry_path,
                    source,
                })?;
            count += 1;
        }
    }

    let trailing = tokio::io::copy(src, &mut tokio::io::sink())
        .await
        .map_err(tar_error)?;
    log::debug!("Extracted {} entries from {} ({} trailing bytes)", count, path, trailing);
    Ok(count)
}
