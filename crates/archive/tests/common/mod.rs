// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Fixtures shared by the extraction tests

#![allow(dead_code)]

use archive::{ArchiveError, BundleEntry, Codec, ReaderMaker, TarInterpreter};
use async_compression::tokio::write::{BrotliEncoder, GzipEncoder, Lz4Encoder, LzmaEncoder, ZstdEncoder};
use async_trait::async_trait;
use bytes::Bytes;
use remote::{BoxedReader, RemoteError};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

/// Build an uncompressed tar bundle holding `files`
pub async fn tar_bundle(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tokio_tar::Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tokio_tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o600);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_slice())
            .await
            .unwrap();
    }
    builder.into_inner().await.unwrap()
}

async fn finish<W: tokio::io::AsyncWrite + Unpin>(mut encoder: W, data: &[u8]) -> W {
    encoder.write_all(data).await.unwrap();
    encoder.shutdown().await.unwrap();
    encoder
}

/// A tar bundle whose first entry is the symlink `link` -> `target`
pub async fn tar_bundle_with_symlink(link: &str, target: &str, files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tokio_tar::Builder::new(Vec::new());
    let mut header = tokio_tar::Header::new_gnu();
    header.set_entry_type(tokio_tar::EntryType::Symlink);
    header.set_size(0);
    header.set_mode(0o777);
    header.set_link_name(target).unwrap();
    header.set_cksum();
    builder
        .append_data(&mut header, link, tokio::io::empty())
        .await
        .unwrap();
    for (name, content) in files {
        let mut header = tokio_tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o600);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_slice())
            .await
            .unwrap();
    }
    builder.into_inner().await.unwrap()
}

/// Compress `data` the way `codec` expects to read it
pub async fn compress(codec: Codec, data: &[u8]) -> Vec<u8> {
    match codec {
        Codec::Lz4 => finish(Lz4Encoder::new(Vec::new()), data).await.into_inner(),
        Codec::Lzma => finish(LzmaEncoder::new(Vec::new()), data).await.into_inner(),
        Codec::Zstd => finish(ZstdEncoder::new(Vec::new()), data).await.into_inner(),
        Codec::Brotli => finish(BrotliEncoder::new(Vec::new()), data).await.into_inner(),
        Codec::Gzip => finish(GzipEncoder::new(Vec::new()), data).await.into_inner(),
    }
}

/// Files named `<prefix>/file_<i>` with distinct contents
pub fn sample_files(prefix: &str, count: usize) -> Vec<(String, Vec<u8>)> {
    (0..count)
        .map(|i| {
            let content = format!("{} file {} ", prefix, i).repeat(i + 1).into_bytes();
            (format!("{}/file_{}", prefix, i), content)
        })
        .collect()
}

/// A member served from memory
pub struct MemoryMember {
    pub path: String,
    pub bytes: Vec<u8>,
    pub opens: AtomicUsize,
}

impl MemoryMember {
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
            opens: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ReaderMaker for MemoryMember {
    fn path(&self) -> &str {
        &self.path
    }

    async fn reader(&self) -> archive::Result<BoxedReader> {
        let _ = self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::pin(std::io::Cursor::new(self.bytes.clone())))
    }
}

/// A member whose first `failures` opens fail
pub struct FlakyMember {
    pub inner: MemoryMember,
    pub failures: usize,
}

#[async_trait]
impl ReaderMaker for FlakyMember {
    fn path(&self) -> &str {
        self.inner.path()
    }

    async fn reader(&self) -> archive::Result<BoxedReader> {
        let attempt = self.inner.opens.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(ArchiveError::Open {
                path: self.inner.path.clone(),
                source: RemoteError::Configuration("simulated transient failure".to_string()),
            });
        }
        Ok(Box::pin(std::io::Cursor::new(self.inner.bytes.clone())))
    }
}

/// A member whose first `failures` opens reset the connection after `cut` bytes
pub struct TruncatingMember {
    pub inner: MemoryMember,
    pub failures: usize,
    pub cut: usize,
}

#[async_trait]
impl ReaderMaker for TruncatingMember {
    fn path(&self) -> &str {
        self.inner.path()
    }

    async fn reader(&self) -> archive::Result<BoxedReader> {
        let attempt = self.inner.opens.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.failures {
            return Ok(Box::pin(std::io::Cursor::new(self.inner.bytes.clone())));
        }
        let prefix = Bytes::copy_from_slice(&self.inner.bytes[..self.cut.min(self.inner.bytes.len())]);
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(prefix),
            Err(std::io::Error::new(ErrorKind::ConnectionReset, "connection reset")),
        ];
        Ok(Box::pin(StreamReader::new(futures::stream::iter(chunks))))
    }
}

/// Fails every entry below `prefix`; drains the rest
pub struct FailingInterpreter {
    pub prefix: String,
}

#[async_trait]
impl TarInterpreter for FailingInterpreter {
    async fn interpret(&self, entry: BundleEntry<'_>) -> std::io::Result<()> {
        if entry.path.starts_with(&self.prefix) {
            return Err(std::io::Error::other("disk full"));
        }
        let mut sink = Vec::new();
        entry.reader.read_to_end(&mut sink).await?;
        Ok(())
    }
}

/// Collects entries and tracks how many interpret calls overlap
#[derive(Default)]
pub struct CollectingInterpreter {
    pub entries: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    pub delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl CollectingInterpreter {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Every entry path with how many times it was delivered
    pub fn delivery_counts(&self) -> HashMap<String, usize> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(path, deliveries)| (path.clone(), deliveries.len()))
            .collect()
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap()
            .get(path)
            .and_then(|deliveries| deliveries.first().cloned())
    }
}

#[async_trait]
impl TarInterpreter for CollectingInterpreter {
    async fn interpret(&self, entry: BundleEntry<'_>) -> std::io::Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut content = Vec::new();
        let result = entry.reader.read_to_end(&mut content).await;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = result?;

        self.entries
            .lock()
            .unwrap()
            .entry(entry.path.to_string_lossy().into_owned())
            .or_default()
            .push(content);
        Ok(())
    }
}
