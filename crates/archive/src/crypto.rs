// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Decryption of archive members
//!
//! Encrypted members are a sequence of ChaCha20-Poly1305 frames so they can
//! be decrypted as a stream:
//!
//! ```text
//! "BKSEAL01" | stream id (8) | frame*
//! frame = ciphertext len (u32 BE) | flags (u8) | ciphertext + tag
//! ```
//!
//! Each frame's nonce is the stream id followed by the big-endian frame
//! counter, and the flags byte is authenticated as associated data. The
//! last frame carries `FINAL_FRAME`; a stream that ends without one is
//! truncated.

use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use futures::Stream;
use remote::{BoxedReader, ENCRYPTION_KEY_LEN};
use std::io::{Error, ErrorKind};
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;

pub const SEAL_MAGIC: &[u8; 8] = b"BKSEAL01";
pub const STREAM_ID_LEN: usize = 8;
pub const FRAME_HEADER_LEN: usize = 5;
pub const FINAL_FRAME: u8 = 0x01;

/// Plaintext bytes per frame when sealing
pub const SEAL_FRAME_SIZE: usize = 64 * 1024;

const TAG_LEN: usize = 16;
const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Capability to decrypt member streams
#[async_trait]
pub trait Crypter: Send + Sync {
    /// Whether members are encrypted at all
    fn is_used(&self) -> bool;

    /// Wrap `src` so that reading it yields plaintext
    async fn decrypt(&self, src: BoxedReader) -> std::io::Result<BoxedReader>;
}

/// Crypter for unencrypted archives
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCrypter;

#[async_trait]
impl Crypter for NoCrypter {
    fn is_used(&self) -> bool {
        false
    }

    async fn decrypt(&self, src: BoxedReader) -> std::io::Result<BoxedReader> {
        Ok(src)
    }
}

/// ChaCha20-Poly1305 framed stream encryption
#[derive(Clone)]
pub struct SealedCrypter {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for SealedCrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealedCrypter")
    }
}

fn frame_nonce(stream_id: &[u8; STREAM_ID_LEN], counter: u32) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[..STREAM_ID_LEN].copy_from_slice(stream_id);
    nonce[STREAM_ID_LEN..].copy_from_slice(&counter.to_be_bytes());
    nonce
}

fn frame_len(header: &[u8; FRAME_HEADER_LEN], counter: u32) -> std::io::Result<usize> {
    let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if (TAG_LEN..=MAX_FRAME_LEN).contains(&len) {
        Ok(len)
    } else {
        Err(Error::new(
            ErrorKind::InvalidData,
            format!("frame {} has invalid length {}", counter, len),
        ))
    }
}

impl SealedCrypter {
    #[must_use]
    pub fn new(key: &[u8; ENCRYPTION_KEY_LEN]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Encrypt `plaintext` into the framed format read by `decrypt`
    pub fn seal(&self, plaintext: &[u8]) -> std::io::Result<Vec<u8>> {
        let stream_id: [u8; STREAM_ID_LEN] = rand::random();
        let mut output = Vec::with_capacity(plaintext.len() + 64);
        output.extend_from_slice(SEAL_MAGIC);
        output.extend_from_slice(&stream_id);

        let mut chunks: Vec<&[u8]> = plaintext.chunks(SEAL_FRAME_SIZE).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        let last = chunks.len() - 1;

        for (index, chunk) in chunks.into_iter().enumerate() {
            let counter = u32::try_from(index)
                .map_err(|_| Error::new(ErrorKind::InvalidInput, "too many frames"))?;
            let flags = if index == last { FINAL_FRAME } else { 0 };
            let nonce = frame_nonce(&stream_id, counter);
            let ciphertext = self
                .cipher
                .encrypt(
                    Nonce::from_slice(&nonce),
                    Payload {
                        msg: chunk,
                        aad: &[flags],
                    },
                )
                .map_err(|e| Error::other(format!("encryption failed: {}", e)))?;
            let len = u32::try_from(ciphertext.len())
                .map_err(|_| Error::new(ErrorKind::InvalidInput, "frame too large"))?;
            output.extend_from_slice(&len.to_be_bytes());
            output.push(flags);
            output.extend_from_slice(&ciphertext);
        }
        Ok(output)
    }

    fn frames(
        cipher: ChaCha20Poly1305,
        mut src: BoxedReader,
        stream_id: [u8; STREAM_ID_LEN],
    ) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
        try_stream! {
            let mut counter: u32 = 0;
            loop {
                let mut header = [0u8; FRAME_HEADER_LEN];
                src.read_exact(&mut header).await.map_err(|e| {
                    Error::new(e.kind(), format!("encrypted stream truncated before frame {}: {}", counter, e))
                })?;
                let len = frame_len(&header, counter)?;
                let flags = header[4];

                let mut ciphertext = vec![0u8; len];
                src.read_exact(&mut ciphertext).await?;

                let nonce = frame_nonce(&stream_id, counter);
                let plaintext = cipher
                    .decrypt(Nonce::from_slice(&nonce), Payload { msg: &ciphertext, aad: &[flags] })
                    .map_err(|_| Error::new(
                        ErrorKind::InvalidData,
                        format!("frame {} failed authentication (wrong key or corrupted data)", counter),
                    ))?;

                if !plaintext.is_empty() {
                    yield Bytes::from(plaintext);
                }
                if flags & FINAL_FRAME != 0 {
                    break;
                }
                counter = counter
                    .checked_add(1)
                    .ok_or_else(|| Error::new(ErrorKind::InvalidData, "frame counter overflow"))?;
            }
        }
    }
}

#[async_trait]
impl Crypter for SealedCrypter {
    fn is_used(&self) -> bool {
        true
    }

    async fn decrypt(&self, mut src: BoxedReader) -> std::io::Result<BoxedReader> {
        let mut header = [0u8; SEAL_MAGIC.len() + STREAM_ID_LEN];
        src.read_exact(&mut header).await.map_err(|e| {
            Error::new(ErrorKind::InvalidData, format!("missing encryption header: {}", e))
        })?;
        if &header[..SEAL_MAGIC.len()] != SEAL_MAGIC {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "stream is not encrypted with a known format",
            ));
        }
        let mut stream_id = [0u8; STREAM_ID_LEN];
        stream_id.copy_from_slice(&header[SEAL_MAGIC.len()..]);

        Ok(Box::pin(StreamReader::new(Self::frames(
            self.cipher.clone(),
            src,
            stream_id,
        ))))
    }
}
