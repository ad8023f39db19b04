//! Content-based change detection.
//!
//! The bridge remembers only the Blake3 hash of the last file it
//! delivered. A candidate is new work when its hash differs; names and
//! timestamps play no part, since upstream resends may reuse names.

use std::fmt;
use std::path::Path;

use tokio::io::AsyncReadExt;

/// Blake3 hash of a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(blake3::Hash);

impl Fingerprint {
    /// Hash an in-memory buffer.
    pub fn of(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    /// Finish a streaming hash.
    pub fn from_hasher(hasher: &blake3::Hasher) -> Self {
        Self(hasher.finalize())
    }

    /// Full hex digest.
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Display for Fingerprint {
    /// Abbreviated digest for log lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex()[..16])
    }
}

/// Whether `candidate` is new work given the last delivered fingerprint.
pub fn has_changed(candidate: &Fingerprint, previous: Option<&Fingerprint>) -> bool {
    previous != Some(candidate)
}

/// Hash exactly `len` bytes of `path`, reading `chunk_size` bytes at a time.
///
/// Bytes appended after `len` are ignored. A file that became shorter
/// than `len` is reported as `UnexpectedEof`.
pub async fn fingerprint_file(
    path: &Path,
    len: u64,
    chunk_size: usize,
) -> std::io::Result<Fingerprint> {
    let file = tokio::fs::File::open(path).await?;
    let mut reader = file.take(len);
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }

    if total < len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("file shrank from {len} to {total} bytes"),
        ));
    }
    Ok(Fingerprint::from_hasher(&hasher))
}

// ── Tests ────────────────────────────────────────────────────────
