//! Archive digests.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read size per hashing step.
const CHUNK_SIZE: usize = 8192;

/// Prefix of every `archive_hash`.
pub const ALGORITHM: &str = "sha256";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDigest {
    /// `sha256:` followed by the lowercase hex digest
    pub hash: String,

    /// Number of bytes hashed
    pub size: u64,
}

/// Hashes a file in fixed-size chunks.
pub fn compute_archive_digest(path: &Path) -> std::io::Result<ArchiveDigest> {
    let file = File::open(path)?;
    digest_reader(BufReader::new(file))
}

/// Hashes everything `reader` yields, `CHUNK_SIZE` bytes at a time.
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<ArchiveDigest> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(ArchiveDigest {
        hash: format!("{ALGORITHM}:{}", hex::encode(hasher.finalize())),
        size,
    })
}
