//! File hashing utilities (copy verification)

use blake3::Hasher;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::utils::config::CopyConsts;

/// Hash a file with blake3 using chunked reads.
pub fn hash_file(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; CopyConsts::VERIFY_READ_CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }
    Ok(*hasher.finalize().as_bytes())
}

/// Lowercase hex of a digest, for log messages.
pub fn hash_hex(hash: &[u8; 32]) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}
