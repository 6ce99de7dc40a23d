//! Content hashing for artifact verification.
//!
//! Digests let a run report prove which bytes it published and let two
//! runs over unchanged source be compared for determinism.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash of artifact content.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash a file's contents.
pub fn hash_file(path: &Path) -> std::io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn hash_file_is_deterministic() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("artifact.pdf");
    fs::write(&path, "identical bytes").unwrap();

    let first = hash_file(&path).unwrap();
    let second = hash_file(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.0.len(), 64);
  }

  #[test]
  fn hash_changes_with_content() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("artifact.pdf");

    fs::write(&path, "original").unwrap();
    let original = hash_file(&path).unwrap();

    fs::write(&path, "modified").unwrap();
    let modified = hash_file(&path).unwrap();

    assert_ne!(original, modified);
  }

  #[test]
  fn file_and_bytes_hashes_agree() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("artifact.pdf");
    fs::write(&path, b"same content").unwrap();

    assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"same content"));
  }
}
