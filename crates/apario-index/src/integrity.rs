// Copyright 2025 Apario Search Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Content checksums over the four cache artifacts. Each artifact carries a
//! sibling `<name>.sha256` holding the hex digest of its bytes; the startup
//! load-or-rebuild decision is driven entirely by these.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::layout;

/// `<path>.sha256`, next to the artifact.
pub fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Hex SHA-256 of the file's bytes.
pub fn checksum_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    Ok(out)
}

/// Write (or replace) the artifact's checksum sidecar.
pub fn write_checksum(path: &Path) -> Result<()> {
    let digest = checksum_file(path)?;
    fs::write(checksum_path(path), digest)?;
    Ok(())
}

/// Does the artifact match its stored checksum? Absent artifact, absent
/// sidecar, or any read failure all count as a mismatch. Trailing
/// whitespace in the sidecar is ignored.
pub fn verify_checksum(path: &Path) -> bool {
    let Ok(stored) = fs::read_to_string(checksum_path(path)) else {
        return false;
    };
    let Ok(computed) = checksum_file(path) else {
        return false;
    };
    stored.trim() == computed
}

/// The four artifacts covered by the integrity scheme.
pub fn artifacts(cache_dir: &Path) -> [PathBuf; 4] {
    [
        layout::page_store_path(cache_dir),
        layout::page_store_index_path(cache_dir),
        layout::word_index_path(cache_dir),
        layout::gematria_index_path(cache_dir),
    ]
}

/// True when all four artifacts verify.
pub fn verify_artifacts(cache_dir: &Path) -> bool {
    artifacts(cache_dir).iter().all(|p| verify_checksum(p))
}

/// Regenerate every artifact's checksum after a build or append.
pub fn write_artifact_checksums(cache_dir: &Path) -> Result<()> {
    for path in artifacts(cache_dir) {
        write_checksum(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn checksum_roundtrip() {
        let td = tempdir().unwrap();
        let file = td.path().join("artifact.bin");
        fs::write(&file, b"contents").unwrap();
        write_checksum(&file).unwrap();
        assert!(verify_checksum(&file));

        fs::write(&file, b"mutated").unwrap();
        assert!(!verify_checksum(&file));
        write_checksum(&file).unwrap();
        assert!(verify_checksum(&file));
    }

    #[test]
    fn trailing_whitespace_in_sidecar_is_ignored() {
        let td = tempdir().unwrap();
        let file = td.path().join("artifact.bin");
        fs::write(&file, b"contents").unwrap();
        let digest = checksum_file(&file).unwrap();
        fs::write(checksum_path(&file), format!("{}\n", digest)).unwrap();
        assert!(verify_checksum(&file));
    }

    #[test]
    fn missing_pieces_fail_verification() {
        let td = tempdir().unwrap();
        let file = td.path().join("artifact.bin");
        assert!(!verify_checksum(&file));
        fs::write(&file, b"contents").unwrap();
        assert!(!verify_checksum(&file));
    }

    #[test]
    fn known_digest() {
        let td = tempdir().unwrap();
        let file = td.path().join("empty");
        fs::write(&file, b"").unwrap();
        assert_eq!(
            checksum_file(&file).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
