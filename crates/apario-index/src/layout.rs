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

//! Artifact names within the cache directory. These are compatibility
//! surface: external tooling reads the same files.

use std::path::{Path, PathBuf};

/// Page store: one JSON-encoded page record per line.
pub const PAGE_STORE_FILE: &str = "apario-search-cache.jsonl";
/// Page store sidecar: `<page_id> <offset> <length>` per line.
pub const PAGE_STORE_INDEX_FILE: &str = "cache_index.txt";
/// Word index: prefix + roaring-bitmap body + JSON header.
pub const WORD_INDEX_FILE: &str = "word_index.bin";
/// Gematria index, same format keyed by `<type>_<value>`.
pub const GEMATRIA_INDEX_FILE: &str = "gematria_index.bin";
/// Scratch postings stream feeding the word index.
pub const WORD_POSTINGS_FILE: &str = "word_postings.txt";
/// Scratch postings stream feeding the gematria index.
pub const GEMATRIA_POSTINGS_FILE: &str = "gematria_postings.txt";
/// Scratch directory for the external-sort index build.
pub const TEMP_POSTINGS_DIR: &str = "temp_postings";

pub fn page_store_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(PAGE_STORE_FILE)
}

pub fn page_store_index_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(PAGE_STORE_INDEX_FILE)
}

pub fn word_index_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(WORD_INDEX_FILE)
}

pub fn gematria_index_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(GEMATRIA_INDEX_FILE)
}

pub fn word_postings_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(WORD_POSTINGS_FILE)
}

pub fn gematria_postings_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(GEMATRIA_POSTINGS_FILE)
}
