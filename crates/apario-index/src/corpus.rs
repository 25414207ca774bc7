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

//! Corpus ingestion: walking the document tree for OCR pages, resolving
//! identifiers from sidecar JSON, and fanning page analysis out across a
//! bounded worker pool.
//!
//! Expected layout under the corpus root:
//!
//! ```text
//! <root>/<doc-dir>/record.json                 {"identifier": "<doc-id>", ...}
//! <root>/<doc-dir>/pages/page.000001.json      cover page sidecar
//! <root>/<doc-dir>/pages/page.NNNNNN.json      per-page sidecar
//! <root>/<doc-dir>/pages/ocr.NNNNNN.txt        OCR text
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde_json::Value;

use crate::error::{IndexError, Result};
use crate::textee::Textee;
use crate::types::Page;

/// One OCR page discovered by the walk, not yet read or analyzed.
#[derive(Debug, Clone)]
pub struct PendingPage {
    pub ocr_path: PathBuf,
    pub pages_dir: PathBuf,
    pub doc_dir: PathBuf,
    pub number: u32,
}

/// An analyzed page carrying its position in the sorted walk. The consumer
/// assigns page ids in `idx` order, which keeps assignment deterministic
/// regardless of worker count.
#[derive(Debug)]
pub struct ProcessedPage {
    pub idx: usize,
    pub page: Page,
}

/// Walk `root` for OCR pages, sorted by path.
pub fn scan_corpus(root: &Path) -> Result<Vec<PendingPage>> {
    let mut pending = Vec::new();
    walk(root, &mut pending)?;
    pending.sort_by(|a, b| a.ocr_path.cmp(&b.ocr_path));
    Ok(pending)
}

fn walk(dir: &Path, out: &mut Vec<PendingPage>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let ftype = entry.file_type()?;
        if ftype.is_dir() {
            walk(&path, out)?;
            continue;
        }
        if !ftype.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(number) = parse_ocr_name(name) else {
            continue;
        };
        let pages_dir = dir.to_path_buf();
        if pages_dir.file_name().and_then(|n| n.to_str()) != Some("pages") {
            continue;
        }
        let Some(doc_dir) = pages_dir.parent().map(Path::to_path_buf) else {
            continue;
        };
        out.push(PendingPage {
            ocr_path: path,
            pages_dir,
            doc_dir,
            number,
        });
    }
    Ok(())
}

/// `ocr.NNNNNN.txt` with a zero-padded six-digit page number.
fn parse_ocr_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("ocr.")?.strip_suffix(".txt")?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Resolve the effective worker count: `configured <= 0` means the auto
/// ceiling (available parallelism, doubled by `boost`); positive values are
/// clamped to that same ceiling.
pub fn effective_workers(configured: i64, boost: bool) -> usize {
    let avail = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let ceiling = if boost { avail * 2 } else { avail };
    if configured <= 0 {
        ceiling
    } else {
        (configured as usize).clamp(1, ceiling)
    }
}

/// Analyze pending pages on a pool of `workers` threads. Pages that fail
/// sidecar resolution or OCR reads are logged and dropped; no page id is
/// consumed for them. The output is sorted back into walk order.
pub fn process_pending(pending: Vec<PendingPage>, workers: usize) -> Vec<ProcessedPage> {
    let run = |pending: Vec<PendingPage>| -> Vec<ProcessedPage> {
        let mut processed: Vec<ProcessedPage> = pending
            .par_iter()
            .enumerate()
            .filter_map(|(idx, p)| match process_one(p) {
                Ok(page) => Some(ProcessedPage { idx, page }),
                Err(e) => {
                    warn!("skipping {}: {}", p.ocr_path.display(), e);
                    None
                }
            })
            .collect();
        processed.sort_by_key(|p| p.idx);
        processed
    };
    match ThreadPoolBuilder::new().num_threads(workers.max(1)).build() {
        Ok(pool) => pool.install(|| run(pending)),
        Err(_) => run(pending),
    }
}

fn process_one(p: &PendingPage) -> Result<Page> {
    let page_identifier =
        identifier_from_json(&p.pages_dir.join(format!("page.{:06}.json", p.number)))?;
    let cover_page_identifier = identifier_from_json(&p.pages_dir.join("page.000001.json"))?;
    let document_identifier = identifier_from_json(&p.doc_dir.join("record.json"))?;

    let content = fs::read_to_string(&p.ocr_path)?;
    let mut textee = Textee::new(&content);
    textee.backfill_from_substrings();

    Ok(Page {
        textee,
        page_identifier,
        document_identifier,
        cover_page_identifier,
    })
}

/// Pull the `identifier` field out of a sidecar JSON file.
fn identifier_from_json(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .map_err(|e| IndexError::CorpusInvalid(format!("{}: {}", path.display(), e)))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| IndexError::CorpusInvalid(format!("{}: {}", path.display(), e)))?;
    value
        .get("identifier")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            IndexError::CorpusInvalid(format!("{}: no identifier field", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_page(root: &Path, doc: &str, number: u32, text: &str, ident: &str) {
        let pages = root.join(doc).join("pages");
        fs::create_dir_all(&pages).unwrap();
        let record = root.join(doc).join("record.json");
        if !record.exists() {
            fs::write(&record, format!(r#"{{"identifier": "{}"}}"#, doc)).unwrap();
        }
        fs::write(
            pages.join(format!("page.{:06}.json", number)),
            format!(r#"{{"identifier": "{}"}}"#, ident),
        )
        .unwrap();
        fs::write(pages.join(format!("ocr.{:06}.txt", number)), text).unwrap();
    }

    #[test]
    fn ocr_names_must_be_six_digit() {
        assert_eq!(parse_ocr_name("ocr.000001.txt"), Some(1));
        assert_eq!(parse_ocr_name("ocr.123456.txt"), Some(123456));
        assert_eq!(parse_ocr_name("ocr.1.txt"), None);
        assert_eq!(parse_ocr_name("ocr.0000001.txt"), None);
        assert_eq!(parse_ocr_name("page.000001.json"), None);
        assert_eq!(parse_ocr_name("ocr.00000a.txt"), None);
    }

    #[test]
    fn scan_finds_pages_in_sorted_order() {
        let td = tempdir().unwrap();
        write_page(td.path(), "doc-b", 1, "beta", "B1");
        write_page(td.path(), "doc-a", 2, "alpha two", "A2");
        write_page(td.path(), "doc-a", 1, "alpha one", "A1");
        // OCR-looking file outside a pages/ directory is ignored.
        fs::write(td.path().join("doc-a").join("ocr.000009.txt"), "stray").unwrap();

        let pending = scan_corpus(td.path()).unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].number, 1);
        assert!(pending[0].doc_dir.ends_with("doc-a"));
        assert!(pending[2].doc_dir.ends_with("doc-b"));
    }

    #[test]
    fn processing_resolves_all_three_identifiers() {
        let td = tempdir().unwrap();
        write_page(td.path(), "doc-a", 1, "cover text", "A1");
        write_page(td.path(), "doc-a", 2, "alpha beta", "A2");
        let pending = scan_corpus(td.path()).unwrap();
        let processed = process_pending(pending, 2);
        assert_eq!(processed.len(), 2);
        let second = &processed[1].page;
        assert_eq!(second.page_identifier, "A2");
        assert_eq!(second.document_identifier, "doc-a");
        assert_eq!(second.cover_page_identifier, "A1");
        assert!(second.textee.gematrias.contains_key("beta"));
    }

    #[test]
    fn missing_sidecar_skips_the_page_only() {
        let td = tempdir().unwrap();
        write_page(td.path(), "doc-a", 1, "good page", "A1");
        // A page with no page.NNNNNN.json sidecar.
        let pages = td.path().join("doc-a").join("pages");
        fs::write(pages.join("ocr.000002.txt"), "orphan").unwrap();

        let pending = scan_corpus(td.path()).unwrap();
        assert_eq!(pending.len(), 2);
        let processed = process_pending(pending, 1);
        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].page.page_identifier, "A1");
    }

    #[test]
    fn worker_resolution_honors_the_ceiling() {
        let avail = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        assert_eq!(effective_workers(0, false), avail);
        assert_eq!(effective_workers(-1, false), avail);
        assert_eq!(effective_workers(1, false), 1);
        assert!(effective_workers(i64::MAX, false) <= avail);
        assert!(effective_workers(i64::MAX, true) <= avail * 2);
    }

    #[test]
    fn boost_doubles_the_auto_ceiling() {
        let avail = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        assert_eq!(effective_workers(0, true), avail * 2);
        assert_eq!(effective_workers(-1, true), avail * 2);
        assert_eq!(effective_workers(1, true), 1);
    }
}
