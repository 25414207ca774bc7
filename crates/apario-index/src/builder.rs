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

//! Build orchestration: corpus walk → page store + postings streams → the
//! two bitmap indexes → checksums. Also the startup load-or-rebuild
//! decision and the incremental append path the corpus watcher drives.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::corpus::{effective_workers, process_pending, scan_corpus};
use crate::error::Result;
use crate::index::{write_index, IndexWriteOptions};
use crate::integrity::{verify_artifacts, write_artifact_checksums};
use crate::layout;
use crate::postings::PostingsWriter;
use crate::search::SearchData;
use crate::store::PageStoreWriter;

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Ingest worker count; 0 or negative means available parallelism.
    pub workers: i64,
    /// Allow the worker ceiling to double.
    pub boost: bool,
    pub index: IndexWriteOptions,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildSummary {
    /// Pages appended to the store.
    pub pages: u64,
    /// OCR files found but skipped (bad sidecars, read failures).
    pub skipped: u64,
}

/// Full build: truncates the cache and re-ingests the whole corpus.
pub fn build_cache(corpus_root: &Path, cache_dir: &Path, opts: &BuildOptions) -> Result<BuildSummary> {
    fs::create_dir_all(cache_dir)?;
    let pending = scan_corpus(corpus_root)?;
    let found = pending.len();
    let workers = effective_workers(opts.workers, opts.boost);
    let processed = process_pending(pending, workers);

    let mut store = PageStoreWriter::create(cache_dir)?;
    let mut words = PostingsWriter::create(&layout::word_postings_path(cache_dir))?;
    let mut gems = PostingsWriter::create(&layout::gematria_postings_path(cache_dir))?;
    for p in &processed {
        let page_id = store.append(&p.page)?;
        words.write_word_postings(&p.page.textee, page_id)?;
        gems.write_gematria_postings(&p.page.textee, page_id)?;
    }
    store.finish()?;
    words.finish()?;
    gems.finish()?;

    build_indexes(cache_dir, opts)?;

    let summary = BuildSummary {
        pages: processed.len() as u64,
        skipped: (found - processed.len()) as u64,
    };
    info!(
        "built cache in {}: {} pages indexed, {} skipped ({} workers)",
        cache_dir.display(),
        summary.pages,
        summary.skipped,
        workers
    );
    Ok(summary)
}

/// Incremental append for a newly arrived document directory: new pages are
/// appended to the store and postings streams, then both indexes are
/// rebuilt from the (now longer) streams and checksums regenerated. Page
/// ids continue from the sidecar maximum.
pub fn append_directory(new_dir: &Path, cache_dir: &Path, opts: &BuildOptions) -> Result<BuildSummary> {
    let pending = scan_corpus(new_dir)?;
    if pending.is_empty() {
        return Ok(BuildSummary::default());
    }
    let found = pending.len();
    let workers = effective_workers(opts.workers, opts.boost);
    let processed = process_pending(pending, workers);
    if processed.is_empty() {
        return Ok(BuildSummary {
            pages: 0,
            skipped: found as u64,
        });
    }

    let mut store = PageStoreWriter::append_to(cache_dir)?;
    let mut words = PostingsWriter::append_to(&layout::word_postings_path(cache_dir))?;
    let mut gems = PostingsWriter::append_to(&layout::gematria_postings_path(cache_dir))?;
    for p in &processed {
        let page_id = store.append(&p.page)?;
        words.write_word_postings(&p.page.textee, page_id)?;
        gems.write_gematria_postings(&p.page.textee, page_id)?;
    }
    store.finish()?;
    words.finish()?;
    gems.finish()?;

    build_indexes(cache_dir, opts)?;

    let summary = BuildSummary {
        pages: processed.len() as u64,
        skipped: (found - processed.len()) as u64,
    };
    info!(
        "appended {} pages from {} ({} skipped)",
        summary.pages,
        new_dir.display(),
        summary.skipped
    );
    Ok(summary)
}

/// Rebuild both indexes from the postings streams (write-to-temp, rename)
/// and regenerate the artifact checksums.
fn build_indexes(cache_dir: &Path, opts: &BuildOptions) -> Result<()> {
    write_index(
        &layout::word_postings_path(cache_dir),
        &layout::word_index_path(cache_dir),
        &opts.index,
    )?;
    write_index(
        &layout::gematria_postings_path(cache_dir),
        &layout::gematria_index_path(cache_dir),
        &opts.index,
    )?;
    write_artifact_checksums(cache_dir)
}

/// Startup decision: load when every artifact checksum verifies, rebuild
/// from the corpus otherwise. An artifact set that verifies but fails to
/// open (torn header, bad bitmap) also falls back to a rebuild.
pub fn load_or_build(corpus_root: &Path, cache_dir: &Path, opts: &BuildOptions) -> Result<SearchData> {
    if verify_artifacts(cache_dir) {
        match SearchData::open(cache_dir) {
            Ok(data) => {
                info!(
                    "loaded cache from {}: {} words, {} gematria keys, {} pages",
                    cache_dir.display(),
                    data.word.len(),
                    data.gematria.len(),
                    data.store.len()
                );
                return Ok(data);
            }
            Err(e) => warn!("cached artifacts verified but unreadable ({}), rebuilding", e),
        }
    } else {
        info!(
            "checksums missing or stale in {}, rebuilding from {}",
            cache_dir.display(),
            corpus_root.display()
        );
    }
    build_cache(corpus_root, cache_dir, opts)?;
    SearchData::open(cache_dir)
}
