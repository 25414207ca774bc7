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

//! The search executor: translates an analyzed query into bitmap set
//! algebra over the word and gematria indexes, then materializes surviving
//! pages from the store and assigns them to match categories.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;
use roaring::RoaringBitmap;

use crate::analyze::QueryAnalysis;
use crate::error::Result;
use crate::gematria::Gematria;
use crate::index::IndexReader;
use crate::layout;
use crate::similarity::{matches_single, SimilarityOptions, FUZZY_ALGOS};
use crate::store::PageStoreReader;
use crate::types::{MatchDetail, Page, SearchResults};

/// The immutable post-build snapshot a query runs against: both index
/// readers and the page store. Replaced wholesale after a rebuild; never
/// mutated in place.
pub struct SearchData {
    pub word: IndexReader,
    pub gematria: IndexReader,
    pub store: PageStoreReader,
}

impl SearchData {
    pub fn open(cache_dir: &Path) -> Result<Self> {
        Ok(SearchData {
            word: IndexReader::open(&layout::word_index_path(cache_dir))?,
            gematria: IndexReader::open(&layout::gematria_index_path(cache_dir))?,
            store: PageStoreReader::open(cache_dir)?,
        })
    }
}

/// Per-query knobs. `algos` is the enabled fuzzy set; an empty set makes
/// matching exact-and-gematria only.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub algos: Vec<String>,
    pub similarity: SimilarityOptions,
    /// Checked between AND clauses and between page materializations.
    /// Fuzzy key scans are not interruptible mid-scan.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            algos: FUZZY_ALGOS.iter().map(|s| s.to_string()).collect(),
            similarity: SimilarityOptions::default(),
            cancel: None,
        }
    }
}

impl SearchOptions {
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}

/// Execute `analysis` against `data`.
pub fn search(data: &SearchData, analysis: &QueryAnalysis, opts: &SearchOptions) -> SearchResults {
    // Phase A: candidate construction. The first AND clause seeds the
    // result set, every further clause intersects it.
    let mut result = RoaringBitmap::new();
    let mut first = true;
    for clause in &analysis.ands {
        if opts.cancelled() {
            return SearchResults::default();
        }
        let clause_pages = clause_bitmap(data, clause, opts);
        if first {
            result = clause_pages;
            first = false;
        } else {
            result &= clause_pages;
        }
        if result.is_empty() {
            break;
        }
    }

    // Phase B: exclusion. A query with only NOT clauses starts from the
    // empty candidate set and stays empty.
    for clause in &analysis.nots {
        if opts.cancelled() || result.is_empty() {
            break;
        }
        result -= clause_bitmap(data, clause, opts);
    }

    // Phase C: materialize survivors and re-check per category.
    let query_terms = and_terms(analysis);
    let mut results = SearchResults::default();
    for page_id in result.iter() {
        if opts.cancelled() {
            break;
        }
        let page = match data.store.get(page_id) {
            Ok(Some(page)) => page,
            Ok(None) => {
                warn!("page {} in index but absent from store sidecar", page_id);
                continue;
            }
            Err(e) => {
                warn!("page {} unreadable: {}", page_id, e);
                continue;
            }
        };
        let matched = categorize(&page, &query_terms, opts);
        if matched.is_empty() {
            // Admitted by expansion, but no per-category predicate held on
            // re-check; dropped from output.
            continue;
        }
        let ident = page.page_identifier.clone();
        for (category, detail) in matched {
            results
                .categories
                .entry(category)
                .or_default()
                .push(ident.clone());
            *results.hit_counts.entry(ident.clone()).or_insert(0) += 1;
            results.matches.entry(ident.clone()).or_default().push(detail);
        }
    }
    results
}

/// Split one clause into lookup terms: an OR group expands to its
/// disjuncts, a phrase splits on whitespace.
fn clause_terms(clause: &str) -> Vec<String> {
    let clause = clause.trim();
    let interior = if clause.starts_with('(') && clause.ends_with(')') && clause.len() >= 2 {
        &clause[1..clause.len() - 1]
    } else {
        clause
    };
    interior
        .split_whitespace()
        .filter(|t| *t != "or")
        .map(str::to_string)
        .collect()
}

/// Every term contributed by the AND clauses, deduplicated in order.
fn and_terms(analysis: &QueryAnalysis) -> Vec<(String, Gematria)> {
    let mut terms: Vec<(String, Gematria)> = Vec::new();
    for clause in &analysis.ands {
        for term in clause_terms(clause) {
            if terms.iter().all(|(t, _)| *t != term) {
                let g = Gematria::of(&term);
                terms.push((term, g));
            }
        }
    }
    terms
}

/// Union of everything a clause reaches: exact word bitmaps, fuzzy-expanded
/// bitmaps over the word-index vocabulary, and the six typed gematria
/// bitmaps of each term. Lookup failures are logged and contribute nothing.
fn clause_bitmap(data: &SearchData, clause: &str, opts: &SearchOptions) -> RoaringBitmap {
    let mut acc = RoaringBitmap::new();
    for term in clause_terms(clause) {
        match data.word.bitmap(&term) {
            Ok(Some(pages)) => acc |= pages,
            Ok(None) => {}
            Err(e) => warn!("word lookup for {:?} failed: {}", term, e),
        }
        if !opts.algos.is_empty() {
            for key in data.word.keys() {
                if key == term {
                    continue;
                }
                let hit = opts
                    .algos
                    .iter()
                    .any(|algo| matches_single(&term, key, algo, &opts.similarity));
                if !hit {
                    continue;
                }
                match data.word.bitmap(key) {
                    Ok(Some(pages)) => acc |= pages,
                    Ok(None) => {}
                    Err(e) => warn!("fuzzy lookup for {:?} failed: {}", key, e),
                }
            }
        }
        let g = Gematria::of(&term);
        for (kind, value) in g.typed_values() {
            let key = format!("{}_{}", kind, value);
            match data.gematria.bitmap(&key) {
                Ok(Some(pages)) => acc |= pages,
                Ok(None) => {}
                Err(e) => warn!("gematria lookup for {:?} failed: {}", key, e),
            }
        }
    }
    acc
}

/// Re-run per-category matching on a materialized page. Returns at most one
/// detail per category, so `(category, page)` pairs are unique and the hit
/// count equals the number of distinct categories matched.
fn categorize(
    page: &Page,
    query_terms: &[(String, Gematria)],
    opts: &SearchOptions,
) -> BTreeMap<String, MatchDetail> {
    let mut matched: BTreeMap<String, MatchDetail> = BTreeMap::new();
    for (term, query_g) in query_terms {
        if let Some(g) = page.textee.gematrias.get(term) {
            record(&mut matched, "exact/textee".to_string(), term, *g, page);
        }
        for algo in &opts.algos {
            let category = format!("fuzzy/{}", algo);
            if matched.contains_key(&category) {
                continue;
            }
            for (word, g) in &page.textee.gematrias {
                if matches_single(term, word, algo, &opts.similarity) {
                    record(&mut matched, category, word, *g, page);
                    break;
                }
            }
        }
        for (kind, value) in query_g.typed_values() {
            let category = format!("gematria/{}", kind);
            if matched.contains_key(&category) {
                continue;
            }
            for (word, g) in &page.textee.gematrias {
                if g.get(kind) == Some(value) {
                    record(&mut matched, category, word, *g, page);
                    break;
                }
            }
        }
    }
    matched
}

fn record(
    matched: &mut BTreeMap<String, MatchDetail>,
    category: String,
    word: &str,
    gematria: Gematria,
    page: &Page,
) {
    matched.entry(category.clone()).or_insert_with(|| MatchDetail {
        word: word.to_string(),
        gematria,
        text: page.textee.input.clone(),
        category,
    });
}
