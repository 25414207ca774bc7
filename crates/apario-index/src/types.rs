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

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::gematria::Gematria;
use crate::textee::Textee;

/// Dense page identifier assigned in ingestion order. Bitmap membership
/// requires the u32 range; an id is never reused short of a full rebuild.
pub type PageId = u32;

/// One searchable unit of text, as stored in the page store log. The
/// `PageId` is not part of the record; it lives in the store's sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub textee: Textee,
    pub page_identifier: String,
    pub document_identifier: String,
    pub cover_page_identifier: String,
}

/// A single category hit on a page, reported with ranked results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub word: String,
    pub gematria: Gematria,
    pub text: String,
    pub category: String,
}

/// Executor output: pages grouped per category, distinct-category counts,
/// and per-page match details.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub categories: BTreeMap<String, Vec<String>>,
    pub hit_counts: BTreeMap<String, usize>,
    pub matches: BTreeMap<String, Vec<MatchDetail>>,
}

/// One entry of the ranked response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPage {
    pub id: String,
    pub score: usize,
    pub matches: Vec<MatchDetail>,
}

impl SearchResults {
    /// Flat page-identifier list: the union of all category lists,
    /// deduplicated, first occurrence wins.
    pub fn flat(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for pages in self.categories.values() {
            for id in pages {
                if seen.insert(id.as_str()) {
                    out.push(id.clone());
                }
            }
        }
        out
    }

    /// Ranked response: score descending, ties broken by page identifier
    /// ascending.
    pub fn ranked(&self) -> Vec<RankedPage> {
        let mut out: Vec<RankedPage> = self
            .hit_counts
            .iter()
            .map(|(id, score)| RankedPage {
                id: id.clone(),
                score: *score,
                matches: self.matches.get(id).cloned().unwrap_or_default(),
            })
            .collect();
        out.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.hit_counts.is_empty()
    }
}
