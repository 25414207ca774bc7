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

//! Word + gematria search over corpora of OCR'd document pages.
//!
//! The crate ingests a corpus of per-document page directories, builds two
//! durable inverted indexes (surface words and six numeric gematria
//! transforms, both keyed to roaring bitmaps of page ids), and executes
//! Boolean queries with optional fuzzy and gematria expansion against them.

pub mod analyze;
pub mod builder;
pub mod corpus;
pub mod error;
pub mod gematria;
pub mod index;
pub mod integrity;
pub mod layout;
pub mod postings;
pub mod search;
pub mod similarity;
pub mod store;
pub mod textee;
pub mod types;

// Re-export the operational surface for downstream callers that prefer a
// flat import.
pub use crate::analyze::{analyze, QueryAnalysis};
pub use crate::builder::{build_cache, load_or_build, BuildOptions, BuildSummary};
pub use crate::error::{IndexError, Result};
pub use crate::gematria::Gematria;
pub use crate::index::{write_index, IndexReader, IndexWriteOptions};
pub use crate::search::{search, SearchData, SearchOptions};
pub use crate::similarity::SimilarityOptions;
pub use crate::store::{PageStoreReader, PageStoreWriter};
pub use crate::textee::Textee;
pub use crate::types::{MatchDetail, Page, PageId, RankedPage, SearchResults};
