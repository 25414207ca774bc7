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

//! The search service: owns the admission gate and an immutable snapshot of
//! the index readers and page store. Queries clone the snapshot handle and
//! run on the blocking pool; a rebuild installs a fresh snapshot under the
//! writer lock while in-flight queries keep the one they started with.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use apario_index::builder::append_directory;
use apario_index::{analyze, load_or_build, search, BuildOptions, IndexWriteOptions, SearchData, SearchOptions, SearchResults};
use log::info;
use parking_lot::RwLock;

use crate::config::AppConfig;
use crate::gate::AdmissionGate;

struct CachedResults {
    results: SearchResults,
    at: Instant,
}

pub struct SearchService {
    config: AppConfig,
    gate: AdmissionGate,
    snapshot: RwLock<Arc<SearchData>>,
    /// Completed searches keyed by raw query text. Dropped wholesale on
    /// every snapshot swap.
    recent: RwLock<HashMap<String, CachedResults>>,
}

impl SearchService {
    /// Load (or rebuild) the cache and wire up the gate. Blocking; callers
    /// on a runtime should wrap this in `spawn_blocking`.
    pub fn start(config: AppConfig) -> Result<Arc<Self>> {
        let data = load_or_build(&config.dir, &config.cache_dir, &build_options(&config))
            .with_context(|| format!("loading cache from {}", config.cache_dir.display()))?;
        Ok(Arc::new(SearchService {
            gate: AdmissionGate::new(config.max_searches, config.per_ip_search_limit),
            snapshot: RwLock::new(Arc::new(data)),
            recent: RwLock::new(HashMap::new()),
            config,
        }))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn search_options(&self) -> SearchOptions {
        SearchOptions {
            algos: vec![self.config.algo.clone()],
            similarity: self.config.similarity.clone(),
            cancel: None,
        }
    }

    /// Admit, snapshot, and execute one query on the blocking pool. A
    /// recently completed identical query is answered from the results
    /// cache without taking a permit.
    pub async fn search(&self, query: String, ip: &str) -> Result<SearchResults> {
        let ttl = Duration::from_millis(self.config.result_cache_ttl_ms);
        if !ttl.is_zero() {
            if let Some(cached) = self.recent.read().get(&query) {
                if cached.at.elapsed() < ttl {
                    return Ok(cached.results.clone());
                }
            }
        }

        let _permit = self.gate.acquire(ip).await;
        let data = self.snapshot.read().clone();
        let opts = self.search_options();
        let results = {
            let query = query.clone();
            tokio::task::spawn_blocking(move || {
                let analysis = analyze(&query);
                search(&data, &analysis, &opts)
            })
            .await
            .context("search task failed")?
        };
        if !ttl.is_zero() {
            self.recent.write().insert(
                query,
                CachedResults {
                    results: results.clone(),
                    at: Instant::now(),
                },
            );
        }
        Ok(results)
    }

    /// Watcher entry point: append a newly created document directory,
    /// rebuild the indexes, and swap the snapshot. New requests see the new
    /// artifacts; running requests finish on the old ones.
    pub fn ingest_new_directory(&self, dir: &Path) -> Result<()> {
        let summary = append_directory(dir, &self.config.cache_dir, &build_options(&self.config))?;
        if summary.pages == 0 {
            return Ok(());
        }
        let data = SearchData::open(&self.config.cache_dir)?;
        *self.snapshot.write() = Arc::new(data);
        self.recent.write().clear();
        info!(
            "snapshot swapped after ingesting {} pages from {}",
            summary.pages,
            dir.display()
        );
        Ok(())
    }

    /// Current snapshot handle, for tests and diagnostics.
    pub fn snapshot(&self) -> Arc<SearchData> {
        self.snapshot.read().clone()
    }
}

fn build_options(config: &AppConfig) -> BuildOptions {
    BuildOptions {
        workers: config.workers,
        boost: config.boost,
        index: IndexWriteOptions {
            max_open_files: config.max_open_files,
            ..Default::default()
        },
    }
}
