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

//! Corpus watcher: observes the corpus root for newly created document
//! directories and hands each batch to the service's incremental ingest.
//! Events are debounced so a directory being unpacked is processed once.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::service::SearchService;

/// Blocking loop; run it on a dedicated thread. Returns when `shutdown` is
/// set or the event channel closes. Rebuilds triggered by an event batch
/// run to completion even if shutdown arrives mid-way.
pub fn run_watcher(
    service: Arc<SearchService>,
    root: PathBuf,
    debounce_ms: u64,
    shutdown: Arc<AtomicBool>,
) -> Result<(), anyhow::Error> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher: RecommendedWatcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(ev) => {
                if tx.send(ev).is_err() {
                    warn!("watch channel closed, dropping event");
                }
            }
            Err(e) => warn!("watch error: {}", e),
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("watching {} for new document directories", root.display());

    let window = Duration::from_millis(debounce_ms);
    loop {
        let first = match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => {
                if shutdown.load(Ordering::Relaxed) {
                    info!("watcher stopping");
                    return Ok(());
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };

        let mut created: BTreeSet<PathBuf> = BTreeSet::new();
        collect_created(&first, &mut created);
        let start = Instant::now();
        while start.elapsed() < window {
            match rx.recv_timeout(window - start.elapsed()) {
                Ok(ev) => collect_created(&ev, &mut created),
                Err(_) => break,
            }
        }
        if created.is_empty() {
            continue;
        }

        for dir in created {
            if let Err(e) = service.ingest_new_directory(&dir) {
                warn!("incremental ingest of {} failed: {}", dir.display(), e);
            }
        }
        if shutdown.load(Ordering::Relaxed) {
            info!("watcher stopping");
            return Ok(());
        }
    }
}

fn collect_created(ev: &notify::Event, out: &mut BTreeSet<PathBuf>) {
    if !matches!(ev.kind, EventKind::Create(_)) {
        return;
    }
    for path in ev.paths.iter() {
        if path.is_dir() {
            out.insert(path.clone());
        }
    }
}
