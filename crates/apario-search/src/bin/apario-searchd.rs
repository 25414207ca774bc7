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

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use apario_search::http::router;
use apario_search::{load_config, AppConfig, MergeOpts, SearchService};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apario-searchd", about = "Word + gematria search daemon")]
struct Opts {
    /// TOML config file; CLI flags override it
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    /// Corpus root
    #[arg(long)]
    dir: Option<std::path::PathBuf>,
    /// Cache directory for the index artifacts
    #[arg(long)]
    cache_dir: Option<std::path::PathBuf>,
    /// Bind address, e.g. 0.0.0.0:8080 (env: APARIO_LISTEN)
    #[arg(long)]
    listen: Option<String>,
    /// Ingest worker count; 0 means available parallelism
    #[arg(long)]
    workers: Option<i64>,
    /// Allow the ingest worker ceiling to double
    #[arg(long)]
    boost: Option<bool>,
    /// Default fuzzy algorithm for queries
    #[arg(long)]
    algo: Option<String>,
    /// Global concurrent-search ceiling
    #[arg(long)]
    max_searches: Option<usize>,
    /// Concurrent-search ceiling per client IP
    #[arg(long)]
    per_ip_search_limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let opts = Opts::parse();
    let config = load_config(
        AppConfig::default(),
        MergeOpts {
            config_path: opts.config,
            cli_dir: opts.dir,
            cli_cache_dir: opts.cache_dir,
            cli_listen: opts.listen,
            cli_workers: opts.workers,
            cli_boost: opts.boost,
            cli_algo: opts.algo,
            cli_max_searches: opts.max_searches,
            cli_per_ip_search_limit: opts.per_ip_search_limit,
        },
    )?;

    // Initial load or rebuild happens off the runtime; it can take a while
    // on a cold corpus.
    let service = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || SearchService::start(config)).await??
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let watcher_handle = {
        let service = service.clone();
        let root = config.dir.clone();
        let debounce = config.watch_debounce_ms;
        let shutdown = shutdown.clone();
        std::thread::spawn(move || {
            if let Err(e) = apario_search::watcher::run_watcher(service, root, debounce, shutdown) {
                tracing::error!("watcher exited with error: {}", e);
            }
        })
    };

    let app = router(service.clone());
    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!("listening on {}", config.listen);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    // In-flight queries have completed by the time serve returns; the
    // watcher notices the flag on its next tick.
    let _ = watcher_handle.join();
    tracing::info!("apario-searchd stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM; in-flight queries drain before serve
/// returns.
async fn shutdown_signal(flag: Arc<AtomicBool>) {
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
    tracing::info!("received shutdown signal");
    flag.store(true, Ordering::Relaxed);
}
