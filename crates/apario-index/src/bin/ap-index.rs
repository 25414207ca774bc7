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

use apario_index::error::IndexError;
use apario_index::{build_cache, BuildOptions};
use clap::Parser;
use std::result::Result as StdResult;

#[derive(Parser, Debug)]
#[command(name = "ap-index", about = "Build the word + gematria cache for a corpus")]
struct Args {
    /// Path to the corpus root
    dir: std::path::PathBuf,
    /// Cache directory receiving the artifacts (defaults to <dir>/.cache)
    #[arg(long)]
    cache_dir: Option<std::path::PathBuf>,
    /// Ingest worker count; 0 means available parallelism
    #[arg(long, default_value_t = 0)]
    workers: i64,
    /// Allow the worker ceiling to double
    #[arg(long)]
    boost: bool,
}

fn main() -> StdResult<(), IndexError> {
    let args = Args::parse();
    let cache_dir = args
        .cache_dir
        .unwrap_or_else(|| args.dir.join(".cache"));
    let opts = BuildOptions {
        workers: args.workers,
        boost: args.boost,
        ..Default::default()
    };
    let summary = build_cache(&args.dir, &cache_dir, &opts)?;
    println!(
        "built cache: {} ({} pages, {} skipped)",
        cache_dir.display(),
        summary.pages,
        summary.skipped
    );
    Ok(())
}
