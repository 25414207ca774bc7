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

use apario_index::{analyze, search, SearchData, SearchOptions};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ap-query", about = "Run a query against a built cache")]
struct Args {
    /// Query text, e.g. "(alpha or delta) and not gamma"
    query: String,
    /// Cache directory holding the artifacts
    #[arg(long)]
    cache_dir: std::path::PathBuf,
    /// Fuzzy algorithms to enable (repeatable); none means exact + gematria
    #[arg(long = "algo")]
    algos: Vec<String>,
    /// Emit ranked results with scores and match details
    #[arg(long)]
    ranked: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let data = SearchData::open(&args.cache_dir)?;
    let analysis = analyze(&args.query);
    let opts = SearchOptions {
        algos: args.algos,
        ..Default::default()
    };
    let results = search(&data, &analysis, &opts);
    if args.ranked {
        println!("{}", serde_json::to_string_pretty(&results.ranked())?);
    } else {
        println!("{}", serde_json::to_string_pretty(&results.flat())?);
    }
    Ok(())
}
