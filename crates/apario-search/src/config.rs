use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use apario_index::SimilarityOptions;

/// Runtime configuration for the daemon. Merged from, in ascending
/// precedence: built-in defaults, a TOML config file, `APARIO_*`
/// environment variables, CLI flags.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Corpus root.
    pub dir: PathBuf,
    /// Directory holding the four cache artifacts.
    pub cache_dir: PathBuf,
    /// HTTP bind address.
    pub listen: String,
    /// Ingest worker count; 0 or negative means available parallelism.
    pub workers: i64,
    /// Allow the ingest worker ceiling to double.
    pub boost: bool,
    /// Open-handle cap for the external index build.
    pub max_open_files: usize,
    /// Default fuzzy algorithm applied to queries.
    pub algo: String,
    /// Global concurrent-search ceiling.
    pub max_searches: usize,
    /// Concurrent-search ceiling per client IP.
    pub per_ip_search_limit: usize,
    /// Watcher debounce window in milliseconds.
    pub watch_debounce_ms: u64,
    /// How long completed search results are answered from cache;
    /// 0 disables the cache.
    pub result_cache_ttl_ms: u64,
    pub similarity: SimilarityOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            dir: PathBuf::from("."),
            cache_dir: PathBuf::from("./cache"),
            listen: "127.0.0.1:8080".to_string(),
            workers: 0,
            boost: false,
            max_open_files: 512,
            algo: "jaro-winkler".to_string(),
            max_searches: 32,
            per_ip_search_limit: 4,
            watch_debounce_ms: 2000,
            result_cache_ttl_ms: 300_000,
            similarity: SimilarityOptions::default(),
        }
    }
}

/// CLI-level overrides the daemon passes to `load_config`. Keep this small
/// and explicit; the binary maps its flags onto it.
#[derive(Debug, Clone, Default)]
pub struct MergeOpts {
    pub config_path: Option<PathBuf>,
    pub cli_dir: Option<PathBuf>,
    pub cli_cache_dir: Option<PathBuf>,
    pub cli_listen: Option<String>,
    pub cli_workers: Option<i64>,
    pub cli_boost: Option<bool>,
    pub cli_algo: Option<String>,
    pub cli_max_searches: Option<usize>,
    pub cli_per_ip_search_limit: Option<usize>,
}

/// Load and merge AppConfig from: defaults <- config file <- env vars <- CLI.
pub fn load_config(mut base: AppConfig, opts: MergeOpts) -> Result<AppConfig> {
    if let Some(path) = opts.config_path.as_ref() {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            let v: toml::Value = toml::from_str(&s)?;
            if let Some(d) = v.get("dir").and_then(|x| x.as_str()) {
                base.dir = PathBuf::from(d);
            }
            if let Some(d) = v.get("cache-dir").and_then(|x| x.as_str()) {
                base.cache_dir = PathBuf::from(d);
            }
            if let Some(l) = v.get("listen").and_then(|x| x.as_str()) {
                base.listen = l.to_string();
            }
            if let Some(w) = v.get("workers").and_then(|x| x.as_integer()) {
                base.workers = w;
            }
            if let Some(b) = v.get("boost").and_then(|x| x.as_bool()) {
                base.boost = b;
            }
            if let Some(m) = v.get("max-open-files").and_then(|x| x.as_integer()) {
                base.max_open_files = m.max(1) as usize;
            }
            if let Some(a) = v.get("algo").and_then(|x| x.as_str()) {
                base.algo = a.to_string();
            }
            if let Some(m) = v.get("max-searches").and_then(|x| x.as_integer()) {
                base.max_searches = m.max(1) as usize;
            }
            if let Some(m) = v.get("per-ip-search-limit").and_then(|x| x.as_integer()) {
                base.per_ip_search_limit = m.max(1) as usize;
            }
            if let Some(m) = v.get("watch-debounce-ms").and_then(|x| x.as_integer()) {
                base.watch_debounce_ms = m.max(0) as u64;
            }
            if let Some(m) = v.get("result-cache-ttl-ms").and_then(|x| x.as_integer()) {
                base.result_cache_ttl_ms = m.max(0) as u64;
            }
            merge_similarity(&mut base.similarity, &v);
        }
    }

    // env vars override file
    if let Ok(d) = std::env::var("APARIO_DIR") {
        base.dir = PathBuf::from(d);
    }
    if let Ok(d) = std::env::var("APARIO_CACHE_DIR") {
        base.cache_dir = PathBuf::from(d);
    }
    if let Ok(l) = std::env::var("APARIO_LISTEN") {
        base.listen = l;
    }
    if let Ok(w) = std::env::var("APARIO_WORKERS") {
        if let Ok(v) = w.parse::<i64>() {
            base.workers = v;
        }
    }
    if let Ok(b) = std::env::var("APARIO_BOOST") {
        if let Ok(v) = b.parse::<bool>() {
            base.boost = v;
        }
    }
    if let Ok(a) = std::env::var("APARIO_ALGO") {
        base.algo = a;
    }
    if let Ok(m) = std::env::var("APARIO_MAX_SEARCHES") {
        if let Ok(v) = m.parse::<usize>() {
            base.max_searches = v.max(1);
        }
    }
    if let Ok(m) = std::env::var("APARIO_PER_IP_SEARCH_LIMIT") {
        if let Ok(v) = m.parse::<usize>() {
            base.per_ip_search_limit = v.max(1);
        }
    }

    // CLI overrides everything
    if let Some(d) = opts.cli_dir {
        base.dir = d;
    }
    if let Some(d) = opts.cli_cache_dir {
        base.cache_dir = d;
    }
    if let Some(l) = opts.cli_listen {
        base.listen = l;
    }
    if let Some(w) = opts.cli_workers {
        base.workers = w;
    }
    if let Some(b) = opts.cli_boost {
        base.boost = b;
    }
    if let Some(a) = opts.cli_algo {
        base.algo = a;
    }
    if let Some(m) = opts.cli_max_searches {
        base.max_searches = m.max(1);
    }
    if let Some(m) = opts.cli_per_ip_search_limit {
        base.per_ip_search_limit = m.max(1);
    }

    Ok(base)
}

fn merge_similarity(sim: &mut SimilarityOptions, v: &toml::Value) {
    if let Some(t) = v.get("jaro-threshold").and_then(|x| x.as_float()) {
        sim.jaro_threshold = t;
    }
    if let Some(t) = v.get("jaro-winkler-threshold").and_then(|x| x.as_float()) {
        sim.jaro_winkler_threshold = t;
    }
    if let Some(t) = v.get("jaro-winkler-boost-threshold").and_then(|x| x.as_float()) {
        sim.jaro_winkler_boost_threshold = t;
    }
    if let Some(t) = v.get("jaro-winkler-prefix-size").and_then(|x| x.as_integer()) {
        sim.jaro_winkler_prefix_size = t.max(0) as usize;
    }
    if let Some(t) = v.get("ukkonen-icost").and_then(|x| x.as_integer()) {
        sim.ukkonen_icost = t.max(0) as usize;
    }
    if let Some(t) = v.get("ukkonen-dcost").and_then(|x| x.as_integer()) {
        sim.ukkonen_dcost = t.max(0) as usize;
    }
    if let Some(t) = v.get("ukkonen-scost").and_then(|x| x.as_integer()) {
        sim.ukkonen_scost = t.max(0) as usize;
    }
    if let Some(t) = v.get("ukkonen-max-subs").and_then(|x| x.as_integer()) {
        sim.ukkonen_max_subs = t.max(0) as usize;
    }
    if let Some(t) = v.get("wagner-fisher-icost").and_then(|x| x.as_integer()) {
        sim.wagner_fischer_icost = t.max(0) as usize;
    }
    if let Some(t) = v.get("wagner-fisher-dcost").and_then(|x| x.as_integer()) {
        sim.wagner_fischer_dcost = t.max(0) as usize;
    }
    if let Some(t) = v.get("wagner-fisher-scost").and_then(|x| x.as_integer()) {
        sim.wagner_fischer_scost = t.max(0) as usize;
    }
    if let Some(t) = v.get("wagner-fisher-max-subs").and_then(|x| x.as_integer()) {
        sim.wagner_fischer_max_subs = t.max(0) as usize;
    }
    if let Some(t) = v.get("hamming-max-subs").and_then(|x| x.as_integer()) {
        sim.hamming_max_subs = t.max(0) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        for key in [
            "APARIO_DIR",
            "APARIO_CACHE_DIR",
            "APARIO_LISTEN",
            "APARIO_WORKERS",
            "APARIO_BOOST",
            "APARIO_ALGO",
            "APARIO_MAX_SEARCHES",
            "APARIO_PER_IP_SEARCH_LIMIT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial_test::serial]
    fn file_env_cli_precedence() {
        clear_env();
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let toml = r#"
dir = "/from/file"
algo = "soundex"
max-searches = 7
"#;
        fs::write(tmp.path(), toml).unwrap();

        std::env::set_var("APARIO_ALGO", "hamming");
        std::env::set_var("APARIO_MAX_SEARCHES", "9");

        let opts = MergeOpts {
            config_path: Some(tmp.path().to_path_buf()),
            cli_max_searches: Some(11),
            ..Default::default()
        };
        let got = load_config(AppConfig::default(), opts).expect("load");
        // file only
        assert_eq!(got.dir, PathBuf::from("/from/file"));
        // env over file
        assert_eq!(got.algo, "hamming");
        // CLI over env
        assert_eq!(got.max_searches, 11);
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn similarity_tunables_come_from_the_file() {
        clear_env();
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let toml = r#"
jaro-threshold = 0.9
jaro-winkler-prefix-size = 5
ukkonen-max-subs = 4
wagner-fisher-scost = 3
hamming-max-subs = 1
"#;
        fs::write(tmp.path(), toml).unwrap();
        let opts = MergeOpts {
            config_path: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let got = load_config(AppConfig::default(), opts).expect("load");
        assert_eq!(got.similarity.jaro_threshold, 0.9);
        assert_eq!(got.similarity.jaro_winkler_prefix_size, 5);
        assert_eq!(got.similarity.ukkonen_max_subs, 4);
        assert_eq!(got.similarity.wagner_fischer_scost, 3);
        assert_eq!(got.similarity.hamming_max_subs, 1);
        // untouched tunables keep their defaults
        assert_eq!(got.similarity.jaro_winkler_threshold, 0.71);
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn invalid_env_is_ignored() {
        clear_env();
        std::env::set_var("APARIO_WORKERS", "not-a-number");
        std::env::set_var("APARIO_MAX_SEARCHES", "also-bad");
        let got = load_config(AppConfig::default(), MergeOpts::default()).expect("load");
        assert_eq!(got.workers, 0);
        assert_eq!(got.max_searches, 32);
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn missing_config_file_is_fine() {
        clear_env();
        let opts = MergeOpts {
            config_path: Some(PathBuf::from("/no/such/config.toml")),
            ..Default::default()
        };
        let got = load_config(AppConfig::default(), opts).expect("load");
        assert_eq!(got.listen, "127.0.0.1:8080");
        clear_env();
    }
}
