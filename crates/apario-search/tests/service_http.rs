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

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use apario_search::http::router;
use apario_search::{AppConfig, SearchService};
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

fn write_page(root: &Path, doc: &str, number: u32, text: &str, ident: &str) {
    let pages = root.join(doc).join("pages");
    fs::create_dir_all(&pages).unwrap();
    let record = root.join(doc).join("record.json");
    if !record.exists() {
        fs::write(&record, format!(r#"{{"identifier": "{}"}}"#, doc)).unwrap();
    }
    fs::write(
        pages.join(format!("page.{:06}.json", number)),
        format!(r#"{{"identifier": "{}"}}"#, ident),
    )
    .unwrap();
    fs::write(pages.join(format!("ocr.{:06}.txt", number)), text).unwrap();
}

fn started_service() -> (TempDir, TempDir, Arc<SearchService>) {
    let corpus = tempdir().unwrap();
    let cache = tempdir().unwrap();
    write_page(corpus.path(), "doc-1", 1, "alpha beta gamma", "A");
    write_page(corpus.path(), "doc-1", 2, "alpha delta", "B");
    let config = AppConfig {
        dir: corpus.path().to_path_buf(),
        cache_dir: cache.path().to_path_buf(),
        ..Default::default()
    };
    let service = SearchService::start(config).unwrap();
    (corpus, cache, service)
}

#[tokio::test(flavor = "multi_thread")]
async fn service_answers_queries() {
    let (_corpus, _cache, service) = started_service();
    let results = service.search("alpha and beta".to_string(), "1.2.3.4").await.unwrap();
    let flat = results.flat();
    assert_eq!(flat, vec!["A".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn incremental_ingest_swaps_the_snapshot() {
    let (corpus, _cache, service) = started_service();
    let before = service.snapshot();
    assert!(service
        .search("xylophone".to_string(), "1.2.3.4")
        .await
        .unwrap()
        .is_empty());

    write_page(corpus.path(), "doc-2", 1, "xylophone trombone", "Z");
    service
        .ingest_new_directory(&corpus.path().join("doc-2"))
        .unwrap();

    let results = service
        .search("xylophone".to_string(), "1.2.3.4")
        .await
        .unwrap();
    assert!(results.flat().contains(&"Z".to_string()));

    // The pre-swap snapshot still serves reads: in-flight queries keep
    // their artifacts during a rebuild.
    assert!(before.word.contains("alpha"));
    assert!(!before.word.contains("xylophone"));
    assert!(service.snapshot().word.contains("xylophone"));
}

#[tokio::test(flavor = "multi_thread")]
async fn repeat_queries_are_served_from_the_results_cache() {
    let (_corpus, _cache, service) = started_service();
    let first = service.search("alpha".to_string(), "1.2.3.4").await.unwrap();
    let second = service.search("alpha".to_string(), "1.2.3.4").await.unwrap();
    assert_eq!(first.flat(), second.flat());
    assert_eq!(first.hit_counts, second.hit_counts);
}

#[tokio::test(flavor = "multi_thread")]
async fn http_search_requires_a_query() {
    let (_corpus, _cache, service) = started_service();
    let app = router(service).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 555))));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/search").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/search?q=%20%20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn http_search_flat_and_ranked_shapes() {
    let (_corpus, _cache, service) = started_service();
    let app = router(service).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 555))));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/search?q=alpha")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let flat: Vec<String> = serde_json::from_slice(&bytes).unwrap();
    assert!(flat.contains(&"A".to_string()));
    assert!(flat.contains(&"B".to_string()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/search?q=alpha&sort=ranked")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let ranked: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
    assert!(!ranked.is_empty());
    assert!(ranked[0].get("id").is_some());
    assert!(ranked[0].get("score").is_some());
    assert!(ranked[0].get("matches").is_some());
    // Ties break ascending by identifier.
    assert_eq!(ranked[0]["id"], "A");
}

#[tokio::test(flavor = "multi_thread")]
async fn http_health() {
    let (_corpus, _cache, service) = started_service();
    let app = router(service).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 555))));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
