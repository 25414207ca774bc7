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

//! The HTTP surface: `GET /search` and `GET /health`. Everything else the
//! production deployment wants in front (rate limiting, bans, TLS) belongs
//! to the reverse proxy, not here.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use log::error;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::service::SearchService;

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    q: Option<String>,
    sort: Option<String>,
}

pub fn router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/search", get(search_handler))
        .route("/health", get(health_handler))
        .with_state(service)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn search_handler(
    State(service): State<Arc<SearchService>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Some(query) = params.q.filter(|q| !q.trim().is_empty()) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing query"})),
        ));
    };
    let ranked = params.sort.as_deref() == Some("ranked");
    let ip = filtered_ip(&headers, addr);

    match service.search(query.clone(), &ip).await {
        Ok(results) => {
            if ranked {
                let ranked = results.ranked();
                Ok(Json(serde_json::to_value(ranked).unwrap_or_else(|_| json!([]))))
            } else {
                Ok(Json(json!(results.flat())))
            }
        }
        Err(e) => {
            error!("search failed for {:?}: {}", query, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "message": "Check the server logs to see what happened.",
                })),
            ))
        }
    }
}

/// The admission key for a client: proxy-forwarded address when present,
/// socket peer otherwise.
pub fn filtered_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    for header in ["x-real-ip", "x-forwarded-for"] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    addr.ip().to_string()
}
