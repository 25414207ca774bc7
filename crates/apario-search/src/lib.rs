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

//! Service layer around `apario-index`: layered configuration, the
//! admission gate, the snapshot-swapping search service, the corpus
//! watcher, and the HTTP surface.

pub mod config;
pub mod gate;
pub mod http;
pub mod service;
pub mod watcher;

pub use crate::config::{load_config, AppConfig, MergeOpts};
pub use crate::gate::AdmissionGate;
pub use crate::service::SearchService;
