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

//! Admission control at the search boundary: a per-client semaphore keyed
//! by filtered IP, then a global semaphore across all clients. Acquisition
//! blocks without timeout; upstream rate limiting is expected to bound the
//! queue.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct AdmissionGate {
    global: Arc<Semaphore>,
    per_ip_limit: usize,
    per_ip: RwLock<HashMap<String, Arc<Semaphore>>>,
}

/// Held for the duration of one search. Field order is the release order:
/// the global permit returns first, the client permit second — the reverse
/// of acquisition.
pub struct SearchPermit {
    _global: OwnedSemaphorePermit,
    _client: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(max_searches: usize, per_ip_limit: usize) -> Self {
        AdmissionGate {
            global: Arc::new(Semaphore::new(max_searches.max(1))),
            per_ip_limit: per_ip_limit.max(1),
            per_ip: RwLock::new(HashMap::new()),
        }
    }

    /// Block until both ceilings admit the caller: per-client first, then
    /// global.
    pub async fn acquire(&self, ip: &str) -> SearchPermit {
        let client = self
            .client_semaphore(ip)
            .acquire_owned()
            .await
            .expect("admission semaphore closed");
        let global = self
            .global
            .clone()
            .acquire_owned()
            .await
            .expect("admission semaphore closed");
        SearchPermit {
            _global: global,
            _client: client,
        }
    }

    /// Get-or-insert under the reader lock where possible; only a brand-new
    /// client takes the writer lock.
    fn client_semaphore(&self, ip: &str) -> Arc<Semaphore> {
        if let Some(sem) = self.per_ip.read().get(ip) {
            return sem.clone();
        }
        let mut map = self.per_ip.write();
        map.entry(ip.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_ip_limit)))
            .clone()
    }

    pub fn available_global(&self) -> usize {
        self.global.available_permits()
    }

    pub fn available_for(&self, ip: &str) -> usize {
        self.client_semaphore(ip).available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn per_client_ceiling_blocks_the_same_ip() {
        let gate = Arc::new(AdmissionGate::new(10, 1));
        let held = gate.acquire("1.2.3.4").await;
        // Same client is over its ceiling and must block.
        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire("1.2.3.4"));
        assert!(blocked.await.is_err());
        // A different client is unaffected.
        let _other = tokio::time::timeout(Duration::from_millis(50), gate.acquire("5.6.7.8"))
            .await
            .expect("distinct ip should be admitted");
        drop(held);
        let _again = tokio::time::timeout(Duration::from_millis(200), gate.acquire("1.2.3.4"))
            .await
            .expect("permit should return after release");
    }

    #[tokio::test]
    async fn global_ceiling_bounds_all_clients() {
        let gate = Arc::new(AdmissionGate::new(2, 10));
        let _one = gate.acquire("a").await;
        let _two = gate.acquire("b").await;
        assert_eq!(gate.available_global(), 0);
        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire("c"));
        assert!(blocked.await.is_err());
        drop(_one);
        let _three = tokio::time::timeout(Duration::from_millis(200), gate.acquire("c"))
            .await
            .expect("global permit should return after release");
    }

    #[tokio::test]
    async fn release_restores_both_layers() {
        let gate = AdmissionGate::new(3, 2);
        {
            let _permit = gate.acquire("x").await;
            assert_eq!(gate.available_global(), 2);
            assert_eq!(gate.available_for("x"), 1);
        }
        assert_eq!(gate.available_global(), 3);
        assert_eq!(gate.available_for("x"), 2);
    }
}
