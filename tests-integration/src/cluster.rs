// Copyright 2023 Greptime Team
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

use std::sync::Arc;
use std::time::Duration;

use common_meta::key::namespace::NamespaceStore;
use common_meta::kv_backend::memory::MemoryKvBackend;
use common_meta::kv_backend::KvBackendRef;
use common_meta::mirror::coordination::CoordinationServiceRef;
use common_meta::mirror::memory::MemoryCoordination;
use common_meta::mirror::NamespaceMirror;
use common_meta::NamespaceDescriptor;
use common_test_util::wait::wait_for;
use meta_client::{AsyncAdmin, MetaClient, MetaClientBuilder};
use meta_srv::metasrv::{Metasrv, MetasrvOptions};
use meta_srv::mocks::{self, MockDdlChannel, MockInfo};

/// A metasrv, the mirrors of a few observers and a client, all in process.
pub struct MiniCluster {
    pub metasrv: Arc<Metasrv>,
    pub kv_backend: KvBackendRef,
    pub coordination: Arc<MemoryCoordination>,
    pub channel: Arc<MockDdlChannel>,
    pub mirrors: Vec<NamespaceMirror>,
    pub client: MetaClient,
}

pub struct MiniClusterBuilder {
    options: MetasrvOptions,
    observers: usize,
}

impl Default for MiniClusterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniClusterBuilder {
    pub fn new() -> Self {
        Self {
            options: MetasrvOptions::default(),
            observers: 1,
        }
    }

    pub fn with_observers(self, observers: usize) -> Self {
        Self { observers, ..self }
    }

    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.options.mirror.resync_interval = interval;
        self
    }

    pub fn with_watch_capacity(mut self, capacity: usize) -> Self {
        self.options.mirror.watch_capacity = capacity;
        self
    }

    pub async fn build(self) -> MiniCluster {
        common_telemetry::init_default_ut_logging();

        let root = self.options.mirror.root.clone();
        let MockInfo {
            metasrv,
            kv_backend,
            coordination,
            channel,
        } = mocks::mock(self.options, Arc::new(MemoryKvBackend::new())).await;

        let mut mirrors = Vec::with_capacity(self.observers);
        for _ in 0..self.observers {
            let service: CoordinationServiceRef = coordination.clone();
            let mirror = NamespaceMirror::new(&root, service);
            mirror.start().await.unwrap();
            mirrors.push(mirror);
        }

        let client = MetaClientBuilder::new(channel.as_channel()).build().unwrap();

        MiniCluster {
            metasrv,
            kv_backend,
            coordination,
            channel,
            mirrors,
            client,
        }
    }
}

impl MiniCluster {
    pub fn admin(&self) -> AsyncAdmin {
        self.client.admin()
    }

    /// A read-only view of the durable store, bypassing the metasrv.
    pub fn store(&self) -> NamespaceStore {
        NamespaceStore::new(self.kv_backend.clone())
    }

    pub fn mirror(&self) -> &NamespaceMirror {
        &self.mirrors[0]
    }

    /// Waits until every mirror holds exactly the store's descriptors.
    pub async fn wait_mirrors_converged(&self, timeout: Duration) -> bool {
        let store = self.store();
        let mirrors = &self.mirrors;
        wait_for(timeout, || {
            let store = store.clone();
            async move {
                let Ok(expected) = store.list().await else {
                    return false;
                };
                mirrors.iter().all(|mirror| mirror.list() == expected)
            }
        })
        .await
    }

    /// Waits until `check` holds on every mirror.
    pub async fn wait_mirrors<F>(&self, timeout: Duration, check: F) -> bool
    where
        F: Fn(&NamespaceMirror) -> bool,
    {
        let check = &check;
        let mirrors = &self.mirrors;
        wait_for(timeout, || async move { mirrors.iter().all(check) }).await
    }

    pub async fn store_names(&self) -> Vec<String> {
        self.store()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|NamespaceDescriptor { name, .. }| name)
            .collect()
    }
}
