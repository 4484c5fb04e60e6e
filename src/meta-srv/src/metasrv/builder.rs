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

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use common_meta::ddl_manager::DdlManager;
use common_meta::key::namespace::NamespaceStore;
use common_meta::kv_backend::memory::MemoryKvBackend;
use common_meta::kv_backend::KvBackendRef;
use common_meta::mirror::coordination::CoordinationServiceRef;
use common_meta::mirror::memory::MemoryCoordination;
use common_meta::mirror::updater::NamespaceMirrorUpdater;

use crate::metasrv::{Metasrv, MetasrvOptions};

pub struct MetasrvBuilder {
    options: Option<MetasrvOptions>,
    kv_backend: Option<KvBackendRef>,
    coordination: Option<CoordinationServiceRef>,
}

impl Default for MetasrvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetasrvBuilder {
    pub fn new() -> Self {
        Self {
            options: None,
            kv_backend: None,
            coordination: None,
        }
    }

    pub fn options(mut self, options: MetasrvOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn kv_backend(mut self, kv_backend: KvBackendRef) -> Self {
        self.kv_backend = Some(kv_backend);
        self
    }

    pub fn coordination(mut self, coordination: CoordinationServiceRef) -> Self {
        self.coordination = Some(coordination);
        self
    }

    /// Builds the [Metasrv], in-memory backends are used for the absent ones.
    pub fn build(self) -> Metasrv {
        let MetasrvBuilder {
            options,
            kv_backend,
            coordination,
        } = self;

        let options = options.unwrap_or_default();
        let kv_backend = kv_backend.unwrap_or_else(|| Arc::new(MemoryKvBackend::new()));
        let coordination = coordination.unwrap_or_else(|| {
            Arc::new(MemoryCoordination::with_capacity(
                options.mirror.watch_capacity,
            ))
        });

        let mirror_updater = Arc::new(NamespaceMirrorUpdater::new(
            options.mirror.root.clone(),
            NamespaceStore::new(kv_backend.clone()),
            coordination.clone(),
        ));
        let ddl_manager = Arc::new(DdlManager::new(
            kv_backend.clone(),
            mirror_updater.clone(),
        ));

        Metasrv {
            started: Arc::new(AtomicBool::new(false)),
            options,
            kv_backend,
            coordination,
            mirror_updater,
            ddl_manager,
        }
    }
}
