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

use async_trait::async_trait;
use common_error::ext::BoxedError;
use common_meta::ddl::ExecutorContext;
use common_meta::kv_backend::memory::MemoryKvBackend;
use common_meta::kv_backend::KvBackendRef;
use common_meta::mirror::coordination::CoordinationServiceRef;
use common_meta::mirror::memory::MemoryCoordination;
use common_meta::rpc::ddl::{DdlChannel, DdlChannelRef};
use parking_lot::RwLock;
use snafu::ResultExt;

use crate::error;
use crate::metasrv::builder::MetasrvBuilder;
use crate::metasrv::{Metasrv, MetasrvOptions};

pub struct MockInfo {
    pub metasrv: Arc<Metasrv>,
    pub kv_backend: KvBackendRef,
    pub coordination: Arc<MemoryCoordination>,
    pub channel: Arc<MockDdlChannel>,
}

/// Starts a [Metasrv] with in-memory backends.
pub async fn mock_with_memstore() -> MockInfo {
    mock(MetasrvOptions::default(), Arc::new(MemoryKvBackend::new())).await
}

pub async fn mock(opts: MetasrvOptions, kv_backend: KvBackendRef) -> MockInfo {
    let coordination = Arc::new(MemoryCoordination::with_capacity(
        opts.mirror.watch_capacity,
    ));
    let coordination_ref: CoordinationServiceRef = coordination.clone();
    let metasrv = Arc::new(
        MetasrvBuilder::new()
            .options(opts)
            .kv_backend(kv_backend.clone())
            .coordination(coordination_ref)
            .build(),
    );
    metasrv.start().await.unwrap();

    MockInfo {
        channel: Arc::new(MockDdlChannel::new(metasrv.clone())),
        metasrv,
        kv_backend,
        coordination,
    }
}

/// A [DdlChannel] that serves the requests on another tokio task, like a
/// network round trip.
pub struct MockDdlChannel {
    metasrv: Arc<Metasrv>,
    peer_addr: String,
    delay: RwLock<Duration>,
}

impl MockDdlChannel {
    pub fn new(metasrv: Arc<Metasrv>) -> Self {
        Self {
            metasrv,
            peer_addr: "127.0.0.1:0".to_string(),
            delay: RwLock::new(Duration::ZERO),
        }
    }

    /// Delays every response.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write() = delay;
    }

    pub fn as_channel(self: &Arc<Self>) -> DdlChannelRef {
        self.clone()
    }
}

#[async_trait]
impl DdlChannel for MockDdlChannel {
    async fn call(&self, request: Vec<u8>) -> common_meta::error::Result<Vec<u8>> {
        let metasrv = self.metasrv.clone();
        let peer_addr = self.peer_addr.clone();
        let delay = *self.delay.read();

        let serve = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let ctx = ExecutorContext {
                peer_addr: Some(peer_addr),
            };
            metasrv.handle_ddl_request(&ctx, &request).await
        });

        serve
            .await
            .context(error::JoinServerTaskSnafu)
            .and_then(|response| response)
            .map_err(BoxedError::new)
            .context(common_meta::error::ExternalSnafu)
    }
}
