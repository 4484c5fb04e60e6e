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

use common_telemetry::debug;

use crate::ddl::namespace::{NamespaceManager, NamespaceManagerRef};
use crate::ddl::table::{TableNameCreator, TableNameCreatorRef};
use crate::ddl::{DdlTaskExecutor, ExecutorContext};
use crate::error::Result;
use crate::kv_backend::KvBackendRef;
use crate::lock::KeyLockMap;
use crate::mirror::updater::NamespaceMirrorUpdaterRef;
use crate::rpc::ddl::{DdlOutput, DdlTask, SubmitDdlTaskRequest, SubmitDdlTaskResponse};

pub type DdlManagerRef = Arc<DdlManager>;

/// The [DdlManager] dispatches the ddl tasks to the namespace and table managers.
pub struct DdlManager {
    namespace_manager: NamespaceManagerRef,
    table_name_creator: TableNameCreatorRef,
}

impl DdlManager {
    /// Returns a new [DdlManager], the managers share one lock map.
    pub fn new(kv_backend: KvBackendRef, mirror_updater: NamespaceMirrorUpdaterRef) -> Self {
        let locks = KeyLockMap::new();
        Self {
            namespace_manager: Arc::new(NamespaceManager::new(
                kv_backend.clone(),
                locks.clone(),
                mirror_updater,
            )),
            table_name_creator: Arc::new(TableNameCreator::new(kv_backend, locks)),
        }
    }

    pub fn namespace_manager(&self) -> &NamespaceManagerRef {
        &self.namespace_manager
    }

    pub fn table_name_creator(&self) -> &TableNameCreatorRef {
        &self.table_name_creator
    }

    async fn execute(&self, task: DdlTask) -> Result<DdlOutput> {
        match task {
            DdlTask::CreateNamespace(task) => {
                self.namespace_manager.create(task.descriptor).await?;
                Ok(DdlOutput::None)
            }
            DdlTask::DeleteNamespace(task) => {
                self.namespace_manager.delete(&task.name).await?;
                Ok(DdlOutput::None)
            }
            DdlTask::ModifyNamespace(task) => {
                self.namespace_manager.modify(task.descriptor).await?;
                Ok(DdlOutput::None)
            }
            DdlTask::GetNamespace(task) => self
                .namespace_manager
                .get(&task.name)
                .await
                .map(DdlOutput::Namespace),
            DdlTask::ListNamespaces => self
                .namespace_manager
                .list()
                .await
                .map(DdlOutput::Namespaces),
            DdlTask::CreateTable(task) => {
                self.table_name_creator
                    .create_table(&task.table_name)
                    .await?;
                Ok(DdlOutput::None)
            }
            DdlTask::DropTable(task) => {
                self.table_name_creator.drop_table(&task.table_name).await?;
                Ok(DdlOutput::None)
            }
        }
    }
}

#[async_trait::async_trait]
impl DdlTaskExecutor for DdlManager {
    async fn submit_ddl_task(
        &self,
        ctx: &ExecutorContext,
        request: SubmitDdlTaskRequest,
    ) -> Result<SubmitDdlTaskResponse> {
        let SubmitDdlTaskRequest { header, task } = request;
        debug!(
            "Submitting ddl task {}, request id: {}, peer: {:?}",
            task.name(),
            header.request_id,
            ctx.peer_addr
        );

        let output = self.execute(task).await?;
        Ok(SubmitDdlTaskResponse::success(header.request_id, output))
    }
}
