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

use crate::error::Result;
use crate::rpc::ddl::{SubmitDdlTaskRequest, SubmitDdlTaskResponse};

pub mod namespace;
pub mod table;

#[derive(Debug, Default)]
pub struct ExecutorContext {
    /// The address of the peer that submits the task.
    pub peer_addr: Option<String>,
}

#[async_trait::async_trait]
pub trait DdlTaskExecutor: Send + Sync {
    async fn submit_ddl_task(
        &self,
        ctx: &ExecutorContext,
        request: SubmitDdlTaskRequest,
    ) -> Result<SubmitDdlTaskResponse>;
}

pub type DdlTaskExecutorRef = Arc<dyn DdlTaskExecutor>;
