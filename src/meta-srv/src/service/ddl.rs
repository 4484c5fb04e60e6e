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

use common_error::ext::ErrorExt;
use common_meta::ddl::ExecutorContext;
use common_meta::rpc::ddl::{SubmitDdlTaskRequest, SubmitDdlTaskResponse};
use common_meta::rpc::ErrorStatus;
use common_telemetry::{error, warn};
use snafu::{ensure, ResultExt};

use crate::error::{self, Result};
use crate::metasrv::Metasrv;
use crate::metrics::METRIC_META_DDL_REQUEST;

impl Metasrv {
    /// Executes the task, a failure is returned in the response header.
    pub async fn submit_ddl_task(
        &self,
        ctx: &ExecutorContext,
        request: SubmitDdlTaskRequest,
    ) -> SubmitDdlTaskResponse {
        let request_id = request.header.request_id;
        let task_name = request.task.name();

        match self.execute_ddl_task(ctx, request).await {
            Ok(response) => {
                METRIC_META_DDL_REQUEST
                    .with_label_values(&[task_name, "success"])
                    .inc();
                response
            }
            Err(e) => {
                METRIC_META_DDL_REQUEST
                    .with_label_values(&[task_name, "failure"])
                    .inc();
                if e.status_code().should_log_error() {
                    error!(e;
                        "Failed to execute ddl task {}, request id: {}",
                        task_name,
                        request_id
                    );
                } else {
                    warn!(
                        "Ddl task {} rejected, request id: {}, reason: {}",
                        task_name,
                        request_id,
                        e.output_msg()
                    );
                }
                SubmitDdlTaskResponse::failed(request_id, ErrorStatus::from_error(&e))
            }
        }
    }

    async fn execute_ddl_task(
        &self,
        ctx: &ExecutorContext,
        request: SubmitDdlTaskRequest,
    ) -> Result<SubmitDdlTaskResponse> {
        ensure!(self.is_started(), error::NotStartedSnafu);

        self.ddl_executor()
            .submit_ddl_task(ctx, request)
            .await
            .context(error::SubmitDdlTaskSnafu)
    }

    /// Handles an encoded [SubmitDdlTaskRequest] and returns the encoded
    /// [SubmitDdlTaskResponse].
    pub async fn handle_ddl_request(
        &self,
        ctx: &ExecutorContext,
        request: &[u8],
    ) -> Result<Vec<u8>> {
        let decoded = SubmitDdlTaskRequest::decode(request).context(error::DecodeDdlRequestSnafu);
        let response = match decoded {
            Ok(request) => self.submit_ddl_task(ctx, request).await,
            Err(e) => {
                warn!(e; "Failed to decode ddl request");
                SubmitDdlTaskResponse::failed(0, ErrorStatus::from_error(&e))
            }
        };

        response.encode().context(error::EncodeDdlResponseSnafu)
    }
}
