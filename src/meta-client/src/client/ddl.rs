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

use std::sync::atomic::{AtomicU64, Ordering};

use common_error::status_code::StatusCode;
use common_meta::rpc::ddl::{
    DdlChannelRef, DdlOutput, DdlTask, SubmitDdlTaskRequest, SubmitDdlTaskResponse,
};
use common_meta::rpc::ErrorStatus;
use common_telemetry::debug;
use snafu::ResultExt;

use crate::error::{self, Error, Result};

/// What a ddl task operates on, used to re-type remote failures.
#[derive(Debug, Clone, Default)]
pub(crate) struct Subject {
    pub namespace: String,
    pub table: Option<String>,
}

impl Subject {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            table: None,
        }
    }

    pub fn table(namespace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            table: Some(table.into()),
        }
    }
}

pub(crate) struct Client {
    channel: DdlChannelRef,
    next_request_id: AtomicU64,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("next_request_id", &self.next_request_id)
            .finish()
    }
}

impl Client {
    pub fn new(channel: DdlChannelRef) -> Self {
        Self {
            channel,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub async fn submit_ddl_task(&self, task: DdlTask, subject: &Subject) -> Result<DdlOutput> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let task_name = task.name();
        let request = SubmitDdlTaskRequest::new(request_id, task)
            .encode()
            .context(error::EncodeRequestSnafu)?;

        debug!("Submitting ddl task {task_name}, request id: {request_id}");
        let response = self
            .channel
            .call(request)
            .await
            .context(error::TransportSnafu)?;
        let response =
            SubmitDdlTaskResponse::decode(&response).context(error::DecodeResponseSnafu)?;

        match response.header.error {
            Some(status) => Err(remote_error(status, subject)),
            None => Ok(response.output),
        }
    }
}

/// Maps the status returned by the metasrv back to a typed error.
pub(crate) fn remote_error(status: ErrorStatus, subject: &Subject) -> Error {
    let code = status.status_code();
    let msg = status.err_msg;
    let table_name = || match &subject.table {
        Some(table) => format!("{}:{}", subject.namespace, table),
        None => subject.namespace.clone(),
    };

    match code {
        StatusCode::NamespaceAlreadyExists => error::NamespaceExistsSnafu {
            namespace: &subject.namespace,
        }
        .build(),
        StatusCode::NamespaceNotFound => error::NamespaceNotFoundSnafu {
            namespace: &subject.namespace,
        }
        .build(),
        StatusCode::ReservedNamespace => error::ReservedNamespaceSnafu {
            namespace: &subject.namespace,
            msg,
        }
        .build(),
        StatusCode::NamespaceNotEmpty => error::NamespaceNotEmptySnafu {
            namespace: &subject.namespace,
            msg,
        }
        .build(),
        StatusCode::TableAlreadyExists => error::TableExistsSnafu {
            table_name: table_name(),
        }
        .build(),
        StatusCode::TableNotFound => error::TableNotFoundSnafu {
            table_name: table_name(),
        }
        .build(),
        code => error::ServerSnafu { code, msg }.build(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: StatusCode) -> ErrorStatus {
        ErrorStatus {
            code: code as u32,
            err_msg: "remote".to_string(),
        }
    }

    #[test]
    fn test_remote_error() {
        let subject = Subject::namespace("ns1");
        assert!(matches!(
            remote_error(status(StatusCode::NamespaceAlreadyExists), &subject),
            Error::NamespaceExists { namespace, .. } if namespace == "ns1"
        ));
        assert!(matches!(
            remote_error(status(StatusCode::NamespaceNotFound), &subject),
            Error::NamespaceNotFound { .. }
        ));
        assert!(matches!(
            remote_error(status(StatusCode::ReservedNamespace), &subject),
            Error::ReservedNamespace { msg, .. } if msg == "remote"
        ));
        assert!(matches!(
            remote_error(status(StatusCode::NamespaceNotEmpty), &subject),
            Error::NamespaceNotEmpty { .. }
        ));

        let subject = Subject::table("ns1", "t1");
        assert!(matches!(
            remote_error(status(StatusCode::TableAlreadyExists), &subject),
            Error::TableExists { table_name, .. } if table_name == "ns1:t1"
        ));
        assert!(matches!(
            remote_error(status(StatusCode::TableNotFound), &subject),
            Error::TableNotFound { .. }
        ));
        assert!(matches!(
            remote_error(status(StatusCode::InvalidArguments), &subject),
            Error::Server { code: StatusCode::InvalidArguments, .. }
        ));

        let unknown = ErrorStatus {
            code: 99_999,
            err_msg: String::new(),
        };
        assert!(matches!(
            remote_error(unknown, &subject),
            Error::Server { code: StatusCode::Unknown, .. }
        ));
    }
}
