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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{self, Result};
use crate::key::namespace::NamespaceDescriptor;
use crate::rpc::{ErrorStatus, RequestHeader, ResponseHeader};
use crate::table_name::TableName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DdlTask {
    CreateNamespace(CreateNamespaceTask),
    DeleteNamespace(DeleteNamespaceTask),
    ModifyNamespace(ModifyNamespaceTask),
    GetNamespace(GetNamespaceTask),
    ListNamespaces,
    CreateTable(CreateTableTask),
    DropTable(DropTableTask),
}

impl DdlTask {
    /// Creates a [`DdlTask`] to create a namespace.
    pub fn new_create_namespace(descriptor: NamespaceDescriptor) -> Self {
        DdlTask::CreateNamespace(CreateNamespaceTask { descriptor })
    }

    /// Creates a [`DdlTask`] to delete a namespace.
    pub fn new_delete_namespace(name: impl Into<String>) -> Self {
        DdlTask::DeleteNamespace(DeleteNamespaceTask { name: name.into() })
    }

    /// Creates a [`DdlTask`] to replace the configuration of a namespace.
    pub fn new_modify_namespace(descriptor: NamespaceDescriptor) -> Self {
        DdlTask::ModifyNamespace(ModifyNamespaceTask { descriptor })
    }

    pub fn new_get_namespace(name: impl Into<String>) -> Self {
        DdlTask::GetNamespace(GetNamespaceTask { name: name.into() })
    }

    pub fn new_list_namespaces() -> Self {
        DdlTask::ListNamespaces
    }

    pub fn new_create_table(table_name: TableName) -> Self {
        DdlTask::CreateTable(CreateTableTask { table_name })
    }

    pub fn new_drop_table(table_name: TableName) -> Self {
        DdlTask::DropTable(DropTableTask { table_name })
    }

    /// Returns the name of the task kind, e.g. `create_namespace`.
    pub fn name(&self) -> &'static str {
        match self {
            DdlTask::CreateNamespace(_) => "create_namespace",
            DdlTask::DeleteNamespace(_) => "delete_namespace",
            DdlTask::ModifyNamespace(_) => "modify_namespace",
            DdlTask::GetNamespace(_) => "get_namespace",
            DdlTask::ListNamespaces => "list_namespaces",
            DdlTask::CreateTable(_) => "create_table",
            DdlTask::DropTable(_) => "drop_table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNamespaceTask {
    pub descriptor: NamespaceDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteNamespaceTask {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyNamespaceTask {
    pub descriptor: NamespaceDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetNamespaceTask {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTableTask {
    pub table_name: TableName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTableTask {
    pub table_name: TableName,
}

/// The result of a [DdlTask].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DdlOutput {
    #[default]
    None,
    Namespace(NamespaceDescriptor),
    Namespaces(Vec<NamespaceDescriptor>),
}

impl DdlOutput {
    fn kind(&self) -> &'static str {
        match self {
            DdlOutput::None => "None",
            DdlOutput::Namespace(_) => "Namespace",
            DdlOutput::Namespaces(_) => "Namespaces",
        }
    }

    pub fn into_none(self) -> Result<()> {
        match self {
            DdlOutput::None => Ok(()),
            other => error::UnexpectedDdlOutputSnafu {
                expected: "None",
                actual: other.kind(),
            }
            .fail(),
        }
    }

    pub fn into_namespace(self) -> Result<NamespaceDescriptor> {
        match self {
            DdlOutput::Namespace(descriptor) => Ok(descriptor),
            other => error::UnexpectedDdlOutputSnafu {
                expected: "Namespace",
                actual: other.kind(),
            }
            .fail(),
        }
    }

    pub fn into_namespaces(self) -> Result<Vec<NamespaceDescriptor>> {
        match self {
            DdlOutput::Namespaces(descriptors) => Ok(descriptors),
            other => error::UnexpectedDdlOutputSnafu {
                expected: "Namespaces",
                actual: other.kind(),
            }
            .fail(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDdlTaskRequest {
    pub header: RequestHeader,
    pub task: DdlTask,
}

impl SubmitDdlTaskRequest {
    pub fn new(request_id: u64, task: DdlTask) -> Self {
        Self {
            header: RequestHeader::new(request_id),
            task,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context(error::EncodeRpcMessageSnafu)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context(error::DecodeRpcMessageSnafu)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDdlTaskResponse {
    pub header: ResponseHeader,
    #[serde(default)]
    pub output: DdlOutput,
}

impl SubmitDdlTaskResponse {
    pub fn success(request_id: u64, output: DdlOutput) -> Self {
        Self {
            header: ResponseHeader::success(request_id),
            output,
        }
    }

    pub fn failed(request_id: u64, error: ErrorStatus) -> Self {
        Self {
            header: ResponseHeader::failed(request_id, error),
            output: DdlOutput::None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context(error::EncodeRpcMessageSnafu)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context(error::DecodeRpcMessageSnafu)
    }
}

/// Carries one encoded [SubmitDdlTaskRequest] to the coordinator and returns
/// the encoded [SubmitDdlTaskResponse].
#[async_trait]
pub trait DdlChannel: Send + Sync {
    async fn call(&self, request: Vec<u8>) -> Result<Vec<u8>>;
}

pub type DdlChannelRef = Arc<dyn DdlChannel>;

#[cfg(test)]
mod tests {
    use common_error::status_code::StatusCode;

    use super::*;

    #[test]
    fn test_decode_request() {
        let request = SubmitDdlTaskRequest::new(
            7,
            DdlTask::new_create_namespace(
                NamespaceDescriptor::new("ns1").with_configuration("k", "v"),
            ),
        );
        let bytes = request.encode().unwrap();
        assert_eq!(request, SubmitDdlTaskRequest::decode(&bytes).unwrap());
        assert_eq!("create_namespace", request.task.name());

        let err = SubmitDdlTaskRequest::decode(b"{}").unwrap_err();
        assert_eq!(
            StatusCode::InvalidArguments,
            common_error::ext::ErrorExt::status_code(&err)
        );
    }

    #[test]
    fn test_decode_failed_response() {
        let response = SubmitDdlTaskResponse::failed(
            7,
            ErrorStatus {
                code: StatusCode::NamespaceNotFound as u32,
                err_msg: "Namespace not found: ns1".to_string(),
            },
        );
        let decoded = SubmitDdlTaskResponse::decode(&response.encode().unwrap()).unwrap();
        assert!(!decoded.header.is_success());
        assert_eq!(DdlOutput::None, decoded.output);
        assert_eq!(StatusCode::NamespaceNotFound as u32, decoded.header.error_code());
    }

    #[test]
    fn test_ddl_output() {
        let output = DdlOutput::Namespace(NamespaceDescriptor::new("ns1"));
        assert!(output.clone().into_namespaces().is_err());
        assert!(output.clone().into_none().is_err());
        assert_eq!("ns1", output.into_namespace().unwrap().name);

        DdlOutput::None.into_none().unwrap();
        assert!(DdlOutput::Namespaces(vec![])
            .into_namespaces()
            .unwrap()
            .is_empty());
    }
}
