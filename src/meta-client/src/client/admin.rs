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

use common_meta::key::namespace::validate_namespace_name;
use common_meta::rpc::ddl::{DdlOutput, DdlTask};
use common_meta::table_name::TableName;
use common_meta::NamespaceDescriptor;
use snafu::ResultExt;
use tokio::runtime::Handle;

use crate::client::ddl::{Client, Subject};
use crate::error::{self, Result};
use crate::handle::{completion, CompletionHandle};

/// Namespace administration.
///
/// Every method returns immediately. Arguments are validated before anything
/// is sent, and both local and remote failures are delivered through the
/// returned [CompletionHandle].
#[derive(Clone, Debug)]
pub struct AsyncAdmin {
    client: Arc<Client>,
    runtime: Handle,
}

impl AsyncAdmin {
    pub(crate) fn new(client: Arc<Client>, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    pub fn create_namespace(&self, descriptor: NamespaceDescriptor) -> CompletionHandle<()> {
        if let Err(e) = validate_namespace_name(&descriptor.name) {
            return CompletionHandle::ready(Err(e).context(error::IllegalArgumentSnafu));
        }
        let subject = Subject::namespace(&descriptor.name);
        self.submit(
            DdlTask::new_create_namespace(descriptor),
            subject,
            DdlOutput::into_none,
        )
    }

    pub fn delete_namespace(&self, name: &str) -> CompletionHandle<()> {
        if let Err(e) = validate_namespace_name(name) {
            return CompletionHandle::ready(Err(e).context(error::IllegalArgumentSnafu));
        }
        self.submit(
            DdlTask::new_delete_namespace(name),
            Subject::namespace(name),
            DdlOutput::into_none,
        )
    }

    /// Replaces the configuration of an existing namespace with the one in
    /// `descriptor`.
    pub fn modify_namespace(&self, descriptor: NamespaceDescriptor) -> CompletionHandle<()> {
        if let Err(e) = validate_namespace_name(&descriptor.name) {
            return CompletionHandle::ready(Err(e).context(error::IllegalArgumentSnafu));
        }
        let subject = Subject::namespace(&descriptor.name);
        self.submit(
            DdlTask::new_modify_namespace(descriptor),
            subject,
            DdlOutput::into_none,
        )
    }

    /// Reads the descriptor from the metasrv store, not from a mirror.
    pub fn get_namespace_descriptor(&self, name: &str) -> CompletionHandle<NamespaceDescriptor> {
        if let Err(e) = validate_namespace_name(name) {
            return CompletionHandle::ready(Err(e).context(error::IllegalArgumentSnafu));
        }
        self.submit(
            DdlTask::new_get_namespace(name),
            Subject::namespace(name),
            DdlOutput::into_namespace,
        )
    }

    pub fn list_namespace_descriptors(&self) -> CompletionHandle<Vec<NamespaceDescriptor>> {
        self.submit(
            DdlTask::new_list_namespaces(),
            Subject::default(),
            DdlOutput::into_namespaces,
        )
    }

    /// Registers a table name. Fails with [error::Error::NamespaceNotFound]
    /// if its namespace does not exist.
    pub fn create_table(&self, table_name: TableName) -> CompletionHandle<()> {
        if let Err(e) = table_name.validate() {
            return CompletionHandle::ready(Err(e).context(error::IllegalArgumentSnafu));
        }
        let subject = Subject::table(&table_name.namespace, &table_name.table);
        self.submit(
            DdlTask::new_create_table(table_name),
            subject,
            DdlOutput::into_none,
        )
    }

    pub fn drop_table(&self, table_name: TableName) -> CompletionHandle<()> {
        if let Err(e) = table_name.validate() {
            return CompletionHandle::ready(Err(e).context(error::IllegalArgumentSnafu));
        }
        let subject = Subject::table(&table_name.namespace, &table_name.table);
        self.submit(
            DdlTask::new_drop_table(table_name),
            subject,
            DdlOutput::into_none,
        )
    }

    fn submit<T, F>(&self, task: DdlTask, subject: Subject, convert: F) -> CompletionHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(DdlOutput) -> common_meta::error::Result<T> + Send + 'static,
    {
        let (completer, handle) = completion();
        let client = self.client.clone();

        let _ = self.runtime.spawn(async move {
            let result: Result<T> = async {
                let output = client.submit_ddl_task(task, &subject).await?;
                convert(output).context(error::UnexpectedOutputSnafu)
            }
            .await;
            completer.complete(result);
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common_meta::key::namespace::DEFAULT_NAMESPACE_NAME;
    use common_test_util::wait::wait_for;

    use super::*;
    use crate::error::Error;
    use crate::mocks::mock_client;

    #[tokio::test]
    async fn test_local_validation() {
        let (client, _info) = mock_client().await;
        let admin = client.admin();

        let err = admin
            .create_namespace(NamespaceDescriptor::new("bad-name"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalArgument { .. }), "{err:?}");
        assert!(err.is_local());

        let err = admin.delete_namespace("").await.unwrap_err();
        assert!(matches!(err, Error::IllegalArgument { .. }), "{err:?}");

        let err = admin
            .create_table(TableName::new("ns1", "t.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalArgument { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_namespace_admin() {
        let (client, _info) = mock_client().await;
        let admin = client.admin();

        admin
            .create_namespace(NamespaceDescriptor::new("ns1"))
            .await
            .unwrap();
        let err = admin
            .create_namespace(NamespaceDescriptor::new("ns1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NamespaceExists { .. }), "{err:?}");
        assert!(!err.is_local());

        admin
            .modify_namespace(NamespaceDescriptor::new("ns1").with_configuration("k1", "v1"))
            .await
            .unwrap();
        let descriptor = admin.get_namespace_descriptor("ns1").await.unwrap();
        assert_eq!(Some("v1"), descriptor.configuration_value("k1"));

        let names = admin
            .list_namespace_descriptors()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect::<Vec<_>>();
        assert_eq!(vec!["default", "ns1", "system"], names);

        let err = admin.delete_namespace(DEFAULT_NAMESPACE_NAME).await.unwrap_err();
        assert!(matches!(err, Error::ReservedNamespace { .. }), "{err:?}");

        admin.delete_namespace("ns1").await.unwrap();
        let err = admin.get_namespace_descriptor("ns1").await.unwrap_err();
        assert!(matches!(err, Error::NamespaceNotFound { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_table_admin() {
        let (client, _info) = mock_client().await;
        let admin = client.admin();

        let err = admin
            .create_table(TableName::new("absent", "t1"))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, Error::NamespaceNotFound { namespace, .. } if namespace == "absent"),
            "{err:?}"
        );

        admin
            .create_table(TableName::new(DEFAULT_NAMESPACE_NAME, "t1"))
            .await
            .unwrap();
        let err = admin
            .create_table(TableName::new(DEFAULT_NAMESPACE_NAME, "t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TableExists { .. }), "{err:?}");

        admin
            .drop_table(TableName::new(DEFAULT_NAMESPACE_NAME, "t1"))
            .await
            .unwrap();
        let err = admin
            .drop_table(TableName::new(DEFAULT_NAMESPACE_NAME, "t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TableNotFound { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_returns_before_response() {
        let (client, info) = mock_client().await;
        info.channel.set_delay(Duration::from_millis(200));
        let admin = client.admin();

        let handle = admin.create_namespace(NamespaceDescriptor::new("slow"));
        assert!(!handle.is_done());

        let err = handle
            .join_timeout(Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WaitTimeout { .. }), "{err:?}");

        // The timeout does not cancel the request.
        info.channel.set_delay(Duration::ZERO);
        let admin = client.admin();
        let created = wait_for(Duration::from_secs(5), || {
            let admin = admin.clone();
            async move { admin.get_namespace_descriptor("slow").await.is_ok() }
        })
        .await;
        assert!(created);
    }
}
