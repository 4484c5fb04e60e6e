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

use common_telemetry::info;
use snafu::ensure;

use crate::error::{self, Result};
use crate::key::namespace::NamespaceStore;
use crate::key::table_name::{TableNameKey, TableNameManager};
use crate::kv_backend::KvBackendRef;
use crate::lock::KeyLockMap;
use crate::lock_key::NamespaceLock;
use crate::metrics::METRIC_META_TABLE_DDL_ELAPSED;
use crate::table_name::TableName;

pub type TableNameCreatorRef = Arc<TableNameCreator>;

/// Records the table names of the namespaces.
///
/// It holds the lock of the table's namespace, so a table is never created in
/// a namespace being deleted.
pub struct TableNameCreator {
    namespace_store: NamespaceStore,
    table_name_manager: TableNameManager,
    locks: KeyLockMap,
}

impl TableNameCreator {
    pub fn new(kv_backend: KvBackendRef, locks: KeyLockMap) -> Self {
        Self {
            namespace_store: NamespaceStore::new(kv_backend.clone()),
            table_name_manager: TableNameManager::new(kv_backend),
            locks,
        }
    }

    /// Creates the table name, fails if the namespace is absent or the table exists.
    pub async fn create_table(&self, table_name: &TableName) -> Result<()> {
        let _timer = METRIC_META_TABLE_DDL_ELAPSED
            .with_label_values(&["create"])
            .start_timer();
        table_name.validate()?;

        let _guard = self
            .locks
            .acquire(NamespaceLock(&table_name.namespace))
            .await;
        ensure!(
            self.namespace_store.exists(&table_name.namespace).await?,
            error::NamespaceNotFoundSnafu {
                namespace: &table_name.namespace,
            }
        );
        let created = self
            .table_name_manager
            .create(&TableNameKey::from(table_name))
            .await?;
        ensure!(
            created,
            error::TableAlreadyExistsSnafu {
                table_name: table_name.to_string(),
            }
        );
        info!("Table created: {}", table_name);

        Ok(())
    }

    /// Drops the table name, fails if it is absent.
    pub async fn drop_table(&self, table_name: &TableName) -> Result<()> {
        let _timer = METRIC_META_TABLE_DDL_ELAPSED
            .with_label_values(&["drop"])
            .start_timer();
        table_name.validate()?;

        let _guard = self
            .locks
            .acquire(NamespaceLock(&table_name.namespace))
            .await;
        let dropped = self
            .table_name_manager
            .delete(&TableNameKey::from(table_name))
            .await?;
        ensure!(
            dropped,
            error::TableNotFoundSnafu {
                table_name: table_name.to_string(),
            }
        );
        info!("Table dropped: {}", table_name);

        Ok(())
    }

    pub async fn table_exists(&self, table_name: &TableName) -> Result<bool> {
        self.table_name_manager
            .exists(&TableNameKey::from(table_name))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::key::namespace::NamespaceDescriptor;
    use crate::kv_backend::memory::MemoryKvBackend;

    #[tokio::test]
    async fn test_create_table_in_missing_namespace() {
        let kv_backend = Arc::new(MemoryKvBackend::new());
        let creator = TableNameCreator::new(kv_backend.clone(), KeyLockMap::new());

        let err = creator
            .create_table(&TableName::new("ns1", "t1"))
            .await
            .unwrap_err();
        assert!(err.is_namespace_not_found());
        // Nothing is written.
        assert!(kv_backend.is_empty());
    }

    #[tokio::test]
    async fn test_create_and_drop_table() {
        let kv_backend = Arc::new(MemoryKvBackend::new());
        NamespaceStore::new(kv_backend.clone())
            .put(&NamespaceDescriptor::new("ns1"))
            .await
            .unwrap();
        let creator = TableNameCreator::new(kv_backend, KeyLockMap::new());
        let table_name = TableName::new("ns1", "t1");

        creator.create_table(&table_name).await.unwrap();
        assert!(creator.table_exists(&table_name).await.unwrap());
        let err = creator.create_table(&table_name).await.unwrap_err();
        assert!(matches!(err, Error::TableAlreadyExists { .. }));

        creator.drop_table(&table_name).await.unwrap();
        let err = creator.drop_table(&table_name).await.unwrap_err();
        assert!(matches!(err, Error::TableNotFound { .. }));
        assert!(!creator.table_exists(&table_name).await.unwrap());
    }
}
