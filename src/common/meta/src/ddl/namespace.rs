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

use common_telemetry::{error, info};
use snafu::{ensure, OptionExt};

use crate::error::{self, Result};
use crate::key::namespace::{
    is_reserved_namespace, validate_namespace_name, NamespaceDescriptor, NamespaceStore,
    RESERVED_NAMESPACES,
};
use crate::key::table_name::TableNameManager;
use crate::kv_backend::KvBackendRef;
use crate::lock::KeyLockMap;
use crate::lock_key::NamespaceLock;
use crate::metrics::{
    METRIC_META_CREATE_NAMESPACE_COUNTER, METRIC_META_NAMESPACE_DDL_ELAPSED,
    METRIC_META_NAMESPACE_DDL_ERROR,
};
use crate::mirror::updater::{MirrorUpdate, NamespaceMirrorUpdaterRef};

pub type NamespaceManagerRef = Arc<NamespaceManager>;

/// Applies the namespace operations of the coordinator.
///
/// Mutations of the same namespace hold its [NamespaceLock] from validation
/// until the mirror update is scheduled, so they never interleave and reach
/// the mirror in the order they are applied. Different namespaces proceed
/// concurrently.
pub struct NamespaceManager {
    store: NamespaceStore,
    table_name_manager: TableNameManager,
    locks: KeyLockMap,
    mirror_updater: NamespaceMirrorUpdaterRef,
}

impl NamespaceManager {
    pub fn new(
        kv_backend: KvBackendRef,
        locks: KeyLockMap,
        mirror_updater: NamespaceMirrorUpdaterRef,
    ) -> Self {
        Self {
            store: NamespaceStore::new(kv_backend.clone()),
            table_name_manager: TableNameManager::new(kv_backend),
            locks,
            mirror_updater,
        }
    }

    pub fn store(&self) -> &NamespaceStore {
        &self.store
    }

    /// Creates the reserved namespaces if absent and resyncs the mirror.
    pub async fn init(&self) -> Result<()> {
        for name in RESERVED_NAMESPACES {
            let _guard = self.locks.acquire(NamespaceLock(name)).await;
            if self
                .store
                .put_if_absent(&NamespaceDescriptor::new(name))
                .await?
            {
                info!("Reserved namespace {} created", name);
            }
        }
        self.schedule(MirrorUpdate::Resync);

        Ok(())
    }

    /// Creates a namespace, fails if the name exists.
    pub async fn create(&self, descriptor: NamespaceDescriptor) -> Result<()> {
        let op = "create";
        let _timer = METRIC_META_NAMESPACE_DDL_ELAPSED
            .with_label_values(&[op])
            .start_timer();

        self.create_inner(descriptor)
            .await
            .inspect_err(|_| METRIC_META_NAMESPACE_DDL_ERROR.with_label_values(&[op]).inc())
    }

    async fn create_inner(&self, descriptor: NamespaceDescriptor) -> Result<()> {
        validate_namespace_name(&descriptor.name)?;

        let _guard = self.locks.acquire(NamespaceLock(&descriptor.name)).await;
        let created = self.store.put_if_absent(&descriptor).await?;
        ensure!(
            created,
            error::NamespaceAlreadyExistsSnafu {
                namespace: &descriptor.name,
            }
        );
        METRIC_META_CREATE_NAMESPACE_COUNTER.inc();
        info!("Namespace created: {}", descriptor);

        self.schedule(MirrorUpdate::Upsert(descriptor));
        Ok(())
    }

    /// Deletes a namespace, fails if the name is absent, reserved or still has tables.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let op = "delete";
        let _timer = METRIC_META_NAMESPACE_DDL_ELAPSED
            .with_label_values(&[op])
            .start_timer();

        self.delete_inner(name)
            .await
            .inspect_err(|_| METRIC_META_NAMESPACE_DDL_ERROR.with_label_values(&[op]).inc())
    }

    async fn delete_inner(&self, name: &str) -> Result<()> {
        ensure!(
            !is_reserved_namespace(name),
            error::ReservedNamespaceSnafu { namespace: name }
        );
        validate_namespace_name(name)?;

        let _guard = self.locks.acquire(NamespaceLock(name)).await;
        ensure!(
            self.store.exists(name).await?,
            error::NamespaceNotFoundSnafu { namespace: name }
        );
        let tables = self.table_name_manager.tables(name).await?;
        ensure!(
            tables.is_empty(),
            error::NamespaceNotEmptySnafu {
                namespace: name,
                tables: tables.len(),
            }
        );
        self.store.delete(name).await?;
        info!("Namespace deleted: {}", name);

        self.schedule(MirrorUpdate::Remove(name.to_string()));
        Ok(())
    }

    /// Replaces the configuration of an existing namespace with the one of
    /// `descriptor`.
    pub async fn modify(&self, descriptor: NamespaceDescriptor) -> Result<()> {
        let op = "modify";
        let _timer = METRIC_META_NAMESPACE_DDL_ELAPSED
            .with_label_values(&[op])
            .start_timer();

        self.modify_inner(descriptor)
            .await
            .inspect_err(|_| METRIC_META_NAMESPACE_DDL_ERROR.with_label_values(&[op]).inc())
    }

    async fn modify_inner(&self, descriptor: NamespaceDescriptor) -> Result<()> {
        validate_namespace_name(&descriptor.name)?;

        let _guard = self.locks.acquire(NamespaceLock(&descriptor.name)).await;
        ensure!(
            self.store.exists(&descriptor.name).await?,
            error::NamespaceNotFoundSnafu {
                namespace: &descriptor.name,
            }
        );
        self.store.put(&descriptor).await?;
        info!("Namespace modified: {}", descriptor);

        self.schedule(MirrorUpdate::Upsert(descriptor));
        Ok(())
    }

    /// Returns the descriptor from the store.
    pub async fn get(&self, name: &str) -> Result<NamespaceDescriptor> {
        let op = "get";
        let _timer = METRIC_META_NAMESPACE_DDL_ELAPSED
            .with_label_values(&[op])
            .start_timer();

        self.get_inner(name)
            .await
            .inspect_err(|_| METRIC_META_NAMESPACE_DDL_ERROR.with_label_values(&[op]).inc())
    }

    async fn get_inner(&self, name: &str) -> Result<NamespaceDescriptor> {
        validate_namespace_name(name)?;
        self.store
            .get(name)
            .await?
            .context(error::NamespaceNotFoundSnafu { namespace: name })
    }

    /// Returns all descriptors from the store in name order.
    pub async fn list(&self) -> Result<Vec<NamespaceDescriptor>> {
        let _timer = METRIC_META_NAMESPACE_DDL_ELAPSED
            .with_label_values(&["list"])
            .start_timer();

        self.store.list().await
    }

    pub async fn list_names(&self) -> Result<Vec<String>> {
        self.store.list_names().await
    }

    fn schedule(&self, update: MirrorUpdate) {
        // The store has been written, the resync on restart repairs the mirror.
        if let Err(e) = self.mirror_updater.schedule(update) {
            error!(e; "Failed to schedule namespace mirror update");
        }
    }
}
