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

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common_telemetry::{debug, error, info, warn};
use parking_lot::Mutex;
use snafu::{ensure, OptionExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::error::{self, Result};
use crate::key::namespace::{NamespaceDescriptor, NamespaceStore};
use crate::key::MetadataValue;
use crate::metrics::{METRIC_META_MIRROR_RESYNC_ELAPSED, METRIC_META_MIRROR_UPDATE};
use crate::mirror::coordination::{child_path, CoordinationServiceRef};

/// An update of the mirror scheduled by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorUpdate {
    /// Writes the descriptor to the node of the namespace.
    Upsert(NamespaceDescriptor),
    /// Removes the node of the namespace.
    Remove(String),
    /// Rewrites the mirror from the store and removes the orphan nodes.
    Resync,
}

impl MirrorUpdate {
    fn kind(&self) -> &'static str {
        match self {
            MirrorUpdate::Upsert(_) => "upsert",
            MirrorUpdate::Remove(_) => "remove",
            MirrorUpdate::Resync => "resync",
        }
    }
}

pub type NamespaceMirrorUpdaterRef = Arc<NamespaceMirrorUpdater>;

/// The delay before a failed resync is retried.
pub const DEFAULT_RESYNC_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Propagates the namespace mutations of the coordinator to the coordination
/// service.
///
/// Updates are applied one by one in scheduling order by a background task.
/// A failed update is followed by a full resync from the store, and a failed
/// resync is retried after [DEFAULT_RESYNC_RETRY_INTERVAL] until one succeeds.
pub struct NamespaceMirrorUpdater {
    context: Arc<UpdaterContext>,
    state: Mutex<UpdaterState>,
}

struct UpdaterState {
    sender: mpsc::UnboundedSender<MirrorUpdate>,
    receiver: Option<mpsc::UnboundedReceiver<MirrorUpdate>>,
    handle: Option<JoinHandle<()>>,
}

struct UpdaterContext {
    root: String,
    store: NamespaceStore,
    coordination: CoordinationServiceRef,
    retry_interval: Duration,
}

impl NamespaceMirrorUpdater {
    pub fn new(
        root: impl Into<String>,
        store: NamespaceStore,
        coordination: CoordinationServiceRef,
    ) -> Self {
        Self::with_retry_interval(root, store, coordination, DEFAULT_RESYNC_RETRY_INTERVAL)
    }

    pub fn with_retry_interval(
        root: impl Into<String>,
        store: NamespaceStore,
        coordination: CoordinationServiceRef,
        retry_interval: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let context = Arc::new(UpdaterContext {
            root: root.into(),
            store,
            coordination,
            retry_interval,
        });

        Self {
            context,
            state: Mutex::new(UpdaterState {
                sender,
                receiver: Some(receiver),
                handle: None,
            }),
        }
    }

    pub fn root(&self) -> &str {
        &self.context.root
    }

    /// Schedules an update. Updates scheduled before [start](Self::start) are
    /// applied once the updater starts.
    pub fn schedule(&self, update: MirrorUpdate) -> Result<()> {
        debug!("Schedule mirror update: {:?}", update);
        self.state
            .lock()
            .sender
            .send(update)
            .ok()
            .context(error::MirrorUpdaterStoppedSnafu)
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    /// Spawns the background task. It also resyncs every `resync_interval`,
    /// a zero interval disables the periodic resync.
    ///
    /// A stopped updater can be started again. The updates dropped by
    /// [stop](Self::stop) are recovered by a resync queued on restart.
    pub fn start(&self, resync_interval: Duration) -> Result<()> {
        let mut state = self.state.lock();
        ensure!(
            state.handle.is_none(),
            error::UnexpectedSnafu {
                err_msg: "Namespace mirror updater has been started",
            }
        );
        let receiver = match state.receiver.take() {
            Some(receiver) => receiver,
            None => {
                let (sender, receiver) = mpsc::unbounded_channel();
                // Only fails if the receiver is dropped.
                let _ = sender.send(MirrorUpdate::Resync);
                state.sender = sender;
                receiver
            }
        };

        info!(
            "Starting namespace mirror updater, root: {}, resync interval: {:?}",
            self.context.root, resync_interval
        );
        let context = self.context.clone();
        state.handle = Some(tokio::spawn(async move {
            context.run(receiver, resync_interval).await;
        }));

        Ok(())
    }

    /// Stops the background task, the pending updates are dropped.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let Some(handle) = state.handle.take() {
            handle.abort();
            info!("Namespace mirror updater stopped, root: {}", self.context.root);
        }
    }
}

impl Drop for NamespaceMirrorUpdater {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resolves after the next tick, never if there is no ticker.
async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            let _ = ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Resolves at `deadline`, never if there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl UpdaterContext {
    async fn run(&self, mut receiver: mpsc::UnboundedReceiver<MirrorUpdate>, interval: Duration) {
        let mut ticker = (!interval.is_zero()).then(|| {
            let start = Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        // Set while a resync is owed, cleared by any successful resync.
        let mut resync_at: Option<Instant> = None;

        loop {
            let update = tokio::select! {
                update = receiver.recv() => match update {
                    Some(update) => update,
                    None => break,
                },
                _ = next_tick(ticker.as_mut()) => MirrorUpdate::Resync,
                _ = sleep_until(resync_at) => MirrorUpdate::Resync,
            };

            let is_resync = matches!(update, MirrorUpdate::Resync);
            match (self.handle_update(update).await, is_resync) {
                (true, true) => resync_at = None,
                (true, false) => {}
                (false, true) => {
                    warn!(
                        "Retrying namespace mirror resync in {:?}, root: {}",
                        self.retry_interval, self.root
                    );
                    resync_at = Some(Instant::now() + self.retry_interval);
                }
                // Repair right away.
                (false, false) => resync_at = Some(Instant::now()),
            }
        }
    }

    /// Applies the update and returns whether it succeeded.
    async fn handle_update(&self, update: MirrorUpdate) -> bool {
        let kind = update.kind();
        match self.apply(&update).await {
            Ok(()) => {
                METRIC_META_MIRROR_UPDATE
                    .with_label_values(&[kind, "success"])
                    .inc();
                true
            }
            Err(e) => {
                METRIC_META_MIRROR_UPDATE
                    .with_label_values(&[kind, "failure"])
                    .inc();
                if matches!(update, MirrorUpdate::Resync) {
                    error!(e; "Failed to resync namespace mirror, root: {}", self.root);
                } else {
                    warn!(e; "Failed to apply mirror update {:?}, scheduling a resync", update);
                }
                false
            }
        }
    }

    async fn apply(&self, update: &MirrorUpdate) -> Result<()> {
        match update {
            MirrorUpdate::Upsert(descriptor) => {
                let path = child_path(&self.root, &descriptor.name);
                let revision = self
                    .coordination
                    .create_or_update(&path, descriptor.try_as_raw_value()?)
                    .await?;
                debug!("Mirror node {} updated at revision {}", path, revision);
            }
            MirrorUpdate::Remove(name) => {
                let path = child_path(&self.root, name);
                let revision = self.coordination.delete(&path).await?;
                debug!("Mirror node {} removed at revision {:?}", path, revision);
            }
            MirrorUpdate::Resync => self.resync().await?,
        }

        Ok(())
    }

    async fn resync(&self) -> Result<()> {
        let _timer = METRIC_META_MIRROR_RESYNC_ELAPSED.start_timer();

        let mut expected = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|descriptor| {
                let raw = descriptor.try_as_raw_value()?;
                Ok((descriptor.name, raw))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        let snapshot = self.coordination.children(&self.root).await?;

        let mut updated = 0;
        let mut removed = 0;
        for (name, data) in snapshot.children {
            match expected.remove(&name) {
                Some(raw) if raw == data => {}
                Some(raw) => {
                    let _ = self
                        .coordination
                        .create_or_update(&child_path(&self.root, &name), raw)
                        .await?;
                    updated += 1;
                }
                None => {
                    let _ = self
                        .coordination
                        .delete(&child_path(&self.root, &name))
                        .await?;
                    removed += 1;
                }
            }
        }
        for (name, raw) in expected {
            let _ = self
                .coordination
                .create_or_update(&child_path(&self.root, &name), raw)
                .await?;
            updated += 1;
        }

        if updated > 0 || removed > 0 {
            info!(
                "Namespace mirror resynced, root: {}, updated: {}, removed: {}",
                self.root, updated, removed
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common_test_util::wait::wait_for;

    use super::*;
    use crate::kv_backend::memory::MemoryKvBackend;
    use crate::mirror::coordination::CoordinationService;
    use crate::mirror::memory::MemoryCoordination;

    fn new_updater() -> (NamespaceStore, Arc<MemoryCoordination>, NamespaceMirrorUpdater) {
        let store = NamespaceStore::new(Arc::new(MemoryKvBackend::new()));
        let coordination = Arc::new(MemoryCoordination::new());
        let updater =
            NamespaceMirrorUpdater::new("/namespace", store.clone(), coordination.clone());
        (store, coordination, updater)
    }

    async fn mirror_names(coordination: &MemoryCoordination) -> Vec<String> {
        coordination
            .children("/namespace")
            .await
            .unwrap()
            .children
            .into_keys()
            .collect()
    }

    #[tokio::test]
    async fn test_apply_in_order() {
        let (_store, coordination, updater) = new_updater();
        let descriptor = NamespaceDescriptor::new("ns1").with_configuration("k", "v");

        // Scheduled before starting.
        updater
            .schedule(MirrorUpdate::Upsert(NamespaceDescriptor::new("ns1")))
            .unwrap();
        updater
            .schedule(MirrorUpdate::Upsert(descriptor.clone()))
            .unwrap();
        updater
            .schedule(MirrorUpdate::Upsert(NamespaceDescriptor::new("ns2")))
            .unwrap();
        updater.schedule(MirrorUpdate::Remove("ns2".to_string())).unwrap();
        updater.start(Duration::ZERO).unwrap();
        assert!(updater.start(Duration::ZERO).is_err());

        let expected = descriptor.try_as_raw_value().unwrap();
        let coordination2 = coordination.clone();
        assert!(
            wait_for(Duration::from_secs(5), move || {
                let coordination = coordination2.clone();
                let expected = expected.clone();
                async move {
                    coordination.revision() == 4
                        && coordination.get("/namespace/ns1").await.unwrap() == Some(expected)
                }
            })
            .await
        );
        assert_eq!(vec!["ns1"], mirror_names(&coordination).await);
    }

    #[tokio::test]
    async fn test_resync() {
        let (store, coordination, updater) = new_updater();
        store.put(&NamespaceDescriptor::new("ns1")).await.unwrap();
        store.put(&NamespaceDescriptor::new("ns2")).await.unwrap();
        coordination
            .create_or_update("/namespace/orphan", vec![])
            .await
            .unwrap();
        coordination
            .create_or_update("/namespace/ns1", b"stale".to_vec())
            .await
            .unwrap();
        // Not a child of the root, left untouched.
        coordination
            .create_or_update("/other/orphan", vec![])
            .await
            .unwrap();

        updater.context.resync().await.unwrap();
        assert_eq!(vec!["ns1", "ns2"], mirror_names(&coordination).await);
        assert_eq!(
            Some(NamespaceDescriptor::new("ns1").try_as_raw_value().unwrap()),
            coordination.get("/namespace/ns1").await.unwrap()
        );
        assert!(coordination.get("/other/orphan").await.unwrap().is_some());

        // Nothing changes when the mirror is in sync.
        let revision = coordination.revision();
        updater.context.resync().await.unwrap();
        assert_eq!(revision, coordination.revision());
    }

    #[tokio::test]
    async fn test_failed_update_triggers_resync() {
        let (store, coordination, updater) = new_updater();
        store.put(&NamespaceDescriptor::new("ns1")).await.unwrap();
        store.put(&NamespaceDescriptor::new("ns2")).await.unwrap();
        updater.start(Duration::ZERO).unwrap();

        coordination.fail_next(1);
        updater
            .schedule(MirrorUpdate::Upsert(NamespaceDescriptor::new("ns1")))
            .unwrap();

        // ns2 is only written by the resync.
        let coordination2 = coordination.clone();
        assert!(
            wait_for(Duration::from_secs(5), move || {
                let coordination = coordination2.clone();
                async move { mirror_names(&coordination).await == vec!["ns1", "ns2"] }
            })
            .await
        );
    }

    #[tokio::test]
    async fn test_periodic_resync() {
        let (store, coordination, updater) = new_updater();
        store.put(&NamespaceDescriptor::new("ns1")).await.unwrap();
        updater.start(Duration::from_millis(20)).unwrap();

        let coordination2 = coordination.clone();
        assert!(
            wait_for(Duration::from_secs(5), move || {
                let coordination = coordination2.clone();
                async move { mirror_names(&coordination).await == vec!["ns1"] }
            })
            .await
        );

        updater.stop();
        store.put(&NamespaceDescriptor::new("ns2")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(vec!["ns1"], mirror_names(&coordination).await);
        assert!(matches!(
            updater.schedule(MirrorUpdate::Resync).unwrap_err(),
            error::Error::MirrorUpdaterStopped { .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_resync_is_retried() {
        let store = NamespaceStore::new(Arc::new(MemoryKvBackend::new()));
        let coordination = Arc::new(MemoryCoordination::new());
        let updater = NamespaceMirrorUpdater::with_retry_interval(
            "/namespace",
            store.clone(),
            coordination.clone(),
            Duration::from_millis(50),
        );
        store.put(&NamespaceDescriptor::new("ns1")).await.unwrap();
        // No periodic resync.
        updater.start(Duration::ZERO).unwrap();

        // Fails the upsert and the resync that follows it.
        coordination.fail_next(2);
        updater
            .schedule(MirrorUpdate::Upsert(NamespaceDescriptor::new("ns1")))
            .unwrap();

        let coordination2 = coordination.clone();
        assert!(
            wait_for(Duration::from_secs(5), move || {
                let coordination = coordination2.clone();
                async move { mirror_names(&coordination).await == vec!["ns1"] }
            })
            .await
        );
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let (store, coordination, updater) = new_updater();
        updater.start(Duration::ZERO).unwrap();
        assert!(updater.is_running());
        updater.stop();
        assert!(!updater.is_running());

        // Written while stopped, recovered by the resync on restart.
        store.put(&NamespaceDescriptor::new("ns1")).await.unwrap();
        updater.start(Duration::ZERO).unwrap();
        assert!(updater.start(Duration::ZERO).is_err());
        store.put(&NamespaceDescriptor::new("ns2")).await.unwrap();
        updater
            .schedule(MirrorUpdate::Upsert(NamespaceDescriptor::new("ns2")))
            .unwrap();

        let coordination2 = coordination.clone();
        assert!(
            wait_for(Duration::from_secs(5), move || {
                let coordination = coordination2.clone();
                async move { mirror_names(&coordination).await == vec!["ns1", "ns2"] }
            })
            .await
        );
    }
}
