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

//! The replicated read cache of the namespaces.
//!
//! The coordinator writes one node per namespace under the mirror root through
//! the [NamespaceMirrorUpdater](updater::NamespaceMirrorUpdater). Every
//! participant keeps a local copy of these nodes in a [NamespaceMirror].

pub mod coordination;
pub mod memory;
pub mod updater;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common_telemetry::{debug, info, warn};
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::key::namespace::NamespaceDescriptor;
use crate::key::MetadataValue;
use crate::metrics::METRIC_META_MIRROR_NAMESPACES;
use crate::mirror::coordination::{
    ChildEvent, ChildEventKind, ChildWatcher, ChildrenSnapshot, CoordinationServiceRef, Revision,
    WatchMessage,
};
use crate::mirror::memory::DEFAULT_WATCH_CAPACITY;

/// The default root node of the namespace mirror.
pub const DEFAULT_MIRROR_ROOT: &str = "/namespace";

/// The interval to retry the subscription after the coordination service fails.
const RESUBSCRIBE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorOptions {
    /// The root node of the namespace mirror.
    pub root: String,
    /// The interval of the full resync, zero disables it.
    #[serde(with = "humantime_serde")]
    pub resync_interval: Duration,
    /// The number of pending events after which a watcher lags.
    pub watch_capacity: usize,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            root: DEFAULT_MIRROR_ROOT.to_string(),
            resync_interval: Duration::from_secs(60),
            watch_capacity: DEFAULT_WATCH_CAPACITY,
        }
    }
}

#[derive(Debug, Default)]
struct MirrorCache {
    revision: Revision,
    namespaces: BTreeMap<String, NamespaceDescriptor>,
}

impl MirrorCache {
    fn reset(&mut self, snapshot: ChildrenSnapshot) {
        self.revision = snapshot.revision;
        self.namespaces = snapshot
            .children
            .into_iter()
            .filter_map(|(name, data)| decode_descriptor(&name, &data))
            .collect();
        METRIC_META_MIRROR_NAMESPACES.set(self.namespaces.len() as i64);
    }

    fn apply(&mut self, event: ChildEvent) {
        // The snapshot already contains the event.
        if event.revision <= self.revision {
            return;
        }
        self.revision = event.revision;
        match event.kind {
            ChildEventKind::Created | ChildEventKind::Updated => {
                if let Some((name, descriptor)) = decode_descriptor(&event.name, &event.data) {
                    let _ = self.namespaces.insert(name, descriptor);
                }
            }
            ChildEventKind::Deleted => {
                let _ = self.namespaces.remove(&event.name);
            }
        }
        METRIC_META_MIRROR_NAMESPACES.set(self.namespaces.len() as i64);
    }
}

fn decode_descriptor(name: &str, data: &[u8]) -> Option<(String, NamespaceDescriptor)> {
    match NamespaceDescriptor::try_from_raw_value(data) {
        Ok(mut descriptor) => {
            descriptor.name = name.to_string();
            Some((name.to_string(), descriptor))
        }
        Err(e) => {
            warn!(e; "Ignore invalid mirror node {}", name);
            None
        }
    }
}

/// A local, eventually consistent copy of the namespaces.
///
/// Reads never contact the coordinator. A namespace accepted by the
/// coordinator becomes visible after a short delay, callers that need the
/// latest state must ask the coordinator.
pub struct NamespaceMirror {
    root: String,
    coordination: CoordinationServiceRef,
    cache: Arc<RwLock<MirrorCache>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

pub type NamespaceMirrorRef = Arc<NamespaceMirror>;

impl NamespaceMirror {
    pub fn new(root: impl Into<String>, coordination: CoordinationServiceRef) -> Self {
        Self {
            root: root.into(),
            coordination,
            cache: Arc::new(RwLock::new(MirrorCache::default())),
            handle: Mutex::new(None),
        }
    }

    /// Loads the current nodes and keeps watching them in background.
    ///
    /// Restarting a started mirror resubscribes.
    pub async fn start(&self) -> Result<()> {
        let watcher = subscribe(&self.root, &self.coordination, &self.cache).await?;

        let root = self.root.clone();
        let coordination = self.coordination.clone();
        let cache = self.cache.clone();
        let handle = tokio::spawn(async move {
            watch_loop(root, coordination, cache, watcher).await;
        });
        if let Some(previous) = self.handle.lock().replace(handle) {
            previous.abort();
        }
        info!(
            "Namespace mirror started, root: {}, namespaces: {}",
            self.root,
            self.cache.read().namespaces.len()
        );

        Ok(())
    }

    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns all namespaces in name order.
    pub fn list(&self) -> Vec<NamespaceDescriptor> {
        self.cache.read().namespaces.values().cloned().collect()
    }

    pub fn list_names(&self) -> Vec<String> {
        self.cache.read().namespaces.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<NamespaceDescriptor> {
        self.cache.read().namespaces.get(name).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.cache.read().namespaces.contains_key(name)
    }

    /// Returns the revision of the coordination service the copy reflects.
    pub fn revision(&self) -> Revision {
        self.cache.read().revision
    }
}

impl Drop for NamespaceMirror {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Watches first and snapshots second, so no change is missed in between.
async fn subscribe(
    root: &str,
    coordination: &CoordinationServiceRef,
    cache: &RwLock<MirrorCache>,
) -> Result<ChildWatcher> {
    let watcher = coordination.watch_children(root).await?;
    let snapshot = coordination.children(root).await?;
    debug!(
        "Namespace mirror {} loaded {} nodes at revision {}",
        root,
        snapshot.children.len(),
        snapshot.revision
    );
    cache.write().reset(snapshot);

    Ok(watcher)
}

async fn watch_loop(
    root: String,
    coordination: CoordinationServiceRef,
    cache: Arc<RwLock<MirrorCache>>,
    mut watcher: ChildWatcher,
) {
    loop {
        while let Some(message) = watcher.next().await {
            match message {
                WatchMessage::Event(event) => {
                    debug!("Namespace mirror {} received event: {:?}", root, event);
                    cache.write().apply(event);
                }
                WatchMessage::Lagged(n) => {
                    warn!("Namespace mirror {} lagged {} events, resubscribing", root, n);
                    break;
                }
            }
        }

        watcher = loop {
            match subscribe(&root, &coordination, &cache).await {
                Ok(watcher) => break watcher,
                Err(e) => {
                    warn!(e; "Failed to resubscribe namespace mirror {}", root);
                    tokio::time::sleep(RESUBSCRIBE_INTERVAL).await;
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use common_test_util::wait::wait_for;

    use super::*;
    use crate::mirror::coordination::{child_path, CoordinationService};
    use crate::mirror::memory::MemoryCoordination;

    async fn put_node(coordination: &MemoryCoordination, descriptor: &NamespaceDescriptor) {
        coordination
            .create_or_update(
                &child_path(DEFAULT_MIRROR_ROOT, &descriptor.name),
                descriptor.try_as_raw_value().unwrap(),
            )
            .await
            .unwrap();
    }

    async fn wait_names(mirror: &NamespaceMirrorRef, names: &[&str]) -> bool {
        let expected = names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mirror = mirror.clone();
        wait_for(Duration::from_secs(5), move || {
            let mirror = mirror.clone();
            let expected = expected.clone();
            async move { mirror.list_names() == expected }
        })
        .await
    }

    #[test]
    fn test_cache_ignores_old_events() {
        let mut cache = MirrorCache::default();
        let mut children = BTreeMap::new();
        children.insert(
            "ns1".to_string(),
            NamespaceDescriptor::new("ns1").try_as_raw_value().unwrap(),
        );
        cache.reset(ChildrenSnapshot {
            revision: 5,
            children,
        });

        cache.apply(ChildEvent {
            revision: 5,
            kind: ChildEventKind::Deleted,
            name: "ns1".to_string(),
            data: vec![],
        });
        assert!(cache.namespaces.contains_key("ns1"));

        cache.apply(ChildEvent {
            revision: 6,
            kind: ChildEventKind::Created,
            name: "ns2".to_string(),
            data: b"not json".to_vec(),
        });
        assert_eq!(6, cache.revision);
        assert!(!cache.namespaces.contains_key("ns2"));

        cache.apply(ChildEvent {
            revision: 7,
            kind: ChildEventKind::Deleted,
            name: "ns1".to_string(),
            data: vec![],
        });
        assert!(cache.namespaces.is_empty());
    }

    #[tokio::test]
    async fn test_mirror_follows_nodes() {
        let coordination = Arc::new(MemoryCoordination::new());
        put_node(&coordination, &NamespaceDescriptor::new("default")).await;

        let mirror = Arc::new(NamespaceMirror::new(
            DEFAULT_MIRROR_ROOT,
            coordination.clone(),
        ));
        mirror.start().await.unwrap();
        // The initial load is synchronous.
        assert_eq!(vec!["default"], mirror.list_names());

        let descriptor = NamespaceDescriptor::new("ns1").with_configuration("k", "v");
        put_node(&coordination, &descriptor).await;
        assert!(wait_names(&mirror, &["default", "ns1"]).await);
        assert_eq!(Some(descriptor), mirror.get("ns1"));

        coordination
            .delete(&child_path(DEFAULT_MIRROR_ROOT, "ns1"))
            .await
            .unwrap();
        assert!(wait_names(&mirror, &["default"]).await);
        assert!(!mirror.exists("ns1"));
        assert_eq!(coordination.revision(), mirror.revision());
    }

    #[tokio::test]
    async fn test_mirror_recovers_from_lag() {
        let coordination = Arc::new(MemoryCoordination::with_capacity(1));
        let mirror = Arc::new(NamespaceMirror::new(
            DEFAULT_MIRROR_ROOT,
            coordination.clone(),
        ));
        mirror.start().await.unwrap();

        for i in 0..32 {
            put_node(&coordination, &NamespaceDescriptor::new(format!("ns{i:02}"))).await;
        }
        let expected = (0..32).map(|i| format!("ns{i:02}")).collect::<Vec<_>>();
        let expected = expected.iter().map(String::as_str).collect::<Vec<_>>();
        assert!(wait_names(&mirror, &expected).await);
    }
}
