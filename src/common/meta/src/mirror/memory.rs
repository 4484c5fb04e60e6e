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
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use snafu::ensure;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::{self, Result};
use crate::mirror::coordination::{
    child_name, ChildEvent, ChildEventKind, ChildWatcher, ChildrenSnapshot, CoordinationService,
    Revision, WatchMessage,
};

/// The default capacity of the event channel of [MemoryCoordination].
pub const DEFAULT_WATCH_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct NodeEvent {
    revision: Revision,
    kind: ChildEventKind,
    path: String,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    revision: Revision,
    nodes: BTreeMap<String, Vec<u8>>,
}

/// An in-process [CoordinationService].
///
/// Events are published while the state is locked, so the events of a watcher
/// are ordered by revision.
pub struct MemoryCoordination {
    state: Mutex<State>,
    events: broadcast::Sender<NodeEvent>,
    unavailable: AtomicBool,
    failures: AtomicUsize,
}

impl Default for MemoryCoordination {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_WATCH_CAPACITY)
    }
}

impl MemoryCoordination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service whose watchers lag after `capacity` pending events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Mutex::new(State::default()),
            events,
            unavailable: AtomicBool::new(false),
            failures: AtomicUsize::new(0),
        }
    }

    /// Makes the mutations and reads fail, used to simulate a partition.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Makes the next `n` requests fail.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::Relaxed);
    }

    pub fn revision(&self) -> Revision {
        self.state.lock().revision
    }

    fn ensure_available(&self) -> Result<()> {
        let injected = self
            .failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        ensure!(
            !injected && !self.unavailable.load(Ordering::Relaxed),
            error::CoordinationSnafu {
                err_msg: "memory coordination is unavailable",
            }
        );
        Ok(())
    }

    fn publish(&self, event: NodeEvent) {
        // No receiver is not an error.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl CoordinationService for MemoryCoordination {
    fn name(&self) -> &str {
        "Memory"
    }

    async fn create_or_update(&self, path: &str, data: Vec<u8>) -> Result<Revision> {
        self.ensure_available()?;

        let mut state = self.state.lock();
        state.revision += 1;
        let revision = state.revision;
        let kind = match state.nodes.insert(path.to_string(), data.clone()) {
            Some(_) => ChildEventKind::Updated,
            None => ChildEventKind::Created,
        };
        self.publish(NodeEvent {
            revision,
            kind,
            path: path.to_string(),
            data,
        });

        Ok(revision)
    }

    async fn delete(&self, path: &str) -> Result<Option<Revision>> {
        self.ensure_available()?;

        let mut state = self.state.lock();
        if state.nodes.remove(path).is_none() {
            return Ok(None);
        }
        state.revision += 1;
        let revision = state.revision;
        self.publish(NodeEvent {
            revision,
            kind: ChildEventKind::Deleted,
            path: path.to_string(),
            data: vec![],
        });

        Ok(Some(revision))
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_available()?;

        Ok(self.state.lock().nodes.get(path).cloned())
    }

    async fn children(&self, root: &str) -> Result<ChildrenSnapshot> {
        self.ensure_available()?;

        let state = self.state.lock();
        let children = state
            .nodes
            .iter()
            .filter_map(|(path, data)| {
                child_name(root, path).map(|name| (name.to_string(), data.clone()))
            })
            .collect();

        Ok(ChildrenSnapshot {
            revision: state.revision,
            children,
        })
    }

    async fn watch_children(&self, root: &str) -> Result<ChildWatcher> {
        self.ensure_available()?;

        let receiver = self.events.subscribe();
        let root = root.to_string();
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            let message = match receiver.recv().await {
                Ok(event) => WatchMessage::Event(ChildEvent {
                    revision: event.revision,
                    kind: event.kind,
                    name: event.path,
                    data: event.data,
                }),
                Err(RecvError::Lagged(n)) => WatchMessage::Lagged(n),
                Err(RecvError::Closed) => return None,
            };
            Some((message, receiver))
        })
        .filter_map(move |message| {
            let message = match message {
                WatchMessage::Event(mut event) => {
                    let name = child_name(&root, &event.name).map(str::to_string);
                    name.map(|name| {
                        event.name = name;
                        WatchMessage::Event(event)
                    })
                }
                lagged => Some(lagged),
            };
            futures::future::ready(message)
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_update_delete() {
        let coordination = MemoryCoordination::new();

        let r1 = coordination
            .create_or_update("/namespace/ns1", b"v1".to_vec())
            .await
            .unwrap();
        let r2 = coordination
            .create_or_update("/namespace/ns1", b"v2".to_vec())
            .await
            .unwrap();
        assert!(r2 > r1);
        assert_eq!(
            Some(b"v2".to_vec()),
            coordination.get("/namespace/ns1").await.unwrap()
        );

        assert!(coordination.delete("/namespace/ns1").await.unwrap().is_some());
        assert!(coordination.delete("/namespace/ns1").await.unwrap().is_none());
        assert_eq!(r2 + 1, coordination.revision());
    }

    #[tokio::test]
    async fn test_children() {
        let coordination = MemoryCoordination::new();
        for path in ["/namespace/ns1", "/namespace/ns2", "/namespace/ns1/t1", "/other/ns3"] {
            coordination
                .create_or_update(path, path.as_bytes().to_vec())
                .await
                .unwrap();
        }

        let snapshot = coordination.children("/namespace").await.unwrap();
        assert_eq!(4, snapshot.revision);
        assert_eq!(
            vec!["ns1", "ns2"],
            snapshot.children.keys().map(String::as_str).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_watch_children() {
        let coordination = MemoryCoordination::new();
        coordination
            .create_or_update("/namespace/before", vec![])
            .await
            .unwrap();

        let mut watcher = coordination.watch_children("/namespace").await.unwrap();
        coordination
            .create_or_update("/other/ns", vec![])
            .await
            .unwrap();
        coordination
            .create_or_update("/namespace/ns1", b"v1".to_vec())
            .await
            .unwrap();
        coordination.delete("/namespace/ns1").await.unwrap();

        let message = watcher.next().await.unwrap();
        assert_eq!(
            WatchMessage::Event(ChildEvent {
                revision: 3,
                kind: ChildEventKind::Created,
                name: "ns1".to_string(),
                data: b"v1".to_vec(),
            }),
            message
        );
        let WatchMessage::Event(event) = watcher.next().await.unwrap() else {
            unreachable!()
        };
        assert_eq!(ChildEventKind::Deleted, event.kind);
        assert_eq!(4, event.revision);

        drop(coordination);
        assert!(watcher.next().await.is_none());
    }

    #[tokio::test]
    async fn test_watch_lagged() {
        let coordination = MemoryCoordination::with_capacity(2);
        let mut watcher = coordination.watch_children("/namespace").await.unwrap();
        for i in 0..5 {
            coordination
                .create_or_update(&format!("/namespace/ns{i}"), vec![])
                .await
                .unwrap();
        }

        assert_eq!(WatchMessage::Lagged(3), watcher.next().await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let coordination = MemoryCoordination::new();
        coordination.set_unavailable(true);
        assert!(coordination
            .create_or_update("/namespace/ns1", vec![])
            .await
            .is_err());
        coordination.set_unavailable(false);
        coordination
            .create_or_update("/namespace/ns1", vec![])
            .await
            .unwrap();

        coordination.fail_next(2);
        assert!(coordination.get("/namespace/ns1").await.is_err());
        assert!(coordination.children("/namespace").await.is_err());
        assert!(coordination.get("/namespace/ns1").await.unwrap().is_some());
    }
}
