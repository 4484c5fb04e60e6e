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

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

/// A monotonic counter bumped by every mutation of the coordination service.
pub type Revision = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEventKind {
    Created,
    Updated,
    Deleted,
}

/// A change of a direct child of a watched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEvent {
    /// The revision at which the change happened.
    pub revision: Revision,
    pub kind: ChildEventKind,
    /// The name of the child, relative to the watched node.
    pub name: String,
    /// The data of the child, empty for [ChildEventKind::Deleted].
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchMessage {
    Event(ChildEvent),
    /// The watcher missed the given number of events, it must take a new snapshot.
    Lagged(u64),
}

/// The direct children of a node at a revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenSnapshot {
    pub revision: Revision,
    pub children: BTreeMap<String, Vec<u8>>,
}

/// The stream of child changes. It ends when the coordination service shuts down.
pub type ChildWatcher = BoxStream<'static, WatchMessage>;

pub type CoordinationServiceRef = Arc<dyn CoordinationService>;

/// A replicated hierarchy of nodes whose children can be watched.
///
/// Paths are `/` separated, e.g. `/namespace/ns1`.
#[async_trait]
pub trait CoordinationService: Send + Sync {
    fn name(&self) -> &str;

    /// Creates the node or replaces its data. Returns the revision of the change.
    async fn create_or_update(&self, path: &str, data: Vec<u8>) -> Result<Revision>;

    /// Removes the node. Removing an absent node is a no-op and returns `None`.
    async fn delete(&self, path: &str) -> Result<Option<Revision>>;

    /// Returns the node data.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Returns the direct children of `root`.
    async fn children(&self, root: &str) -> Result<ChildrenSnapshot>;

    /// Watches the direct children of `root`, the watcher receives the changes
    /// applied after this call returns.
    async fn watch_children(&self, root: &str) -> Result<ChildWatcher>;
}

/// Returns the path of the child `name` under `root`.
pub fn child_path(root: &str, name: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), name)
}

/// Returns the child name of `path` if it is a direct child of `root`.
pub fn child_name<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    let name = path
        .strip_prefix(root.trim_end_matches('/'))?
        .strip_prefix('/')?;
    if name.is_empty() || name.contains('/') {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        assert_eq!("/namespace/ns1", child_path("/namespace", "ns1"));
        assert_eq!("/namespace/ns1", child_path("/namespace/", "ns1"));

        assert_eq!(Some("ns1"), child_name("/namespace", "/namespace/ns1"));
        assert_eq!(Some("ns1"), child_name("/namespace/", "/namespace/ns1"));
        assert_eq!(None, child_name("/namespace", "/namespace"));
        assert_eq!(None, child_name("/namespace", "/namespace/"));
        assert_eq!(None, child_name("/namespace", "/namespace/ns1/t1"));
        assert_eq!(None, child_name("/namespace", "/namespaces/ns1"));
    }
}
