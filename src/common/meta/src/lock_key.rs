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

use std::fmt::Display;

const NAMESPACE_LOCK_PREFIX: &str = "__namespace_lock";

/// [NamespaceLock] serializes every mutation of a namespace, including the
/// creation and removal of the tables inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceLock<'a>(pub &'a str);

impl Display for NamespaceLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", NAMESPACE_LOCK_PREFIX, self.0)
    }
}

impl From<NamespaceLock<'_>> for String {
    fn from(value: NamespaceLock<'_>) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_lock_key() {
        assert_eq!("__namespace_lock/ns1", NamespaceLock("ns1").to_string());
        assert_eq!(
            "__namespace_lock/default".to_string(),
            String::from(NamespaceLock("default"))
        );
    }
}
