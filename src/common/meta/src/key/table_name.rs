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

use serde::{Deserialize, Serialize};
use snafu::OptionExt;

use crate::error::{Error, InvalidMetadataSnafu, Result};
use crate::key::{MetadataKey, MetadataValue, TABLE_NAME_KEY_PATTERN, TABLE_NAME_KEY_PREFIX};
use crate::kv_backend::KvBackendRef;
use crate::rpc::store::RangeRequest;
use crate::table_name::TableName;

/// The table name key, records the existence of a table in a namespace.
///
/// The layout: `__table_name/{namespace}/{table}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableNameKey<'a> {
    pub namespace: &'a str,
    pub table: &'a str,
}

impl<'a> TableNameKey<'a> {
    pub fn new(namespace: &'a str, table: &'a str) -> Self {
        Self { namespace, table }
    }

    pub fn prefix_to_table(namespace: &str) -> String {
        format!("{}/{}/", TABLE_NAME_KEY_PREFIX, namespace)
    }
}

impl<'a> MetadataKey<'a, TableNameKey<'a>> for TableNameKey<'_> {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    fn from_bytes(bytes: &'a [u8]) -> Result<TableNameKey<'a>> {
        let key = std::str::from_utf8(bytes).map_err(|e| {
            InvalidMetadataSnafu {
                err_msg: format!(
                    "TableNameKey '{}' is not a valid UTF8 string: {e}",
                    String::from_utf8_lossy(bytes)
                ),
            }
            .build()
        })?;
        TableNameKey::try_from(key)
    }
}

impl Display for TableNameKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}",
            Self::prefix_to_table(self.namespace),
            self.table
        )
    }
}

impl<'a> From<&'a TableName> for TableNameKey<'a> {
    fn from(value: &'a TableName) -> Self {
        Self {
            namespace: &value.namespace,
            table: &value.table,
        }
    }
}

impl From<TableNameKey<'_>> for TableName {
    fn from(value: TableNameKey<'_>) -> Self {
        TableName::new(value.namespace, value.table)
    }
}

impl<'a> TryFrom<&'a str> for TableNameKey<'a> {
    type Error = Error;

    fn try_from(s: &'a str) -> Result<Self> {
        let captures = TABLE_NAME_KEY_PATTERN
            .captures(s)
            .context(InvalidMetadataSnafu {
                err_msg: format!("Illegal TableNameKey format: '{s}'"),
            })?;
        // Safety: pass the regex check above
        Ok(Self {
            namespace: captures.get(1).unwrap().as_str(),
            table: captures.get(2).unwrap().as_str(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TableNameValue {}

pub struct TableNameManager {
    kv_backend: KvBackendRef,
}

impl TableNameManager {
    pub fn new(kv_backend: KvBackendRef) -> Self {
        Self { kv_backend }
    }

    /// Records the table name. Returns `false` if it already exists.
    pub async fn create(&self, key: &TableNameKey<'_>) -> Result<bool> {
        let raw_key = key.to_bytes();
        let raw_value = TableNameValue::default().try_as_raw_value()?;

        self.kv_backend.put_conditionally(raw_key, raw_value).await
    }

    pub async fn exists(&self, key: &TableNameKey<'_>) -> Result<bool> {
        let raw_key = key.to_bytes();

        self.kv_backend.exists(&raw_key).await
    }

    /// Removes the table name. Returns `false` if it was absent.
    pub async fn delete(&self, key: &TableNameKey<'_>) -> Result<bool> {
        let raw_key = key.to_bytes();

        Ok(self.kv_backend.delete(&raw_key, true).await?.is_some())
    }

    /// Returns the names of the tables in the namespace.
    pub async fn tables(&self, namespace: &str) -> Result<Vec<String>> {
        let req = RangeRequest::new()
            .with_prefix(TableNameKey::prefix_to_table(namespace))
            .with_keys_only();
        let resp = self.kv_backend.range(req).await?;

        resp.kvs
            .iter()
            .map(|kv| {
                let key = TableNameKey::from_bytes(&kv.key)?;
                Ok(key.table.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::kv_backend::memory::MemoryKvBackend;

    #[test]
    fn test_strip_table_name() {
        let key = TableNameKey::new("ns1", "t1");
        assert_eq!("__table_name/ns1/t1", key.to_string());

        let parsed = TableNameKey::from_bytes(b"__table_name/ns1/t1").unwrap();
        assert_eq!(key, parsed);
        assert_eq!(TableName::new("ns1", "t1"), TableName::from(parsed));

        assert!(TableNameKey::from_bytes(b"__table_name/ns1").is_err());
        assert!(TableNameKey::from_bytes(b"__namespace/ns1").is_err());
    }

    #[tokio::test]
    async fn test_table_name_manager() {
        let manager = TableNameManager::new(Arc::new(MemoryKvBackend::new()));

        let t1 = TableName::new("ns1", "t1");
        let t2 = TableName::new("ns1", "t2");
        let other = TableName::new("ns10", "t1");
        assert!(manager.create(&(&t1).into()).await.unwrap());
        assert!(!manager.create(&(&t1).into()).await.unwrap());
        assert!(manager.create(&(&t2).into()).await.unwrap());
        assert!(manager.create(&(&other).into()).await.unwrap());

        // `ns10` shares the textual prefix but is another namespace.
        assert_eq!(vec!["t1", "t2"], manager.tables("ns1").await.unwrap());
        assert!(manager.exists(&(&t2).into()).await.unwrap());

        assert!(manager.delete(&(&t2).into()).await.unwrap());
        assert!(!manager.delete(&(&t2).into()).await.unwrap());
        assert_eq!(vec!["t1"], manager.tables("ns1").await.unwrap());
    }
}
