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
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt, ResultExt};

use crate::error::{self, Error, InvalidMetadataSnafu, Result};
use crate::key::{
    MetadataKey, MetadataValue, NAMESPACE_NAME_KEY_PATTERN, NAMESPACE_NAME_KEY_PREFIX,
    NAME_PATTERN_REGEX,
};
use crate::kv_backend::KvBackendRef;
use crate::rpc::store::{PutRequest, RangeRequest};
use crate::rpc::KeyValue;

/// The namespace that unqualified tables belong to.
pub const DEFAULT_NAMESPACE_NAME: &str = "default";
/// The namespace that holds the internal tables.
pub const SYSTEM_NAMESPACE_NAME: &str = "system";
/// Namespaces that always exist and can never be removed.
pub const RESERVED_NAMESPACES: [&str; 2] = [DEFAULT_NAMESPACE_NAME, SYSTEM_NAMESPACE_NAME];

pub fn is_reserved_namespace(name: &str) -> bool {
    RESERVED_NAMESPACES.contains(&name)
}

/// Checks the namespace name is non-empty and only contains `[a-zA-Z0-9_]`.
pub fn validate_namespace_name(name: &str) -> Result<()> {
    ensure!(
        NAME_PATTERN_REGEX.is_match(name),
        error::InvalidNamespaceNameSnafu {
            name,
            reason: "namespace name must be non-empty and only contain [a-zA-Z0-9_]",
        }
    );
    Ok(())
}

/// The descriptor of a namespace.
///
/// A descriptor returned by any read is a snapshot, changing it has no effect
/// on the stored namespace until it is submitted by a modification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDescriptor {
    pub name: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

impl NamespaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: BTreeMap::new(),
        }
    }

    pub fn with_configuration(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_configuration(key, value);
        self
    }

    pub fn set_configuration(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self.configuration.insert(key.into(), value.into());
    }

    pub fn remove_configuration(&mut self, key: &str) -> Option<String> {
        self.configuration.remove(key)
    }

    pub fn configuration_value(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }
}

impl Display for NamespaceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{NAME => '{}'", self.name)?;
        for (k, v) in &self.configuration {
            write!(f, ", '{}' => '{}'", k, v)?;
        }
        write!(f, "}}")
    }
}

/// The namespace name key, indices all namespace names
///
/// The layout: `__namespace/{namespace}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamespaceNameKey<'a> {
    pub namespace: &'a str,
}

impl<'a> NamespaceNameKey<'a> {
    pub fn new(namespace: &'a str) -> Self {
        Self { namespace }
    }

    pub fn range_start_key() -> String {
        format!("{}/", NAMESPACE_NAME_KEY_PREFIX)
    }
}

impl<'a> MetadataKey<'a, NamespaceNameKey<'a>> for NamespaceNameKey<'_> {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    fn from_bytes(bytes: &'a [u8]) -> Result<NamespaceNameKey<'a>> {
        let key = std::str::from_utf8(bytes).map_err(|e| {
            InvalidMetadataSnafu {
                err_msg: format!(
                    "NamespaceNameKey '{}' is not a valid UTF8 string: {e}",
                    String::from_utf8_lossy(bytes)
                ),
            }
            .build()
        })?;
        NamespaceNameKey::try_from(key)
    }
}

impl Display for NamespaceNameKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", NAMESPACE_NAME_KEY_PREFIX, self.namespace)
    }
}

impl<'a> TryFrom<&'a str> for NamespaceNameKey<'a> {
    type Error = Error;

    fn try_from(s: &'a str) -> Result<Self> {
        let captures = NAMESPACE_NAME_KEY_PATTERN
            .captures(s)
            .context(InvalidMetadataSnafu {
                err_msg: format!("Illegal NamespaceNameKey format: '{s}'"),
            })?;

        // Safety: pass the regex check above
        Ok(Self {
            namespace: captures.get(1).unwrap().as_str(),
        })
    }
}

/// Decodes `KeyValue` to a [NamespaceDescriptor], the name always comes from the key.
pub fn namespace_decoder(kv: KeyValue) -> Result<NamespaceDescriptor> {
    let str = std::str::from_utf8(&kv.key).context(error::ConvertRawKeySnafu)?;
    let key = NamespaceNameKey::try_from(str)?;
    let mut descriptor = NamespaceDescriptor::try_from_raw_value(&kv.value)?;
    ensure!(
        descriptor.name == key.namespace,
        InvalidMetadataSnafu {
            err_msg: format!(
                "Namespace descriptor name '{}' mismatches key '{}'",
                descriptor.name, str
            ),
        }
    );
    descriptor.name = key.namespace.to_string();

    Ok(descriptor)
}

/// The durable store of namespace descriptors.
///
/// It does not enforce any existence policy: `put` overwrites and `delete`
/// of an absent name is a no-op.
#[derive(Clone)]
pub struct NamespaceStore {
    kv_backend: KvBackendRef,
}

impl NamespaceStore {
    pub fn new(kv_backend: KvBackendRef) -> Self {
        Self { kv_backend }
    }

    pub async fn get(&self, namespace: &str) -> Result<Option<NamespaceDescriptor>> {
        let raw_key = NamespaceNameKey::new(namespace).to_bytes();

        self.kv_backend
            .get(&raw_key)
            .await?
            .map(namespace_decoder)
            .transpose()
    }

    pub async fn exists(&self, namespace: &str) -> Result<bool> {
        let raw_key = NamespaceNameKey::new(namespace).to_bytes();

        self.kv_backend.exists(&raw_key).await
    }

    /// Writes the descriptor, overwriting any existing one.
    pub async fn put(&self, descriptor: &NamespaceDescriptor) -> Result<()> {
        let raw_key = NamespaceNameKey::new(&descriptor.name).to_bytes();
        let raw_value = descriptor.try_as_raw_value()?;
        let _ = self
            .kv_backend
            .put(PutRequest::new().with_key(raw_key).with_value(raw_value))
            .await?;

        Ok(())
    }

    /// Writes the descriptor only if the name is absent. Returns `false` if the
    /// name already exists.
    pub async fn put_if_absent(&self, descriptor: &NamespaceDescriptor) -> Result<bool> {
        let raw_key = NamespaceNameKey::new(&descriptor.name).to_bytes();
        let raw_value = descriptor.try_as_raw_value()?;

        self.kv_backend.put_conditionally(raw_key, raw_value).await
    }

    /// Removes the descriptor. Removing an absent name is a no-op.
    pub async fn delete(&self, namespace: &str) -> Result<()> {
        let raw_key = NamespaceNameKey::new(namespace).to_bytes();
        let _ = self.kv_backend.delete(&raw_key, false).await?;

        Ok(())
    }

    /// Returns all descriptors in name order.
    pub async fn list(&self) -> Result<Vec<NamespaceDescriptor>> {
        let req = RangeRequest::new().with_prefix(NamespaceNameKey::range_start_key());
        let resp = self.kv_backend.range(req).await?;

        resp.kvs.into_iter().map(namespace_decoder).collect()
    }

    /// Returns all namespace names in order.
    pub async fn list_names(&self) -> Result<Vec<String>> {
        let req = RangeRequest::new()
            .with_prefix(NamespaceNameKey::range_start_key())
            .with_keys_only();
        let resp = self.kv_backend.range(req).await?;

        resp.kvs
            .iter()
            .map(|kv| {
                let key = NamespaceNameKey::from_bytes(&kv.key)?;
                Ok(key.namespace.to_string())
            })
            .collect()
    }
}
