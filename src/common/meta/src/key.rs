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

//! This mod defines all the keys used in the metadata store (Metasrv).
//! Specifically, there are these kinds of keys:
//!
//! 1. Namespace name key: `__namespace/{namespace}`
//!     - The value is a [NamespaceDescriptor](crate::key::namespace::NamespaceDescriptor)
//!       encoded as json.
//!
//! 2. Table name key: `__table_name/{namespace}/{table}`
//!     - Only records the existence of a table, the value is empty json object.
//!
//! All keys have related managers. The managers take care of the serialization and
//! deserialization of keys and values, and the interaction with the underlying
//! KV storage backend.

pub mod namespace;
pub mod table_name;

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;

use crate::error::{self, Result};

pub const NAME_PATTERN: &str = r"[a-zA-Z0-9_]+";

pub const NAMESPACE_NAME_KEY_PREFIX: &str = "__namespace";
pub const TABLE_NAME_KEY_PREFIX: &str = "__table_name";

lazy_static! {
    pub static ref NAME_PATTERN_REGEX: Regex = Regex::new(&format!("^{NAME_PATTERN}$")).unwrap();
    pub(crate) static ref NAMESPACE_NAME_KEY_PATTERN: Regex =
        Regex::new(&format!("^{NAMESPACE_NAME_KEY_PREFIX}/({NAME_PATTERN})$")).unwrap();
    pub(crate) static ref TABLE_NAME_KEY_PATTERN: Regex = Regex::new(&format!(
        "^{TABLE_NAME_KEY_PREFIX}/({NAME_PATTERN})/({NAME_PATTERN})$"
    ))
    .unwrap();
}

/// The key of metadata.
pub trait MetadataKey<'a, T> {
    fn to_bytes(&self) -> Vec<u8>;

    fn from_bytes(bytes: &'a [u8]) -> Result<T>;
}

/// The value of metadata, stored as json.
pub trait MetadataValue {
    fn try_from_raw_value(raw_value: &[u8]) -> Result<Self>
    where
        Self: Sized;

    fn try_as_raw_value(&self) -> Result<Vec<u8>>;
}

impl<T> MetadataValue for T
where
    T: Serialize + DeserializeOwned,
{
    fn try_from_raw_value(raw_value: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw_value).context(error::SerdeJsonSnafu)
    }

    fn try_as_raw_value(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context(error::SerdeJsonSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_pattern() {
        assert!(NAME_PATTERN_REGEX.is_match("ns1"));
        assert!(NAME_PATTERN_REGEX.is_match("my_namespace_2"));
        assert!(NAME_PATTERN_REGEX.is_match("_"));
        assert!(!NAME_PATTERN_REGEX.is_match(""));
        assert!(!NAME_PATTERN_REGEX.is_match("ns-1"));
        assert!(!NAME_PATTERN_REGEX.is_match("ns:1"));
        assert!(!NAME_PATTERN_REGEX.is_match("ns/1"));
        assert!(!NAME_PATTERN_REGEX.is_match("ns 1"));
    }
}
