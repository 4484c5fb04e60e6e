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

use std::fmt::{Display, Formatter};
use std::ops::Bound;

use crate::rpc::KeyValue;
use crate::util;

/// Converts `key` and `range_end` into the bounds scanned by a backend.
///
/// - If `range_end` is empty, only `key` is covered.
/// - If `range_end` is `[0]`, every key greater than or equal to `key` is covered.
/// - Otherwise `[key, range_end)` is covered.
fn range_bounds(key: &[u8], range_end: &[u8]) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    match range_end {
        [] => (Bound::Included(key.to_vec()), Bound::Included(key.to_vec())),
        [0] => (Bound::Included(key.to_vec()), Bound::Unbounded),
        _ => (
            Bound::Included(key.to_vec()),
            Bound::Excluded(range_end.to_vec()),
        ),
    }
}

fn key_display(key: &[u8]) -> String {
    String::from_utf8_lossy(key).to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeRequest {
    /// The first key in the range.
    pub key: Vec<u8>,
    /// The upper bound of the range, see [RangeRequest::with_range].
    pub range_end: Vec<u8>,
    /// Limits the number of keys returned, 0 means no limit.
    pub limit: i64,
    /// Returns only the keys and not the values.
    pub keys_only: bool,
}

impl RangeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
        range_bounds(&self.key, &self.range_end)
    }

    /// Sets the key to look up.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the range `[key, range_end)`. If `range_end` is `[0]`, the range
    /// covers every key greater than or equal to `key`.
    #[inline]
    pub fn with_range(mut self, key: impl Into<Vec<u8>>, range_end: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self.range_end = range_end.into();
        self
    }

    /// Looks up every key prefixed with `key`.
    #[inline]
    pub fn with_prefix(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self.range_end = util::get_prefix_end_key(&self.key);
        self
    }

    #[inline]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    #[inline]
    pub fn with_keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }
}

impl Display for RangeRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RangeRequest{{ key: {}, range_end: {}, limit: {}, keys_only: {} }}",
            key_display(&self.key),
            key_display(&self.range_end),
            self.limit,
            self.keys_only
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeResponse {
    pub kvs: Vec<KeyValue>,
    /// Indicates there are more keys to return than the limit.
    pub more: bool,
}

impl RangeResponse {
    #[inline]
    pub fn take_kvs(&mut self) -> Vec<KeyValue> {
        std::mem::take(&mut self.kvs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutRequest {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Returns the previous key-value pair before it is overwritten.
    pub prev_kv: bool,
}

impl PutRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self
    }

    #[inline]
    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = value.into();
        self
    }

    #[inline]
    pub fn with_prev_kv(mut self) -> Self {
        self.prev_kv = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutResponse {
    pub prev_kv: Option<KeyValue>,
}

impl PutResponse {
    #[inline]
    pub fn take_prev_kv(&mut self) -> Option<KeyValue> {
        self.prev_kv.take()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareAndPutRequest {
    pub key: Vec<u8>,
    /// An empty `expect` means the key must be absent.
    pub expect: Vec<u8>,
    pub value: Vec<u8>,
}

impl CompareAndPutRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self
    }

    #[inline]
    pub fn with_expect(mut self, expect: impl Into<Vec<u8>>) -> Self {
        self.expect = expect.into();
        self
    }

    #[inline]
    pub fn with_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = value.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareAndPutResponse {
    pub success: bool,
    pub prev_kv: Option<KeyValue>,
}

impl CompareAndPutResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.success
    }

    #[inline]
    pub fn take_prev_kv(&mut self) -> Option<KeyValue> {
        self.prev_kv.take()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRangeRequest {
    pub key: Vec<u8>,
    pub range_end: Vec<u8>,
    /// Returns the deleted key-value pairs.
    pub prev_kv: bool,
}

impl DeleteRangeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
        range_bounds(&self.key, &self.range_end)
    }

    #[inline]
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self
    }

    #[inline]
    pub fn with_range(mut self, key: impl Into<Vec<u8>>, range_end: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self.range_end = range_end.into();
        self
    }

    #[inline]
    pub fn with_prefix(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = key.into();
        self.range_end = util::get_prefix_end_key(&self.key);
        self
    }

    #[inline]
    pub fn with_prev_kv(mut self) -> Self {
        self.prev_kv = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRangeResponse {
    pub deleted: i64,
    pub prev_kvs: Vec<KeyValue>,
}

impl DeleteRangeResponse {
    #[inline]
    pub fn take_prev_kvs(&mut self) -> Vec<KeyValue> {
        std::mem::take(&mut self.prev_kvs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_request_bounds() {
        let req = RangeRequest::new().with_key(b"a".to_vec());
        assert_eq!(
            (Bound::Included(b"a".to_vec()), Bound::Included(b"a".to_vec())),
            req.range()
        );

        let req = RangeRequest::new().with_range(b"a".to_vec(), vec![0]);
        assert_eq!(
            (Bound::Included(b"a".to_vec()), Bound::Unbounded),
            req.range()
        );

        let req = RangeRequest::new().with_prefix(b"ab".to_vec());
        assert_eq!(
            (Bound::Included(b"ab".to_vec()), Bound::Excluded(b"ac".to_vec())),
            req.range()
        );
    }

    #[test]
    fn test_delete_range_request() {
        let req = DeleteRangeRequest::new()
            .with_prefix(b"__namespace/".to_vec())
            .with_prev_kv();
        assert!(req.prev_kv);
        assert_eq!(b"__namespace0".to_vec(), req.range_end);
    }
}
