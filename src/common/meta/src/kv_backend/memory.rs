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

use std::any::Any;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::kv_backend::KvBackend;
use crate::metrics::METRIC_META_KV_REQUEST_ELAPSED;
use crate::rpc::store::{
    CompareAndPutRequest, CompareAndPutResponse, DeleteRangeRequest, DeleteRangeResponse,
    PutRequest, PutResponse, RangeRequest, RangeResponse,
};
use crate::rpc::KeyValue;

#[derive(Default)]
pub struct MemoryKvBackend {
    kvs: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl Display for MemoryKvBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kvs = self.kvs.read();
        for (k, v) in kvs.iter() {
            writeln!(
                f,
                "{} -> {}",
                String::from_utf8_lossy(k),
                String::from_utf8_lossy(v)
            )?;
        }
        Ok(())
    }
}

impl MemoryKvBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.kvs.write().clear();
    }

    pub fn len(&self) -> usize {
        self.kvs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.kvs.read().is_empty()
    }
}

#[async_trait]
impl KvBackend for MemoryKvBackend {
    fn name(&self) -> &str {
        "Memory"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn range(&self, req: RangeRequest) -> Result<RangeResponse> {
        let _timer = METRIC_META_KV_REQUEST_ELAPSED
            .with_label_values(&["memory", "range"])
            .start_timer();

        let range = req.range();
        let RangeRequest {
            limit, keys_only, ..
        } = req;

        let kvs = self.kvs.read();
        let values = kvs.range(range);

        let mut more = false;
        let mut iter: i64 = 0;

        let kvs = values
            .take_while(|_| {
                let take = limit == 0 || iter != limit;
                iter += 1;
                more = limit > 0 && iter > limit;

                take
            })
            .map(|(k, v)| {
                let key = k.clone();
                let value = if keys_only { vec![] } else { v.clone() };
                KeyValue { key, value }
            })
            .collect::<Vec<_>>();

        Ok(RangeResponse { kvs, more })
    }

    async fn put(&self, req: PutRequest) -> Result<PutResponse> {
        let _timer = METRIC_META_KV_REQUEST_ELAPSED
            .with_label_values(&["memory", "put"])
            .start_timer();

        let PutRequest {
            key,
            value,
            prev_kv,
        } = req;

        let mut kvs = self.kvs.write();

        let prev_kv = if prev_kv {
            kvs.insert(key.clone(), value)
                .map(|value| KeyValue { key, value })
        } else {
            kvs.insert(key, value);
            None
        };

        Ok(PutResponse { prev_kv })
    }

    async fn compare_and_put(&self, req: CompareAndPutRequest) -> Result<CompareAndPutResponse> {
        let _timer = METRIC_META_KV_REQUEST_ELAPSED
            .with_label_values(&["memory", "compare_and_put"])
            .start_timer();

        let CompareAndPutRequest { key, expect, value } = req;

        let mut kvs = self.kvs.write();

        let existed = kvs.entry(key);
        let (success, prev_kv) = match existed {
            Entry::Vacant(e) => {
                let expected = expect.is_empty();
                if expected {
                    let _ = e.insert(value);
                }
                (expected, None)
            }
            Entry::Occupied(mut existed) => {
                let expected = existed.get() == &expect;
                let prev_kv = if expected {
                    let _ = existed.insert(value);
                    None
                } else {
                    Some(KeyValue {
                        key: existed.key().clone(),
                        value: existed.get().clone(),
                    })
                };
                (expected, prev_kv)
            }
        };

        Ok(CompareAndPutResponse { success, prev_kv })
    }

    async fn delete_range(&self, req: DeleteRangeRequest) -> Result<DeleteRangeResponse> {
        let _timer = METRIC_META_KV_REQUEST_ELAPSED
            .with_label_values(&["memory", "delete_range"])
            .start_timer();

        let range = req.range();
        let DeleteRangeRequest { prev_kv, .. } = req;

        let mut kvs = self.kvs.write();

        let keys = kvs
            .range(range)
            .map(|(key, _)| key.clone())
            .collect::<Vec<_>>();

        let mut prev_kvs = if prev_kv {
            Vec::with_capacity(keys.len())
        } else {
            vec![]
        };
        let deleted = keys.len() as i64;

        for key in keys {
            if let Some(value) = kvs.remove(&key) {
                if prev_kv {
                    prev_kvs.push((key, value).into())
                }
            }
        }

        Ok(DeleteRangeResponse { deleted, prev_kvs })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn mock_mem_store_with_data() -> MemoryKvBackend {
        let kv_backend = MemoryKvBackend::new();
        for (key, value) in [("key1", "val1"), ("key2", "val2"), ("key3", "val3")] {
            kv_backend
                .put(
                    PutRequest::new()
                        .with_key(key.as_bytes().to_vec())
                        .with_value(value.as_bytes().to_vec()),
                )
                .await
                .unwrap();
        }
        kv_backend
    }

    #[tokio::test]
    async fn test_put() {
        let kv_backend = mock_mem_store_with_data().await;

        let resp = kv_backend
            .put(
                PutRequest::new()
                    .with_key(b"key1".to_vec())
                    .with_value(b"val11".to_vec())
                    .with_prev_kv(),
            )
            .await
            .unwrap();
        assert_eq!(b"val1", resp.prev_kv.unwrap().value());

        let kv = kv_backend.get(b"key1").await.unwrap().unwrap();
        assert_eq!(b"val11", kv.value());
        assert_eq!(3, kv_backend.len());
    }

    #[tokio::test]
    async fn test_range() {
        let kv_backend = mock_mem_store_with_data().await;

        let resp = kv_backend
            .range(RangeRequest::new().with_prefix(b"key".to_vec()))
            .await
            .unwrap();
        assert_eq!(3, resp.kvs.len());
        assert!(!resp.more);

        let resp = kv_backend
            .range(
                RangeRequest::new()
                    .with_prefix(b"key".to_vec())
                    .with_limit(2)
                    .with_keys_only(),
            )
            .await
            .unwrap();
        assert_eq!(2, resp.kvs.len());
        assert!(resp.more);
        assert_eq!(b"key1", resp.kvs[0].key());
        assert!(resp.kvs[0].value().is_empty());

        let resp = kv_backend
            .range(RangeRequest::new().with_range(b"key2".to_vec(), vec![0]))
            .await
            .unwrap();
        assert_eq!(2, resp.kvs.len());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_compare_and_put() {
        let kv_backend = Arc::new(MemoryKvBackend::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let kv_backend = kv_backend.clone();
            handles.push(tokio::spawn(async move {
                kv_backend
                    .put_conditionally(b"race".to_vec(), b"value".to_vec())
                    .await
                    .unwrap()
            }));
        }

        let mut success = 0;
        for handle in handles {
            if handle.await.unwrap() {
                success += 1;
            }
        }
        assert_eq!(1, success);

        let resp = kv_backend
            .compare_and_put(
                CompareAndPutRequest::new()
                    .with_key(b"race".to_vec())
                    .with_expect(b"other".to_vec())
                    .with_value(b"new".to_vec()),
            )
            .await
            .unwrap();
        assert!(!resp.is_success());
        assert_eq!(b"value", resp.prev_kv.unwrap().value());
    }

    #[tokio::test]
    async fn test_delete_range() {
        let kv_backend = mock_mem_store_with_data().await;

        let prev = kv_backend.delete(b"key3", true).await.unwrap().unwrap();
        assert_eq!(b"val3", prev.value());
        assert!(!kv_backend.exists(b"key3").await.unwrap());
        assert!(kv_backend.delete(b"key3", true).await.unwrap().is_none());

        let resp = kv_backend
            .delete_range(DeleteRangeRequest::new().with_prefix(b"key".to_vec()))
            .await
            .unwrap();
        assert_eq!(2, resp.deleted);
        assert!(kv_backend.is_empty());
    }
}
