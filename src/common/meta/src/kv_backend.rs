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

pub mod memory;

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::rpc::store::{
    CompareAndPutRequest, CompareAndPutResponse, DeleteRangeRequest, DeleteRangeResponse,
    PutRequest, PutResponse, RangeRequest, RangeResponse,
};
use crate::rpc::KeyValue;

pub type KvBackendRef = Arc<dyn KvBackend>;

/// A durable key-value store that holds the cluster metadata.
#[async_trait]
pub trait KvBackend: Send + Sync {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    async fn range(&self, req: RangeRequest) -> Result<RangeResponse>;

    async fn put(&self, req: PutRequest) -> Result<PutResponse>;

    /// Atomically puts `value` if the current value of `key` equals `expect`.
    /// An empty `expect` means the key must be absent.
    async fn compare_and_put(&self, req: CompareAndPutRequest) -> Result<CompareAndPutResponse>;

    async fn delete_range(&self, req: DeleteRangeRequest) -> Result<DeleteRangeResponse>;

    /// Puts a value at a key. Returns `true` if the key was absent and the put
    /// succeeded, `false` if the key already existed.
    async fn put_conditionally(&self, key: Vec<u8>, value: Vec<u8>) -> Result<bool> {
        let resp = self
            .compare_and_put(
                CompareAndPutRequest::new()
                    .with_key(key)
                    .with_expect(vec![])
                    .with_value(value),
            )
            .await?;
        Ok(resp.success)
    }

    /// Checks if the key exists, without returning the value.
    async fn exists(&self, key: &[u8]) -> Result<bool> {
        let req = RangeRequest::new().with_key(key.to_vec()).with_keys_only();
        let resp = self.range(req).await?;
        Ok(!resp.kvs.is_empty())
    }

    async fn get(&self, key: &[u8]) -> Result<Option<KeyValue>> {
        let req = RangeRequest::new().with_key(key.to_vec());
        let mut resp = self.range(req).await?;
        Ok(if resp.kvs.is_empty() {
            None
        } else {
            Some(resp.kvs.remove(0))
        })
    }

    /// Removes the key, returns the removed value if it existed.
    async fn delete(&self, key: &[u8], prev_kv: bool) -> Result<Option<KeyValue>> {
        let mut req = DeleteRangeRequest::new().with_key(key.to_vec());
        if prev_kv {
            req = req.with_prev_kv();
        }
        let mut resp = self.delete_range(req).await?;
        if resp.prev_kvs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(resp.prev_kvs.remove(0)))
        }
    }
}
