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

use lazy_static::lazy_static;
use prometheus::*;

lazy_static! {
    pub static ref METRIC_META_KV_REQUEST_ELAPSED: HistogramVec = register_histogram_vec!(
        "greptime_meta_kv_request_elapsed",
        "meta kv request elapsed",
        &["target", "op"]
    )
    .unwrap();
    pub static ref METRIC_META_NAMESPACE_DDL_ELAPSED: HistogramVec = register_histogram_vec!(
        "greptime_meta_namespace_ddl_elapsed",
        "meta namespace ddl elapsed",
        &["op"]
    )
    .unwrap();
    pub static ref METRIC_META_NAMESPACE_DDL_ERROR: IntCounterVec = register_int_counter_vec!(
        "greptime_meta_namespace_ddl_error",
        "meta namespace ddl error",
        &["op"]
    )
    .unwrap();
    pub static ref METRIC_META_CREATE_NAMESPACE_COUNTER: IntCounter = register_int_counter!(
        "greptime_meta_create_namespace_counter",
        "meta create namespace"
    )
    .unwrap();
    pub static ref METRIC_META_TABLE_DDL_ELAPSED: HistogramVec = register_histogram_vec!(
        "greptime_meta_table_ddl_elapsed",
        "meta table ddl elapsed",
        &["op"]
    )
    .unwrap();
    /// Waiting time of the per-name lock.
    pub static ref METRIC_META_KEY_LOCK_WAIT: Histogram = register_histogram!(
        "greptime_meta_key_lock_wait",
        "meta key lock wait"
    )
    .unwrap();
    pub static ref METRIC_META_MIRROR_UPDATE: IntCounterVec = register_int_counter_vec!(
        "greptime_meta_mirror_update",
        "meta mirror update",
        &["kind", "result"]
    )
    .unwrap();
    pub static ref METRIC_META_MIRROR_RESYNC_ELAPSED: Histogram = register_histogram!(
        "greptime_meta_mirror_resync_elapsed",
        "meta mirror resync elapsed"
    )
    .unwrap();
    /// Number of namespaces in the local mirror of an observer.
    pub static ref METRIC_META_MIRROR_NAMESPACES: IntGauge = register_int_gauge!(
        "greptime_meta_mirror_namespaces",
        "meta mirror namespaces"
    )
    .unwrap();
}
