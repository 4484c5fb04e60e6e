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

use common_meta::NamespaceDescriptor;
use common_telemetry::info;
use common_telemetry::logging::LoggingOptions;
use meta_client::MetaClientBuilder;
use meta_srv::mocks;

fn main() {
    let _guards = common_telemetry::init_global_logging("meta-client", &LoggingOptions::default());
    run();
}

#[tokio::main]
async fn run() {
    let info = mocks::mock_with_memstore().await;
    let meta_client = MetaClientBuilder::new(info.channel.as_channel())
        .build()
        .unwrap();
    let admin = meta_client.admin();

    admin
        .create_namespace(NamespaceDescriptor::new("ns1").with_configuration("ttl", "7d"))
        .await
        .unwrap();

    let descriptors = admin.list_namespace_descriptors().await.unwrap();
    for descriptor in descriptors {
        info!("namespace: {descriptor}");
    }

    let err = admin.delete_namespace("default").await.unwrap_err();
    info!("delete reserved namespace: {err}");

    // Blocking waits belong on threads outside the runtime.
    let handle = admin.get_namespace_descriptor("ns1");
    let timeout = meta_client.ddl_timeout();
    let descriptor = tokio::task::spawn_blocking(move || handle.wait(timeout))
        .await
        .unwrap()
        .unwrap();
    info!("get namespace: {descriptor}");
}
