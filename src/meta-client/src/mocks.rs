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

use meta_srv::mocks as server_mock;
use meta_srv::mocks::MockInfo;

use crate::client::{MetaClient, MetaClientBuilder};

/// Builds a client talking to an in-process metasrv with in-memory backends.
pub async fn mock_client() -> (MetaClient, MockInfo) {
    let info = server_mock::mock_with_memstore().await;
    let client = MetaClientBuilder::new(info.channel.as_channel())
        .build()
        .unwrap();
    (client, info)
}
