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

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod client;
pub mod error;
pub mod handle;
#[cfg(any(test, feature = "mock"))]
pub mod mocks;

pub use crate::client::{AsyncAdmin, MetaClient, MetaClientBuilder};
pub use crate::handle::CompletionHandle;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetaClientOptions {
    /// Default deadline of a blocking wait on a ddl result.
    #[serde(with = "humantime_serde")]
    pub ddl_timeout: Duration,
}

fn default_ddl_timeout() -> Duration {
    Duration::from_millis(10_000u64)
}

impl Default for MetaClientOptions {
    fn default() -> Self {
        Self {
            ddl_timeout: default_ddl_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_toml() {
        let options: MetaClientOptions = toml::from_str("ddl_timeout = \"3s\"").unwrap();
        assert_eq!(Duration::from_secs(3), options.ddl_timeout);

        let options: MetaClientOptions = toml::from_str("").unwrap();
        assert_eq!(MetaClientOptions::default(), options);
    }
}
