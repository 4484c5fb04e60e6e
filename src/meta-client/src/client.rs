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

pub mod admin;
mod ddl;

use std::sync::Arc;

use common_meta::rpc::ddl::DdlChannelRef;
use snafu::ResultExt;
use tokio::runtime::Handle;

pub use self::admin::AsyncAdmin;
use crate::error::{self, Result};
use crate::MetaClientOptions;

pub struct MetaClientBuilder {
    options: MetaClientOptions,
    channel: DdlChannelRef,
    runtime: Option<Handle>,
}

impl MetaClientBuilder {
    pub fn new(channel: DdlChannelRef) -> Self {
        Self {
            options: MetaClientOptions::default(),
            channel,
            runtime: None,
        }
    }

    pub fn options(mut self, options: MetaClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the runtime that drives the in-flight calls. Defaults to the
    /// runtime the builder is built on.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<MetaClient> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().context(error::NoRuntimeSnafu)?,
        };

        Ok(MetaClient {
            options: self.options,
            ddl_client: Arc::new(ddl::Client::new(self.channel)),
            runtime,
        })
    }
}

/// Client of the metasrv admin service.
#[derive(Clone, Debug)]
pub struct MetaClient {
    options: MetaClientOptions,
    ddl_client: Arc<ddl::Client>,
    runtime: Handle,
}

impl MetaClient {
    pub fn options(&self) -> &MetaClientOptions {
        &self.options
    }

    /// The deadline callers use for [crate::handle::CompletionHandle::wait]
    /// when they have none of their own.
    pub fn ddl_timeout(&self) -> std::time::Duration {
        self.options.ddl_timeout
    }

    pub fn admin(&self) -> AsyncAdmin {
        AsyncAdmin::new(self.ddl_client.clone(), self.runtime.clone())
    }
}
