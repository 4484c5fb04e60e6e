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

use std::sync::Arc;

use common_config::Configurable;
use common_meta::kv_backend::KvBackendRef;
use common_meta::mirror::coordination::CoordinationServiceRef;
use common_telemetry::info;
use common_telemetry::tracing_appender::non_blocking::WorkerGuard;
use snafu::ResultExt;

use crate::error::{self, Result};
use crate::metasrv::builder::MetasrvBuilder;
use crate::metasrv::{Metasrv, MetasrvOptions, METASRV_ENV_PREFIX};

/// Loads the options from the defaults, the `METASRV__*` environment variables
/// and the optional TOML file, in increasing precedence.
pub fn load_options(config_file: Option<&str>) -> Result<MetasrvOptions> {
    MetasrvOptions::load_layered_options(config_file, METASRV_ENV_PREFIX)
        .context(error::LoadLayeredOptionsSnafu)
}

/// Initializes the global logger, the returned guards must be kept alive.
pub fn init_logging(opts: &MetasrvOptions) -> Vec<WorkerGuard> {
    common_telemetry::init_global_logging("metasrv", &opts.logging)
}

pub struct MetasrvInstance {
    metasrv: Arc<Metasrv>,
    opts: MetasrvOptions,
}

impl MetasrvInstance {
    pub fn new(
        opts: MetasrvOptions,
        kv_backend: KvBackendRef,
        coordination: CoordinationServiceRef,
    ) -> Self {
        let metasrv = MetasrvBuilder::new()
            .options(opts.clone())
            .kv_backend(kv_backend)
            .coordination(coordination)
            .build();

        Self {
            metasrv: Arc::new(metasrv),
            opts,
        }
    }

    pub async fn start(&self) -> Result<()> {
        self.metasrv.start().await?;
        info!("Metasrv instance started, mirror root: {}", self.opts.mirror.root);
        Ok(())
    }

    pub fn shutdown(&self) {
        self.metasrv.shutdown();
    }

    pub fn get_inner(&self) -> &Arc<Metasrv> {
        &self.metasrv
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use common_meta::kv_backend::memory::MemoryKvBackend;
    use common_meta::mirror::memory::MemoryCoordination;
    use common_test_util::temp_dir::create_named_temp_file;

    use super::*;

    #[test]
    fn test_load_options_from_file() {
        let mut file = create_named_temp_file();
        let toml_str = r#"
            [mirror]
            root = "/ns"
            resync_interval = "30s"
            watch_capacity = 16

            [logging]
            level = "debug"
        "#;
        write!(file, "{}", toml_str).unwrap();

        let opts = load_options(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!("/ns", opts.mirror.root);
        assert_eq!(Duration::from_secs(30), opts.mirror.resync_interval);
        assert_eq!(16, opts.mirror.watch_capacity);
        assert_eq!(Some("debug".to_string()), opts.logging.level);
    }

    #[tokio::test]
    async fn test_instance_lifecycle() {
        let instance = MetasrvInstance::new(
            MetasrvOptions::default(),
            Arc::new(MemoryKvBackend::new()),
            Arc::new(MemoryCoordination::new()),
        );
        instance.start().await.unwrap();
        assert!(instance.get_inner().is_started());

        let names = instance
            .get_inner()
            .ddl_manager()
            .namespace_manager()
            .list_names()
            .await
            .unwrap();
        assert_eq!(vec!["default", "system"], names);

        instance.shutdown();
        assert!(!instance.get_inner().is_started());
    }
}
