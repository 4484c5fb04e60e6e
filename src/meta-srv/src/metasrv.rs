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

pub mod builder;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common_config::Configurable;
use common_meta::ddl::DdlTaskExecutorRef;
use common_meta::ddl_manager::DdlManagerRef;
use common_meta::kv_backend::KvBackendRef;
use common_meta::mirror::coordination::CoordinationServiceRef;
use common_meta::mirror::updater::NamespaceMirrorUpdaterRef;
use common_meta::mirror::MirrorOptions;
use common_telemetry::logging::LoggingOptions;
use common_telemetry::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{self, Result};

/// The prefix of the environment variables of [MetasrvOptions].
pub const METASRV_ENV_PREFIX: &str = "METASRV";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetasrvOptions {
    /// The logging options.
    pub logging: LoggingOptions,
    /// The options of the namespace mirror.
    pub mirror: MirrorOptions,
}

impl Configurable for MetasrvOptions {
    fn validate_sanitize(&mut self) -> common_config::error::Result<()> {
        if !self.mirror.root.starts_with('/') {
            self.mirror.root = format!("/{}", self.mirror.root);
        }
        if self.mirror.root.len() > 1 {
            self.mirror.root = self.mirror.root.trim_end_matches('/').to_string();
        }
        if self.mirror.watch_capacity == 0 {
            return common_config::error::InvalidOptionSnafu {
                key: "mirror.watch_capacity",
                reason: "must be greater than 0",
            }
            .fail();
        }
        Ok(())
    }
}

/// The coordinator. It owns the namespace store and is the only writer of it.
pub struct Metasrv {
    started: Arc<AtomicBool>,
    options: MetasrvOptions,
    kv_backend: KvBackendRef,
    coordination: CoordinationServiceRef,
    mirror_updater: NamespaceMirrorUpdaterRef,
    ddl_manager: DdlManagerRef,
}

impl Metasrv {
    /// Starts the mirror propagation and initializes the reserved namespaces.
    ///
    /// A failed start leaves the metasrv stopped, it can be started again.
    pub async fn start(&self) -> Result<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            warn!("Metasrv already started");
            return Ok(());
        }

        if let Err(e) = self.start_inner().await {
            self.mirror_updater.stop();
            self.started.store(false, Ordering::Relaxed);
            return Err(e);
        }

        info!(
            "Metasrv started, kv backend: {}, coordination: {}",
            self.kv_backend.name(),
            self.coordination.name()
        );
        Ok(())
    }

    async fn start_inner(&self) -> Result<()> {
        // The updater runs first, so the resync scheduled by init is applied.
        self.mirror_updater
            .start(self.options.mirror.resync_interval)
            .context(error::StartMirrorUpdaterSnafu)?;
        self.ddl_manager
            .namespace_manager()
            .init()
            .await
            .context(error::InitMetadataSnafu)
    }

    pub fn shutdown(&self) {
        if self.started.swap(false, Ordering::Relaxed) {
            self.mirror_updater.stop();
            info!("Metasrv stopped");
        }
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn options(&self) -> &MetasrvOptions {
        &self.options
    }

    #[inline]
    pub fn kv_backend(&self) -> &KvBackendRef {
        &self.kv_backend
    }

    #[inline]
    pub fn coordination(&self) -> &CoordinationServiceRef {
        &self.coordination
    }

    #[inline]
    pub fn ddl_manager(&self) -> &DdlManagerRef {
        &self.ddl_manager
    }

    #[inline]
    pub fn ddl_executor(&self) -> DdlTaskExecutorRef {
        self.ddl_manager.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common_meta::key::namespace::NamespaceDescriptor;
    use common_meta::mirror::coordination::CoordinationService;
    use common_test_util::wait::wait_for;

    use super::*;
    use crate::metasrv::builder::MetasrvBuilder;

    async fn wait_mirror_names(metasrv: &Metasrv, expected: &[&str]) -> bool {
        let coordination = metasrv.coordination().clone();
        let root = metasrv.options().mirror.root.clone();
        wait_for(Duration::from_secs(5), move || {
            let coordination = coordination.clone();
            let root = root.clone();
            async move {
                coordination
                    .children(&root)
                    .await
                    .map(|snapshot| {
                        snapshot
                            .children
                            .keys()
                            .map(String::as_str)
                            .eq(expected.iter().copied())
                    })
                    .unwrap_or(false)
            }
        })
        .await
    }

    #[tokio::test]
    async fn test_restart_after_shutdown() {
        let metasrv = MetasrvBuilder::new().build();
        metasrv.start().await.unwrap();
        assert!(wait_mirror_names(&metasrv, &["default", "system"]).await);

        metasrv.shutdown();
        assert!(!metasrv.is_started());
        metasrv.start().await.unwrap();
        assert!(metasrv.is_started());

        metasrv
            .ddl_manager()
            .namespace_manager()
            .create(NamespaceDescriptor::new("ns1"))
            .await
            .unwrap();
        assert!(wait_mirror_names(&metasrv, &["default", "ns1", "system"]).await);
    }

    #[tokio::test]
    async fn test_failed_start_leaves_stopped() {
        let metasrv = MetasrvBuilder::new().build();
        // Occupies the updater, so the start fails.
        metasrv.mirror_updater.start(Duration::ZERO).unwrap();

        let err = metasrv.start().await.unwrap_err();
        assert!(matches!(err, error::Error::StartMirrorUpdater { .. }), "{err:?}");
        assert!(!metasrv.is_started());

        metasrv.start().await.unwrap();
        assert!(metasrv.is_started());
        assert!(wait_mirror_names(&metasrv, &["default", "system"]).await);
    }

    #[test]
    fn test_load_options_from_env() {
        temp_env::with_vars(
            [
                ("METASRV_UT__MIRROR__ROOT", Some("ns_mirror/")),
                ("METASRV_UT__MIRROR__RESYNC_INTERVAL", Some("5s")),
                ("METASRV_UT__LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let opts = MetasrvOptions::load_layered_options(None, "METASRV_UT").unwrap();
                assert_eq!("/ns_mirror", opts.mirror.root);
                assert_eq!(Duration::from_secs(5), opts.mirror.resync_interval);
                assert_eq!(Some("debug".to_string()), opts.logging.level);
                assert_eq!(
                    MirrorOptions::default().watch_capacity,
                    opts.mirror.watch_capacity
                );
            },
        );
    }

    #[test]
    fn test_invalid_watch_capacity() {
        let mut opts = MetasrvOptions::default();
        opts.mirror.watch_capacity = 0;
        assert!(opts.validate_sanitize().is_err());
    }

    #[test]
    fn test_options_to_toml() {
        let opts = MetasrvOptions::default();
        let toml_string = opts.to_toml().unwrap();
        let parsed: MetasrvOptions = toml::from_str(&toml_string).unwrap();
        assert_eq!(opts, parsed);
    }
}
