// Copyright 2025 eraflo
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

//! Adapter discovery and caching.

use crate::config::RuntimeConfig;
use crate::sync::lock;
use std::sync::{Arc, Mutex};
use strata_core::renderer::api::{AdapterInfo, BackendKind};
use strata_core::renderer::traits::{NativeAdapter, NativeApi};

/// An adapter that passed filtering, with the API that exposes it.
#[derive(Debug, Clone)]
pub struct CachedAdapter {
    /// API used to open the adapter.
    pub api: Arc<dyn NativeApi>,
    /// The adapter as reported by the API.
    pub adapter: NativeAdapter,
}

impl CachedAdapter {
    /// Descriptor reported to callers.
    pub fn info(&self) -> &AdapterInfo {
        &self.adapter.info
    }
}

/// Hardware adapters discovered across every registered API.
///
/// Populated on first use and reused afterwards. An empty cache is filled
/// again on the next query, so a machine without adapters keeps retrying.
#[derive(Debug, Default)]
pub struct AdapterCache {
    entries: Mutex<Vec<CachedAdapter>>,
}

impl AdapterCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached adapters, discovering them if the cache is empty.
    pub fn adapters(&self, apis: &[Arc<dyn NativeApi>], config: &RuntimeConfig) -> Vec<CachedAdapter> {
        let mut entries = lock(&self.entries);
        if entries.is_empty() {
            *entries = discover(apis, config);
            log::info!("Discovered {} hardware adapter(s)", entries.len());
        }
        entries.clone()
    }

    /// The `index`-th cached adapter of `backend`.
    pub fn find(
        &self,
        apis: &[Arc<dyn NativeApi>],
        config: &RuntimeConfig,
        backend: BackendKind,
        index: usize,
    ) -> Option<CachedAdapter> {
        self.adapters(apis, config)
            .into_iter()
            .filter(|entry| entry.adapter.info.backend == backend)
            .nth(index)
    }

    /// Drops every cached adapter.
    pub fn invalidate(&self) {
        lock(&self.entries).clear();
    }

    /// Number of cached adapters. Does not trigger discovery.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn discover(apis: &[Arc<dyn NativeApi>], config: &RuntimeConfig) -> Vec<CachedAdapter> {
    let mut ordered: Vec<&Arc<dyn NativeApi>> = apis.iter().collect();
    ordered.sort_by_key(|api| config.backend_rank(api.backend()));

    let mut found = Vec::new();
    for api in ordered {
        let adapters = match api.enumerate_adapters() {
            Ok(adapters) => adapters,
            Err(err) => {
                log::warn!("Skipping {} adapters: {err}", api.backend());
                continue;
            }
        };
        for adapter in adapters {
            if adapter.software && !config.allow_software_adapters {
                log::warn!("Filtered software adapter '{}'", adapter.info.name);
                continue;
            }
            if config.probe_adapters {
                if let Err(err) = api.probe(&adapter) {
                    log::warn!(
                        "Filtered adapter '{}' after a failed probe: {err}",
                        adapter.info.name
                    );
                    continue;
                }
            }
            log::debug!("Found {} adapter '{}'", api.backend(), adapter.info.name);
            found.push(CachedAdapter {
                api: Arc::clone(api),
                adapter,
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_infra::{SoftAdapter, SoftApi};

    fn apis(list: Vec<SoftApi>) -> Vec<Arc<dyn NativeApi>> {
        list.into_iter()
            .map(|api| Arc::new(api) as Arc<dyn NativeApi>)
            .collect()
    }

    #[test]
    fn software_and_failing_adapters_are_filtered() {
        let api = SoftApi::new(BackendKind::Vulkan).with_adapters(vec![
            SoftAdapter::software("llvmpipe"),
            SoftAdapter::hardware("Discrete"),
            SoftAdapter::hardware("Broken").failing_probe(),
        ]);
        let cache = AdapterCache::new();
        let found = cache.adapters(&apis(vec![api]), &RuntimeConfig::default());
        let names: Vec<_> = found.iter().map(|entry| entry.info().name.as_str()).collect();
        assert_eq!(names, vec!["Discrete"]);
    }

    #[test]
    fn software_adapters_can_be_allowed() {
        let api = SoftApi::new(BackendKind::Vulkan)
            .with_adapters(vec![SoftAdapter::software("WARP")]);
        let config = RuntimeConfig {
            allow_software_adapters: true,
            ..Default::default()
        };
        let found = AdapterCache::new().adapters(&apis(vec![api]), &config);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn preferred_backends_come_first() {
        let registered = apis(vec![
            SoftApi::new(BackendKind::Vulkan),
            SoftApi::new(BackendKind::D3d12),
        ]);
        let config = RuntimeConfig {
            preferred_backends: vec![BackendKind::D3d12],
            ..Default::default()
        };
        let found = AdapterCache::new().adapters(&registered, &config);
        let backends: Vec<_> = found.iter().map(|entry| entry.info().backend).collect();
        assert_eq!(backends, vec![BackendKind::D3d12, BackendKind::Vulkan]);
    }

    #[test]
    fn indexes_are_per_backend() {
        let registered = apis(vec![
            SoftApi::new(BackendKind::Vulkan).with_adapters(vec![
                SoftAdapter::hardware("A"),
                SoftAdapter::hardware("B"),
            ]),
            SoftApi::new(BackendKind::D3d12),
        ]);
        let config = RuntimeConfig::default();
        let cache = AdapterCache::new();
        let second = cache.find(&registered, &config, BackendKind::Vulkan, 1).unwrap();
        assert_eq!(second.info().name, "B");
        assert!(cache.find(&registered, &config, BackendKind::D3d12, 1).is_none());
        assert!(cache.find(&registered, &config, BackendKind::Metal, 0).is_none());
    }
}
