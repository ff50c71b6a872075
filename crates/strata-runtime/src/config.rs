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

//! Runtime configuration.

use anyhow::Context as _;
use serde::Deserialize;
use std::path::Path;
use strata_core::renderer::api::{BackendKind, MIN_BUFFER_COUNT};

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "STRATA_CONFIG";

/// Tunables of a [`crate::Runtime`].
///
/// Every field has a default, so a configuration file only needs the keys it
/// changes:
///
/// ```json
/// { "preferred_backends": ["vulkan"], "allow_software_adapters": true }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Backends enumerated first, in this order. Other backends follow in
    /// the order the native APIs were registered.
    pub preferred_backends: Vec<BackendKind>,
    /// Open and close a device on each adapter before listing it.
    pub probe_adapters: bool,
    /// List software rasterizers next to hardware adapters.
    pub allow_software_adapters: bool,
    /// Swapchain image count used when a surface asks for zero.
    pub default_buffer_count: u32,
    /// Present interval used when a surface asks for zero.
    pub default_present_interval: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            preferred_backends: platform_backends(),
            probe_adapters: true,
            allow_software_adapters: false,
            default_buffer_count: MIN_BUFFER_COUNT,
            default_present_interval: 1,
        }
    }
}

fn platform_backends() -> Vec<BackendKind> {
    if cfg!(target_os = "windows") {
        vec![BackendKind::D3d12, BackendKind::Vulkan]
    } else if cfg!(any(target_os = "macos", target_os = "ios")) {
        vec![BackendKind::Metal]
    } else {
        vec![BackendKind::Vulkan]
    }
}

impl RuntimeConfig {
    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read runtime config {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse runtime config {}", path.display()))
    }

    /// Loads the file named by [`CONFIG_ENV_VAR`].
    ///
    /// A missing variable yields the defaults. A file that cannot be read or
    /// parsed is logged and also yields the defaults.
    pub fn from_env() -> Self {
        match std::env::var_os(CONFIG_ENV_VAR) {
            None => Self::default(),
            Some(path) => Self::from_file(&path).unwrap_or_else(|err| {
                log::warn!("Ignoring {CONFIG_ENV_VAR}: {err:#}");
                Self::default()
            }),
        }
    }

    /// Swapchain image count for a requested `count`.
    pub fn buffer_count(&self, count: u32) -> u32 {
        let count = if count == 0 {
            self.default_buffer_count
        } else {
            count
        };
        count.max(MIN_BUFFER_COUNT)
    }

    /// Present interval for a requested `interval`.
    pub fn present_interval(&self, interval: u32) -> u32 {
        match interval {
            0 => self.default_present_interval.max(1),
            interval => interval,
        }
    }

    /// Position of `backend` in the enumeration order.
    pub(crate) fn backend_rank(&self, backend: BackendKind) -> usize {
        self.preferred_backends
            .iter()
            .position(|preferred| *preferred == backend)
            .unwrap_or(self.preferred_backends.len())
    }
}
