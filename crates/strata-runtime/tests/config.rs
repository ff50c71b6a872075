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

use anyhow::Result;
use std::fs;
use strata_core::renderer::api::BackendKind;
use strata_runtime::RuntimeConfig;
use tempfile::tempdir;

#[test]
fn test_config_loads_from_file() -> Result<()> {
    // --- 1. Setup: a partial config on disk ---
    let dir = tempdir()?;
    let path = dir.path().join("strata.json");
    fs::write(
        &path,
        r#"{ "preferred_backends": ["metal", "vulkan"], "default_buffer_count": 3 }"#,
    )?;

    // --- 2. Load and check defaults fill the gaps ---
    let config = RuntimeConfig::from_file(&path)?;
    assert_eq!(
        config.preferred_backends,
        vec![BackendKind::Metal, BackendKind::Vulkan]
    );
    assert_eq!(config.buffer_count(0), 3);
    assert_eq!(config.present_interval(0), 1);
    assert!(config.probe_adapters);
    assert!(!config.allow_software_adapters);

    Ok(())
}

#[test]
fn test_config_errors_name_the_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json")?;

    let err = RuntimeConfig::from_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));

    let missing = RuntimeConfig::from_file(dir.path().join("missing.json")).unwrap_err();
    assert!(missing.to_string().contains("missing.json"));
    Ok(())
}
