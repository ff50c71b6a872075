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

//! Devices.

use crate::handle::{Handle, HandleKind};
use std::sync::Arc;
use strata_core::renderer::api::{AdapterInfo, BackendKind, Capabilities, VulkanImport};
use strata_core::renderer::traits::{NativeDevice, RenderEngine};
use strata_core::{GpuError, GpuResult};

/// Backend-specific state of a [`Device`].
#[derive(Debug)]
pub enum DeviceBinding {
    /// Headless device without GPU objects.
    Null,
    /// A device opened on a discovered adapter.
    Hardware {
        /// The native device.
        native: Arc<dyn NativeDevice>,
        /// Adapter the device was opened on.
        adapter: AdapterInfo,
    },
    /// A Vulkan device owned by the caller. Never created or destroyed here.
    ImportedVulkan {
        /// Wrapper around the caller's handles.
        native: Arc<dyn NativeDevice>,
        /// The imported handles.
        import: VulkanImport,
    },
}

/// A GPU device: backend tag, capability record and native state.
#[derive(Debug)]
pub struct Device {
    backend: BackendKind,
    capabilities: Capabilities,
    binding: DeviceBinding,
    engine: Option<Arc<dyn RenderEngine>>,
}

impl HandleKind for Device {
    const KIND: &'static str = "device";
}

impl Device {
    pub(crate) fn null() -> Self {
        Self {
            backend: BackendKind::Null,
            capabilities: Capabilities::headless(),
            binding: DeviceBinding::Null,
            engine: None,
        }
    }

    pub(crate) fn hardware(
        native: Arc<dyn NativeDevice>,
        adapter: AdapterInfo,
        engine: Arc<dyn RenderEngine>,
    ) -> Self {
        Self {
            backend: native.backend(),
            capabilities: native.capabilities(),
            binding: DeviceBinding::Hardware { native, adapter },
            engine: Some(engine),
        }
    }

    pub(crate) fn imported_vulkan(
        native: Arc<dyn NativeDevice>,
        import: VulkanImport,
        engine: Arc<dyn RenderEngine>,
    ) -> Self {
        let capabilities = Capabilities {
            backend: BackendKind::Vulkan,
            features: import.features.feature_flags(),
            supports_hdr: false,
            // The graphics queue presents when no present queue is given.
            supports_presentation: true,
            ..native.capabilities()
        };
        Self {
            backend: BackendKind::Vulkan,
            capabilities,
            binding: DeviceBinding::ImportedVulkan { native, import },
            engine: Some(engine),
        }
    }

    /// Backend tag.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Capability record.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Backend-specific state.
    pub fn binding(&self) -> &DeviceBinding {
        &self.binding
    }

    /// The native device. Fails on the null backend.
    pub fn native(&self) -> GpuResult<&Arc<dyn NativeDevice>> {
        match &self.binding {
            DeviceBinding::Hardware { native, .. } | DeviceBinding::ImportedVulkan { native, .. } => {
                Ok(native)
            }
            DeviceBinding::Null => Err(GpuError::unsupported(
                "the null device has no native GPU objects",
            )),
        }
    }

    /// The imported Vulkan handles. Fails unless the device was imported.
    pub fn vulkan_import(&self) -> GpuResult<&VulkanImport> {
        match &self.binding {
            DeviceBinding::ImportedVulkan { import, .. } => Ok(import),
            _ => Err(GpuError::invalid(format!(
                "{} device was not imported from Vulkan handles",
                self.backend
            ))),
        }
    }

    pub(crate) fn engine(&self) -> Option<Arc<dyn RenderEngine>> {
        self.engine.clone()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        log::info!("Destroying {} device", self.backend);
    }
}

impl Handle<Device> {
    /// Backend tag of the device.
    pub fn backend(&self) -> GpuResult<BackendKind> {
        self.with(|device| Ok(device.backend))
    }

    /// Capability record of the device.
    pub fn capabilities(&self) -> GpuResult<Capabilities> {
        self.with(|device| Ok(device.capabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::api::{DeviceFlags, FeatureFlags, RawHandle, VulkanFeatures};
    use strata_core::renderer::traits::NativeApi;
    use strata_infra::{RecordingEngine, SoftApi};

    fn import() -> VulkanImport {
        let raw = |value| RawHandle::from_raw(value).unwrap();
        VulkanImport {
            instance: raw(0x10),
            physical_device: raw(0x20),
            device: raw(0x30),
            features: VulkanFeatures {
                fragment_stores_and_atomics: true,
                ..Default::default()
            },
            get_instance_proc_addr: None,
            graphics_queue: raw(0x40),
            graphics_queue_family_index: 0,
            present_queue: None,
            present_queue_family_index: 0,
            allocator_callbacks: None,
        }
    }

    #[test]
    fn null_device_has_no_native_state() {
        let device = Device::null();
        assert_eq!(device.backend(), BackendKind::Null);
        assert!(!device.capabilities().supports_presentation);
        assert!(matches!(device.native(), Err(GpuError::Unsupported(_))));
        assert!(device.vulkan_import().is_err());
        assert!(device.engine().is_none());
    }

    #[test]
    fn imported_capabilities_follow_the_feature_record() {
        let api = SoftApi::new(BackendKind::Vulkan).with_vulkan_import();
        let import = import();
        let native = api.import_vulkan(&import).unwrap();
        let device = Device::imported_vulkan(native, import, Arc::new(RecordingEngine::new()));

        let caps = device.capabilities();
        assert_eq!(caps.backend, BackendKind::Vulkan);
        assert!(caps.features.contains(FeatureFlags::ATOMIC_PATH_RENDERING));
        assert!(!caps.features.contains(FeatureFlags::RASTER_ORDERING));
        assert!(caps.supports_presentation);
        assert_eq!(
            device.vulkan_import().unwrap().effective_present_queue(),
            import.graphics_queue
        );
    }

    #[test]
    fn hardware_devices_report_the_native_backend() {
        let api = SoftApi::new(BackendKind::D3d12);
        let adapter = api.enumerate_adapters().unwrap().remove(0);
        let native = api.open_device(&adapter, DeviceFlags::NONE).unwrap();
        let handle = Handle::new(Device::hardware(
            native,
            adapter.info,
            Arc::new(RecordingEngine::new()),
        ));
        assert_eq!(handle.backend().unwrap(), BackendKind::D3d12);
        assert_eq!(handle.capabilities().unwrap().max_texture_dimension, 16384);
    }
}
