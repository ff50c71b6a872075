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

//! The runtime: registered native APIs, the adapter cache and device creation.

use crate::config::RuntimeConfig;
use crate::context::Context;
use crate::device::Device;
use crate::discovery::{AdapterCache, CachedAdapter};
use crate::handle::Handle;
use crate::surface::Surface;
use std::sync::Arc;
use strata_core::renderer::api::{
    AdapterInfo, BackendKind, DeviceDescriptor, DeviceFlags, FrameOptions, SurfaceDescriptor,
    VulkanImport,
};
use strata_core::renderer::traits::{NativeApi, RenderEngine};
use strata_core::{GpuError, GpuResult};

/// Size of the context used by [`Runtime::run_self_test`].
const SELF_TEST_SIZE: u32 = 128;

/// Builder for [`Runtime`].
#[derive(Debug)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    apis: Vec<Arc<dyn NativeApi>>,
    engine: Arc<dyn RenderEngine>,
}

impl RuntimeBuilder {
    /// Replaces the default configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a native API.
    pub fn native_api(mut self, api: Arc<dyn NativeApi>) -> Self {
        self.apis.push(api);
        self
    }

    /// Registers several native APIs.
    pub fn native_apis(mut self, apis: impl IntoIterator<Item = Arc<dyn NativeApi>>) -> Self {
        self.apis.extend(apis);
        self
    }

    /// Finishes the runtime. No adapter is enumerated yet.
    pub fn build(self) -> Runtime {
        log::info!(
            "Strata runtime using the '{}' engine with {} native API(s)",
            self.engine.name(),
            self.apis.len()
        );
        Runtime {
            config: self.config,
            apis: self.apis,
            engine: self.engine,
            adapters: AdapterCache::new(),
        }
    }
}

/// Entry point for device creation.
///
/// Owns the registered native APIs, the render engine given to every
/// hardware device and the cache of discovered adapters.
#[derive(Debug)]
pub struct Runtime {
    config: RuntimeConfig,
    apis: Vec<Arc<dyn NativeApi>>,
    engine: Arc<dyn RenderEngine>,
    adapters: AdapterCache,
}

impl Runtime {
    /// Starts a runtime rendering with `engine`.
    pub fn builder(engine: Arc<dyn RenderEngine>) -> RuntimeBuilder {
        RuntimeBuilder {
            config: RuntimeConfig::default(),
            apis: Vec::new(),
            engine,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The adapter cache.
    pub fn adapter_cache(&self) -> &AdapterCache {
        &self.adapters
    }

    fn api_for(&self, backend: BackendKind) -> Option<&Arc<dyn NativeApi>> {
        self.apis.iter().find(|api| api.backend() == backend)
    }

    /// Hardware adapters in preference order, then the null adapter.
    pub fn enumerate_adapters(&self) -> Vec<AdapterInfo> {
        self.adapters
            .adapters(&self.apis, &self.config)
            .iter()
            .map(|entry| entry.info().clone())
            .chain(std::iter::once(AdapterInfo::null()))
            .collect()
    }

    /// Creates a device.
    ///
    /// `adapter_index` counts the discovered adapters of the requested
    /// backend. The null backend ignores it.
    pub fn create_device(&self, descriptor: &DeviceDescriptor) -> GpuResult<Handle<Device>> {
        let backend = descriptor.backend;
        match backend {
            BackendKind::Unknown => Err(GpuError::invalid("unknown backend")),
            BackendKind::Null => {
                log::info!("Created null device");
                Ok(Handle::new(Device::null()))
            }
            backend => {
                if self.api_for(backend).is_none() {
                    return Err(GpuError::unsupported(format!(
                        "the {backend} backend is not available in this build"
                    )));
                }
                let index = usize::from(descriptor.adapter_index);
                let entry = self
                    .adapters
                    .find(&self.apis, &self.config, backend, index)
                    .ok_or_else(|| {
                        GpuError::invalid(format!("no {backend} adapter at index {index}"))
                    })?;
                self.open(&entry, descriptor.flags)
            }
        }
    }

    fn open(&self, entry: &CachedAdapter, flags: DeviceFlags) -> GpuResult<Handle<Device>> {
        let native = entry.api.open_device(&entry.adapter, flags)?;
        log::info!(
            "Opened {} device on '{}'",
            entry.info().backend,
            entry.info().name
        );
        Ok(Handle::new(Device::hardware(
            native,
            entry.info().clone(),
            Arc::clone(&self.engine),
        )))
    }

    /// Wraps a Vulkan device created by the host.
    ///
    /// The native objects stay owned by the caller.
    pub fn import_vulkan_device(&self, import: &VulkanImport) -> GpuResult<Handle<Device>> {
        let api = self
            .api_for(BackendKind::Vulkan)
            .ok_or_else(|| GpuError::unsupported("the vulkan backend is not available in this build"))?;
        let native = api.import_vulkan(import)?;
        log::info!(
            "Imported Vulkan device {:?} (API version {:#x})",
            import.device,
            import.features.api_version
        );
        Ok(Handle::new(Device::imported_vulkan(
            native,
            *import,
            Arc::clone(&self.engine),
        )))
    }

    /// Creates a surface with this runtime's swapchain defaults.
    pub fn create_surface(
        &self,
        device: &Handle<Device>,
        context: &Handle<Context>,
        descriptor: &SurfaceDescriptor,
    ) -> GpuResult<Handle<Surface>> {
        Surface::create(device, context, descriptor, &self.config)
    }

    /// Renders one frame on every cached hardware adapter, then on the null
    /// device.
    ///
    /// Succeeds if any of them completes the frame.
    pub fn run_self_test(&self) -> GpuResult<()> {
        let mut passed = false;
        let mut last_error = None;

        let candidates = self.adapters.adapters(&self.apis, &self.config);
        let attempts = candidates
            .iter()
            .map(|entry| {
                let name = entry.info().name.clone();
                (name, self.open(entry, DeviceFlags::NONE))
            })
            .chain(std::iter::once((
                "null".to_owned(),
                Ok(Handle::new(Device::null())),
            )));

        for (name, device) in attempts {
            match device.and_then(render_one_frame) {
                Ok(()) => {
                    log::info!("Self test passed on '{name}'");
                    passed = true;
                }
                Err(err) => {
                    log::warn!("Self test failed on '{name}': {err}");
                    last_error = Some(err);
                }
            }
        }

        match (passed, last_error) {
            (true, _) => Ok(()),
            (false, Some(err)) => Err(err),
            (false, None) => Err(GpuError::internal("self test had nothing to run")),
        }
    }
}

fn render_one_frame(device: Handle<Device>) -> GpuResult<()> {
    let result = Context::create(&device, SELF_TEST_SIZE, SELF_TEST_SIZE).and_then(|context| {
        let frame = context
            .begin_frame(&FrameOptions::default())
            .and_then(|()| context.end_frame())
            .and_then(|()| context.submit());
        context.release()?;
        frame
    });
    device.release()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_infra::{JournalEntry, RecordingEngine, SoftAdapter, SoftApi};

    fn runtime(apis: Vec<SoftApi>) -> Runtime {
        Runtime::builder(Arc::new(RecordingEngine))
            .native_apis(
                apis.into_iter()
                    .map(|api| Arc::new(api) as Arc<dyn NativeApi>),
            )
            .build()
    }

    fn descriptor(backend: BackendKind, adapter_index: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            backend,
            adapter_index,
            flags: DeviceFlags::NONE,
        }
    }

    #[test]
    fn null_adapter_is_always_last() {
        let runtime = runtime(vec![SoftApi::new(BackendKind::Vulkan)
            .with_adapters(vec![SoftAdapter::hardware("gpu")])]);
        let adapters = runtime.enumerate_adapters();
        assert_eq!(adapters.len(), 2);
        assert_eq!(adapters[0].backend, BackendKind::Vulkan);
        assert_eq!(adapters[1], AdapterInfo::null());
    }

    #[test]
    fn device_creation_dispatches_on_backend() {
        let runtime = runtime(vec![SoftApi::new(BackendKind::Vulkan)
            .with_adapters(vec![SoftAdapter::hardware("gpu")])]);

        let null = runtime.create_device(&descriptor(BackendKind::Null, 7)).unwrap();
        assert_eq!(null.backend().unwrap(), BackendKind::Null);

        let vulkan = runtime.create_device(&descriptor(BackendKind::Vulkan, 0)).unwrap();
        assert_eq!(vulkan.backend().unwrap(), BackendKind::Vulkan);

        assert!(matches!(
            runtime.create_device(&descriptor(BackendKind::Vulkan, 1)),
            Err(GpuError::InvalidParameter(_))
        ));
        assert!(matches!(
            runtime.create_device(&descriptor(BackendKind::Metal, 0)),
            Err(GpuError::Unsupported(_))
        ));
        assert!(matches!(
            runtime.create_device(&descriptor(BackendKind::Unknown, 0)),
            Err(GpuError::InvalidParameter(_))
        ));
    }

    #[test]
    fn self_test_falls_back_to_the_null_device() {
        let api = SoftApi::new(BackendKind::D3d12).with_adapters(vec![SoftAdapter::hardware("gpu")]);
        api.faults().fail_device_creation(true);
        let runtime = runtime(vec![api]);
        runtime.run_self_test().unwrap();
    }

    #[test]
    fn self_test_runs_a_frame_on_hardware() {
        let api = SoftApi::new(BackendKind::D3d12).with_adapters(vec![SoftAdapter::hardware("gpu")]);
        let journal = api.journal();
        let runtime = runtime(vec![api]);
        runtime.run_self_test().unwrap();
        assert!(journal.count(|entry| matches!(entry, JournalEntry::Execute(_))) >= 2);
    }
}
