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

//! Adapter discovery and device creation through `wgpu`.

use super::device::WgpuDevice;
use crate::sync::lock;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use strata_core::renderer::api::{
    AdapterInfo, BackendKind, Capabilities, DeviceFlags, FeatureFlags, VulkanImport,
};
use strata_core::renderer::traits::{NativeAdapter, NativeApi, NativeDevice};
use strata_core::{NativeError, NativeResult};
use wgpu::{Adapter, Backend, Backends, DeviceType, Instance, PowerPreference, RequestAdapterOptions};

/// Optional wgpu features enabled on a device when the adapter has them.
const OPTIONAL_FEATURES: wgpu::Features = wgpu::Features::CLIP_DISTANCES
    .union(wgpu::Features::DUAL_SOURCE_BLENDING)
    .union(wgpu::Features::SHADER_F16);

/// Converts a Strata backend tag to the matching wgpu backend.
pub(crate) fn kind_to_backend(kind: BackendKind) -> Option<Backend> {
    match kind {
        BackendKind::Vulkan => Some(Backend::Vulkan),
        BackendKind::D3d12 => Some(Backend::Dx12),
        BackendKind::Metal => Some(Backend::Metal),
        BackendKind::OpenGl => Some(Backend::Gl),
        BackendKind::WebGpu => Some(Backend::BrowserWebGpu),
        BackendKind::Unknown | BackendKind::Null | BackendKind::D3d11 => None,
    }
}

/// Derives Strata feature flags from what a wgpu adapter supports.
fn feature_flags(adapter: &Adapter) -> FeatureFlags {
    let features = adapter.features();
    let storage = adapter
        .get_texture_format_features(wgpu::TextureFormat::Rgba8Unorm)
        .flags
        .contains(wgpu::TextureFormatFeatureFlags::STORAGE_READ_WRITE);

    let mut flags = FeatureFlags::HEADLESS_SUPPORTED;
    flags.set(FeatureFlags::ATOMIC_PATH_RENDERING, storage);
    flags.set(
        FeatureFlags::CLIP_PLANES,
        features.contains(wgpu::Features::CLIP_DISTANCES),
    );
    flags.set(
        FeatureFlags::ADVANCED_BLEND,
        features.contains(wgpu::Features::DUAL_SOURCE_BLENDING),
    );
    flags.set(
        FeatureFlags::CLOCKWISE_FILL,
        features.contains(wgpu::Features::SHADER_F16),
    );
    flags.set(
        FeatureFlags::BOTTOM_UP_FRAMEBUFFER,
        adapter.get_info().backend == Backend::Gl,
    );
    flags
}

fn adapter_info(kind: BackendKind, adapter: &Adapter) -> AdapterInfo {
    let info = adapter.get_info();
    AdapterInfo {
        backend: kind,
        vendor_id: info.vendor as u16,
        device_id: info.device as u16,
        subsys_id: 0,
        revision: 0,
        dedicated_video_memory: 0,
        shared_system_memory: 0,
        features: feature_flags(adapter),
        name: info.name,
    }
}

pub(crate) fn capabilities(
    kind: BackendKind,
    adapter: &Adapter,
    flags: DeviceFlags,
) -> Capabilities {
    let limits = adapter.limits();
    let hdr = adapter
        .get_texture_format_features(wgpu::TextureFormat::Rgba16Float)
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT);
    Capabilities {
        backend: kind,
        features: feature_flags(adapter),
        max_buffer_size: limits.max_buffer_size,
        max_texture_dimension: limits.max_texture_dimension_2d,
        max_texture_array_layers: limits.max_texture_array_layers,
        max_sampler_anisotropy: 16.0,
        supports_hdr: hdr,
        supports_presentation: !flags.contains(DeviceFlags::HEADLESS),
    }
}

/// Requests a logical device, enabling the optional features the adapter has.
async fn request_device(
    adapter: &Adapter,
    label: &str,
    features: wgpu::Features,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: adapter.features() & features,
            required_limits: adapter.limits(),
            ..Default::default()
        })
        .await
        .with_context(|| format!("failed to create logical device \"{label}\""))
}

fn bootstrap_error(err: anyhow::Error) -> NativeError {
    NativeError::Failed(format!("{err:#}"))
}

/// A native API family reached through wgpu.
#[derive(Debug)]
pub struct WgpuApi {
    kind: BackendKind,
    backend: Backend,
    instance: Instance,
    adapters: Mutex<Vec<Adapter>>,
}

impl WgpuApi {
    /// Creates an API restricted to `kind`. Returns `None` if wgpu has no such backend.
    pub fn new(kind: BackendKind) -> Option<Self> {
        let backend = kind_to_backend(kind)?;
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: Backends::from(backend),
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        Some(Self {
            kind,
            backend,
            instance,
            adapters: Mutex::new(Vec::new()),
        })
    }

    /// APIs available on the current platform, in preference order.
    pub fn platform_apis() -> Vec<Self> {
        let mut kinds = Vec::new();
        #[cfg(target_os = "windows")]
        kinds.push(BackendKind::D3d12);
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        kinds.push(BackendKind::Metal);
        #[cfg(any(target_os = "windows", target_os = "linux", target_os = "android"))]
        kinds.push(BackendKind::Vulkan);
        kinds.into_iter().filter_map(Self::new).collect()
    }

    fn adapter(&self, adapter: &NativeAdapter) -> NativeResult<Adapter> {
        lock(&self.adapters)
            .get(adapter.ordinal)
            .cloned()
            .ok_or_else(|| {
                NativeError::Failed(format!(
                    "adapter \"{}\" was not discovered by this API",
                    adapter.info.name
                ))
            })
    }

    /// Asks wgpu for the high-performance, low-power and fallback adapters of
    /// this backend and keeps the distinct ones.
    async fn discover(&self) -> Vec<Adapter> {
        let requests = [
            (PowerPreference::HighPerformance, false),
            (PowerPreference::LowPower, false),
            (PowerPreference::None, true),
        ];
        let mut found: Vec<Adapter> = Vec::new();
        for (power_preference, force_fallback_adapter) in requests {
            let adapter = match self
                .instance
                .request_adapter(&RequestAdapterOptions {
                    power_preference,
                    compatible_surface: None,
                    force_fallback_adapter,
                })
                .await
            {
                Ok(adapter) => adapter,
                Err(e) => {
                    log::debug!("No {power_preference:?} adapter for {}: {e}", self.kind);
                    continue;
                }
            };
            let info = adapter.get_info();
            if info.backend != self.backend {
                continue;
            }
            let duplicate = found.iter().any(|known| {
                let known = known.get_info();
                known.name == info.name && known.vendor == info.vendor && known.device == info.device
            });
            if !duplicate {
                found.push(adapter);
            }
        }
        found
    }
}

impl NativeApi for WgpuApi {
    fn backend(&self) -> BackendKind {
        self.kind
    }

    fn enumerate_adapters(&self) -> NativeResult<Vec<NativeAdapter>> {
        let adapters = pollster::block_on(self.discover());
        let described = adapters
            .iter()
            .enumerate()
            .map(|(ordinal, adapter)| NativeAdapter {
                info: adapter_info(self.kind, adapter),
                software: adapter.get_info().device_type == DeviceType::Cpu,
                ordinal,
            })
            .collect();
        *lock(&self.adapters) = adapters;
        Ok(described)
    }

    fn probe(&self, adapter: &NativeAdapter) -> NativeResult<()> {
        let wgpu_adapter = self.adapter(adapter)?;
        let probe = async {
            let (device, _queue) =
                request_device(&wgpu_adapter, "Strata capability probe", wgpu::Features::empty())
                    .await?;
            device.destroy();
            Ok::<_, anyhow::Error>(())
        };
        pollster::block_on(probe).map_err(|e| NativeError::Unsupported(format!("{e:#}")))
    }

    fn open_device(
        &self,
        adapter: &NativeAdapter,
        flags: DeviceFlags,
    ) -> NativeResult<Arc<dyn NativeDevice>> {
        let wgpu_adapter = self.adapter(adapter)?;
        let (device, queue) = pollster::block_on(request_device(
            &wgpu_adapter,
            "Strata Logical Device",
            OPTIONAL_FEATURES,
        ))
        .map_err(bootstrap_error)?;
        log::info!(
            "Opened {} device on \"{}\" with features {:?}",
            self.kind,
            adapter.info.name,
            device.features()
        );
        let caps = capabilities(self.kind, &wgpu_adapter, flags);
        let device = WgpuDevice::new(
            self.instance.clone(),
            wgpu_adapter,
            device,
            queue,
            caps,
            flags,
        );
        Ok(Arc::new(device))
    }

    #[cfg(any(windows, target_os = "linux", target_os = "android"))]
    fn import_vulkan(&self, import: &VulkanImport) -> NativeResult<Arc<dyn NativeDevice>> {
        if self.backend != Backend::Vulkan {
            return Err(NativeError::Unsupported(format!(
                "{} cannot import Vulkan handles",
                self.kind
            )));
        }
        // SAFETY: the caller of the import guarantees the handles are live
        // Vulkan objects for as long as the device exists.
        let imported = unsafe { super::interop::import(import, "Strata Imported Device") }
            .map_err(bootstrap_error)?;
        log::info!(
            "Imported host Vulkan device on \"{}\"",
            imported.adapter.get_info().name
        );
        let caps = Capabilities {
            features: import.features.feature_flags(),
            ..capabilities(self.kind, &imported.adapter, DeviceFlags::NONE)
        };
        Ok(Arc::new(WgpuDevice::new(
            imported.instance,
            imported.adapter,
            imported.device,
            imported.queue,
            caps,
            DeviceFlags::NONE,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_tags_map_to_wgpu_backends() {
        assert_eq!(kind_to_backend(BackendKind::Vulkan), Some(Backend::Vulkan));
        assert_eq!(kind_to_backend(BackendKind::D3d12), Some(Backend::Dx12));
        assert_eq!(kind_to_backend(BackendKind::Metal), Some(Backend::Metal));
        assert_eq!(kind_to_backend(BackendKind::D3d11), None);
        assert_eq!(kind_to_backend(BackendKind::Null), None);
    }

    #[cfg(any(windows, target_os = "linux", target_os = "android"))]
    #[test]
    fn only_the_vulkan_api_imports_vulkan_handles() {
        use strata_core::renderer::api::{RawHandle, VulkanFeatures};

        let handle = |raw: usize| RawHandle::from_raw(raw).unwrap();
        // Never dereferenced: the API rejects the import before touching them.
        let import = VulkanImport {
            instance: handle(1),
            physical_device: handle(2),
            device: handle(3),
            features: VulkanFeatures::default(),
            get_instance_proc_addr: None,
            graphics_queue: handle(4),
            graphics_queue_family_index: 0,
            present_queue: None,
            present_queue_family_index: 0,
            allocator_callbacks: None,
        };
        for kind in [BackendKind::D3d12, BackendKind::Metal, BackendKind::OpenGl] {
            let api = WgpuApi::new(kind).unwrap();
            let err = api.import_vulkan(&import).err().unwrap();
            assert!(matches!(err, NativeError::Unsupported(_)), "{kind}: {err:?}");
        }
    }

    #[test]
    fn enumeration_only_reports_the_requested_backend() {
        let _ = env_logger::builder().is_test(true).try_init();
        let Some(api) = WgpuApi::platform_apis().into_iter().next() else {
            return;
        };
        let adapters = api.enumerate_adapters().unwrap();
        if adapters.is_empty() {
            log::warn!("No {} adapter available, skipping.", api.backend());
            return;
        }
        for (ordinal, adapter) in adapters.iter().enumerate() {
            assert_eq!(adapter.info.backend, api.backend());
            assert_eq!(adapter.ordinal, ordinal);
            assert!(adapter.info.features.contains(FeatureFlags::HEADLESS_SUPPORTED));
        }
    }
}
