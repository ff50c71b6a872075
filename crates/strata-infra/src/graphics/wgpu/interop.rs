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

//! Wrapping host-created Vulkan objects in wgpu.
//!
//! The host keeps ownership of its `VkInstance` and `VkDevice`: both are
//! handed to wgpu-hal with a drop callback, so wgpu never destroys them.

use anyhow::{anyhow, Context, Result};
use ash::vk::{self, Handle as _};
use std::ffi::c_void;
use strata_core::renderer::api::{RawHandle, VulkanImport};
use wgpu::hal;
use wgpu::hal::api::Vulkan;

/// wgpu objects built around imported Vulkan handles.
pub(crate) struct ImportedDevice {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// A drop callback that leaves the native object alive.
fn host_owned() -> Option<hal::DropCallback> {
    Some(Box::new(|| {}))
}

fn raw(handle: RawHandle) -> u64 {
    handle.get() as u64
}

/// Loads the Vulkan entry points, through the host's loader when it supplies one.
///
/// # Safety
/// `get_instance_proc_addr`, when present, must point to `vkGetInstanceProcAddr`.
unsafe fn entry(get_instance_proc_addr: Option<RawHandle>) -> Result<ash::Entry> {
    match get_instance_proc_addr {
        Some(addr) => {
            let get_instance_proc_addr = unsafe {
                std::mem::transmute::<*mut c_void, vk::PFN_vkGetInstanceProcAddr>(addr.as_ptr())
            };
            Ok(unsafe { ash::Entry::from_static_fn(ash::StaticFn { get_instance_proc_addr }) })
        }
        None => unsafe { ash::Entry::load() }.context("failed to load the system Vulkan loader"),
    }
}

/// Builds a wgpu device on top of the host's Vulkan objects.
///
/// Only core instance functionality is assumed of the host instance. The
/// host device must have the extensions wgpu requires for an empty feature set
/// enabled, and `graphics_queue` must be queue 0 of its family.
///
/// # Safety
/// Every handle in `import` must be valid and stay valid until the returned
/// objects are dropped.
pub(crate) unsafe fn import(import: &VulkanImport, label: &str) -> Result<ImportedDevice> {
    let entry = unsafe { entry(import.get_instance_proc_addr) }?;
    let api_version = match import.features.api_version {
        0 => vk::API_VERSION_1_0,
        version => version,
    };
    let raw_instance =
        unsafe { ash::Instance::load(entry.static_fn(), vk::Instance::from_raw(raw(import.instance))) };
    let raw_device = unsafe {
        ash::Device::load(raw_instance.fp_v1_0(), vk::Device::from_raw(raw(import.device)))
    };

    let hal_instance = unsafe {
        hal::vulkan::Instance::from_raw(
            entry,
            raw_instance,
            api_version,
            0,
            None,
            Vec::new(),
            wgpu::InstanceFlags::empty(),
            wgpu::MemoryBudgetThresholds::default(),
            false,
            host_owned(),
        )
    }
    .map_err(|e| anyhow!("failed to wrap the host VkInstance: {e}"))?;

    let physical_device = vk::PhysicalDevice::from_raw(raw(import.physical_device));
    let exposed = hal_instance
        .expose_adapter(physical_device)
        .context("the host VkPhysicalDevice does not meet wgpu's minimum requirements")?;
    let extensions = exposed
        .adapter
        .required_device_extensions(wgpu::Features::empty());
    let limits = exposed.capabilities.limits.clone();
    let open = unsafe {
        exposed.adapter.device_from_raw(
            raw_device,
            host_owned(),
            &extensions,
            wgpu::Features::empty(),
            &limits,
            &wgpu::MemoryHints::default(),
            import.graphics_queue_family_index,
            0,
        )
    }
    .map_err(|e| anyhow!("failed to wrap the host VkDevice: {e}"))?;

    let instance = unsafe { wgpu::Instance::from_hal::<Vulkan>(hal_instance) };
    let adapter = unsafe { instance.create_adapter_from_hal(exposed) };
    let (device, queue) = unsafe {
        adapter.create_device_from_hal(
            open,
            &wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                ..Default::default()
            },
        )
    }
    .with_context(|| format!("failed to create logical device \"{label}\""))?;

    Ok(ImportedDevice {
        instance,
        adapter,
        device,
        queue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::wgpu::WgpuApi;
    use ash::vk::Handle as _;
    use strata_core::renderer::api::{BackendKind, VulkanFeatures};
    use strata_core::renderer::traits::NativeApi;

    /// Vulkan objects created and destroyed by the test, standing in for a host application.
    struct HostVulkan {
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        api_version: u32,
    }

    impl HostVulkan {
        fn create() -> Option<Self> {
            let entry = unsafe { ash::Entry::load() }.ok()?;
            let api_version = unsafe { entry.try_enumerate_instance_version() }
                .ok()
                .flatten()
                .unwrap_or(vk::API_VERSION_1_0)
                .min(vk::API_VERSION_1_3);
            let app = vk::ApplicationInfo::default().api_version(api_version);
            let info = vk::InstanceCreateInfo::default().application_info(&app);
            let instance = unsafe { entry.create_instance(&info, None) }.ok()?;
            match unsafe { Self::open_device(&entry, &instance, api_version) } {
                Some((physical_device, device)) => Some(Self {
                    entry,
                    instance,
                    physical_device,
                    device,
                    api_version,
                }),
                None => {
                    unsafe { instance.destroy_instance(None) };
                    None
                }
            }
        }

        /// Opens a device with the extensions and features wgpu expects of it.
        unsafe fn open_device(
            entry: &ash::Entry,
            instance: &ash::Instance,
            api_version: u32,
        ) -> Option<(vk::PhysicalDevice, ash::Device)> {
            let hal_instance = unsafe {
                hal::vulkan::Instance::from_raw(
                    entry.clone(),
                    instance.clone(),
                    api_version,
                    0,
                    None,
                    Vec::new(),
                    wgpu::InstanceFlags::empty(),
                    wgpu::MemoryBudgetThresholds::default(),
                    false,
                    host_owned(),
                )
            }
            .ok()?;
            let exposed = unsafe { instance.enumerate_physical_devices() }
                .ok()?
                .into_iter()
                .find_map(|physical_device| hal_instance.expose_adapter(physical_device))?;
            let extensions = exposed
                .adapter
                .required_device_extensions(wgpu::Features::empty());
            let mut features = exposed
                .adapter
                .physical_device_features(&extensions, wgpu::Features::empty());
            let names: Vec<_> = extensions.iter().map(|name| name.as_ptr()).collect();
            let queues = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(0)
                .queue_priorities(&[1.0])];
            let info = features.add_to_device_create(
                vk::DeviceCreateInfo::default()
                    .queue_create_infos(&queues)
                    .enabled_extension_names(&names),
            );
            let physical_device = exposed.adapter.raw_physical_device();
            let device = unsafe { instance.create_device(physical_device, &info, None) }.ok()?;
            Some((physical_device, device))
        }

        fn import(&self) -> VulkanImport {
            let handle = |raw: u64| RawHandle::from_raw(raw as usize).unwrap();
            let queue = unsafe { self.device.get_device_queue(0, 0) };
            VulkanImport {
                instance: handle(self.instance.handle().as_raw()),
                physical_device: handle(self.physical_device.as_raw()),
                device: handle(self.device.handle().as_raw()),
                features: VulkanFeatures {
                    api_version: self.api_version,
                    ..Default::default()
                },
                get_instance_proc_addr: RawHandle::from_raw(
                    self.entry.static_fn().get_instance_proc_addr as usize,
                ),
                graphics_queue: handle(queue.as_raw()),
                graphics_queue_family_index: 0,
                present_queue: None,
                present_queue_family_index: 0,
                allocator_callbacks: None,
            }
        }
    }

    #[test]
    fn imported_devices_leave_host_objects_to_the_host() {
        let _ = env_logger::builder().is_test(true).try_init();
        let Some(api) = WgpuApi::new(BackendKind::Vulkan) else {
            return;
        };
        let Some(host) = HostVulkan::create() else {
            log::warn!("No Vulkan device available, skipping.");
            return;
        };

        let device = api.import_vulkan(&host.import()).unwrap();
        assert_eq!(device.backend(), BackendKind::Vulkan);
        assert_eq!(device.capabilities().backend, BackendKind::Vulkan);
        let fence = device.create_fence(3).unwrap();
        assert_eq!(fence.completed_value(), 3);
        let texture = device.create_texture(16, 16, "imported target").unwrap();
        assert_eq!(texture.size(), (16, 16));
        drop(texture);
        drop(fence);
        drop(device);

        // Still owned by the host after the wrapper is gone.
        unsafe {
            host.device.device_wait_idle().unwrap();
            host.device.destroy_device(None);
            host.instance.destroy_instance(None);
        }
    }

    #[test]
    fn loader_entry_uses_the_supplied_address_or_the_system_loader() {
        let Ok(system) = (unsafe { ash::Entry::load() }) else {
            return;
        };
        let address = RawHandle::from_raw(system.static_fn().get_instance_proc_addr as usize);
        let supplied = unsafe { entry(address) }.unwrap();
        assert_eq!(
            supplied.static_fn().get_instance_proc_addr as usize,
            system.static_fn().get_instance_proc_addr as usize
        );
        assert!(unsafe { entry(None) }.is_ok());
    }
}
