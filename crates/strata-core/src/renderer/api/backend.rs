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

//! Backend tags, adapter descriptions and device capability records.

use super::util::{DeviceFlags, FeatureFlags};
use serde::Deserialize;
use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;

/// Maximum adapter name length in bytes, including the NUL terminator.
pub const MAX_ADAPTER_NAME: usize = 256;

/// Name reported by the synthetic headless adapter.
pub const NULL_ADAPTER_NAME: &str = "Null Renderer";

/// A native graphics API family, or the headless fallback.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Not a valid backend.
    Unknown = 0,
    /// Headless backend with a CPU framebuffer and no GPU work.
    Null = 1,
    /// Metal.
    Metal = 2,
    /// Vulkan.
    Vulkan = 3,
    /// Direct3D 12.
    D3d12 = 4,
    /// Direct3D 11.
    D3d11 = 5,
    /// OpenGL.
    OpenGl = 6,
    /// WebGPU.
    WebGpu = 7,
}

impl BackendKind {
    /// Converts a raw tag into a backend kind.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(BackendKind::Unknown),
            1 => Some(BackendKind::Null),
            2 => Some(BackendKind::Metal),
            3 => Some(BackendKind::Vulkan),
            4 => Some(BackendKind::D3d12),
            5 => Some(BackendKind::D3d11),
            6 => Some(BackendKind::OpenGl),
            7 => Some(BackendKind::WebGpu),
            _ => None,
        }
    }

    /// Returns the raw tag.
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            BackendKind::Unknown => "Unknown",
            BackendKind::Null => "Null",
            BackendKind::Metal => "Metal",
            BackendKind::Vulkan => "Vulkan",
            BackendKind::D3d12 => "Direct3D 12",
            BackendKind::D3d11 => "Direct3D 11",
            BackendKind::OpenGl => "OpenGL",
            BackendKind::WebGpu => "WebGPU",
        }
    }

    /// Returns `true` for backends that drive a physical GPU.
    pub const fn is_hardware(self) -> bool {
        !matches!(self, BackendKind::Unknown | BackendKind::Null)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Description of one usable adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterInfo {
    /// Backend the adapter was discovered through.
    pub backend: BackendKind,
    /// PCI vendor identifier.
    pub vendor_id: u16,
    /// PCI device identifier.
    pub device_id: u16,
    /// PCI subsystem identifier.
    pub subsys_id: u16,
    /// Hardware revision.
    pub revision: u16,
    /// Dedicated video memory in bytes, or 0 if unknown.
    pub dedicated_video_memory: u64,
    /// Shared system memory in bytes, or 0 if unknown.
    pub shared_system_memory: u64,
    /// Features the adapter advertises.
    pub features: FeatureFlags,
    /// Adapter name as reported by the driver.
    pub name: String,
}

impl AdapterInfo {
    /// The synthetic headless adapter appended to every enumeration.
    pub fn null() -> Self {
        Self {
            backend: BackendKind::Null,
            vendor_id: 0xffff,
            device_id: 0xffff,
            subsys_id: 0,
            revision: 1,
            dedicated_video_memory: 0,
            shared_system_memory: 0,
            features: FeatureFlags::HEADLESS_SUPPORTED,
            name: NULL_ADAPTER_NAME.to_string(),
        }
    }
}

/// What a created device can do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capabilities {
    /// Backend of the device.
    pub backend: BackendKind,
    /// Supported rendering features.
    pub features: FeatureFlags,
    /// Largest buffer in bytes.
    pub max_buffer_size: u64,
    /// Largest 2D texture edge in texels.
    pub max_texture_dimension: u32,
    /// Largest texture array layer count.
    pub max_texture_array_layers: u32,
    /// Largest sampler anisotropy.
    pub max_sampler_anisotropy: f32,
    /// Whether HDR output formats are available.
    pub supports_hdr: bool,
    /// Whether surfaces can be created on the device.
    pub supports_presentation: bool,
}

impl Capabilities {
    /// Capabilities of the headless backend: no GPU features, no presentation.
    pub fn headless() -> Self {
        Self {
            backend: BackendKind::Null,
            features: FeatureFlags::HEADLESS_SUPPORTED,
            max_buffer_size: 256 * 1024 * 1024,
            max_texture_dimension: 4096,
            max_texture_array_layers: 1,
            max_sampler_anisotropy: 1.0,
            supports_hdr: false,
            supports_presentation: false,
        }
    }
}

/// Parameters for creating a device through discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Requested backend.
    pub backend: BackendKind,
    /// Index into the adapters discovered for `backend`.
    pub adapter_index: u16,
    /// Creation options.
    pub flags: DeviceFlags,
}

/// An opaque, non-null native object handle owned by the embedding host.
///
/// Strata never dereferences these values; it only forwards them to the
/// native collaborator.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle(NonZeroUsize);

impl RawHandle {
    /// Wraps a pointer, returning `None` for null.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(RawHandle)
    }

    /// Wraps an integer handle value, returning `None` for zero.
    pub fn from_raw(value: usize) -> Option<Self> {
        NonZeroUsize::new(value).map(RawHandle)
    }

    /// Returns the handle as a pointer.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    /// Returns the handle value.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawHandle({:#x})", self.0)
    }
}

/// Vulkan features enabled by the host on an imported device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VulkanFeatures {
    /// `VkApplicationInfo::apiVersion` the device was created with.
    pub api_version: u32,
    /// `independentBlend`.
    pub independent_blend: bool,
    /// `fillModeNonSolid`.
    pub fill_mode_non_solid: bool,
    /// `fragmentStoresAndAtomics`.
    pub fragment_stores_and_atomics: bool,
    /// `shaderClipDistance`.
    pub shader_clip_distance: bool,
    /// `rasterizationOrderColorAttachmentAccess`.
    pub rasterization_order_color_attachment_access: bool,
    /// `fragmentShaderPixelInterlock`.
    pub fragment_shader_pixel_interlock: bool,
    /// `VK_KHR_portability_subset` is enabled.
    pub portability_subset: bool,
}

impl VulkanFeatures {
    /// Derives the feature set from the enabled Vulkan features.
    pub fn feature_flags(&self) -> FeatureFlags {
        let mut flags = FeatureFlags::HEADLESS_SUPPORTED;
        flags.set(
            FeatureFlags::ATOMIC_PATH_RENDERING,
            self.fragment_stores_and_atomics,
        );
        flags.set(
            FeatureFlags::RASTER_ORDERING,
            self.rasterization_order_color_attachment_access
                || self.fragment_shader_pixel_interlock,
        );
        flags.set(FeatureFlags::CLIP_PLANES, self.shader_clip_distance);
        flags
    }
}

/// Native Vulkan objects owned by the host that a device wraps without owning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VulkanImport {
    /// `VkInstance`.
    pub instance: RawHandle,
    /// `VkPhysicalDevice`.
    pub physical_device: RawHandle,
    /// `VkDevice`.
    pub device: RawHandle,
    /// Features the host enabled on `device`.
    pub features: VulkanFeatures,
    /// `vkGetInstanceProcAddr`, if the host supplies its own loader.
    pub get_instance_proc_addr: Option<RawHandle>,
    /// Queue used for graphics and transfer work.
    pub graphics_queue: RawHandle,
    /// Family index of `graphics_queue`.
    pub graphics_queue_family_index: u32,
    /// Queue used for presentation, if the host has one.
    pub present_queue: Option<RawHandle>,
    /// Family index of the present queue.
    pub present_queue_family_index: u32,
    /// `VkAllocationCallbacks`, if any.
    pub allocator_callbacks: Option<RawHandle>,
}

impl VulkanImport {
    /// Returns the presentation queue, defaulting to the graphics queue.
    pub fn effective_present_queue(&self) -> RawHandle {
        self.present_queue.unwrap_or(self.graphics_queue)
    }
}
