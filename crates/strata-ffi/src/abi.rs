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

//! Fixed-layout types exchanged across the C boundary.
//!
//! Descriptor structs are byte-packed. Their sizes are checked at compile
//! time against the published header.

use std::ffi::{c_char, c_void};
use std::ptr;
use strata_core::renderer::api::{
    AdapterInfo, BackendKind, Capabilities, FrameOptions, ImageFilter, ImageSampler, ImageWrap,
    RawHandle, TextAlign, TextDirection, TextStyle, TextWrap, VulkanFeatures, VulkanImport,
    MAX_ADAPTER_NAME,
};
use strata_core::{GpuError, GpuResult};

/// Raw status code. See [`strata_core::Status`].
pub type StrataStatus = i32;

/// Packed ARGB color.
pub type StrataColor = u32;

macro_rules! opaque_handle {
    ($($(#[$meta:meta])* $name:ident;)*) => {
        $(
            $(#[$meta])*
            #[repr(C)]
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $name {
                /// Opaque value. Null is never a live handle.
                pub handle: *mut c_void,
            }

            impl $name {
                /// The null handle.
                pub const NULL: Self = Self { handle: ptr::null_mut() };

                /// Returns `true` for the null handle.
                pub fn is_null(self) -> bool {
                    self.handle.is_null()
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::NULL
                }
            }
        )*
    };
}

opaque_handle! {
    /// A device.
    StrataDevice;
    /// A context.
    StrataContext;
    /// A surface.
    StrataSurface;
    /// A fence.
    StrataFence;
    /// A path.
    StrataPath;
    /// A paint.
    StrataPaint;
    /// A renderer.
    StrataRenderer;
    /// A buffer.
    StrataBuffer;
    /// A decoded image.
    StrataImage;
    /// A decoded font.
    StrataFont;
    /// A gradient shader.
    StrataShader;
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct StrataAdapterDesc {
    pub backend: u8,
    pub backend_padding: u8,
    pub vendor_id: u16,
    pub device_id: u16,
    pub subsys_id: u16,
    pub revision: u16,
    pub dedicated_video_memory: u64,
    pub shared_system_memory: u64,
    pub flags: u32,
    pub reserved: u32,
    /// NUL-terminated UTF-8, truncated to fit.
    pub name: [c_char; MAX_ADAPTER_NAME],
    pub reserved_padding: [u8; 14],
}

impl From<&AdapterInfo> for StrataAdapterDesc {
    fn from(info: &AdapterInfo) -> Self {
        let mut name = [0 as c_char; MAX_ADAPTER_NAME];
        let bytes = info.name.as_bytes();
        let len = bytes.len().min(MAX_ADAPTER_NAME - 1);
        for (dst, src) in name.iter_mut().zip(&bytes[..len]) {
            *dst = *src as c_char;
        }
        Self {
            backend: info.backend.as_raw(),
            backend_padding: 0,
            vendor_id: info.vendor_id,
            device_id: info.device_id,
            subsys_id: info.subsys_id,
            revision: info.revision,
            dedicated_video_memory: info.dedicated_video_memory,
            shared_system_memory: info.shared_system_memory,
            flags: info.features.bits(),
            reserved: 0,
            name,
            reserved_padding: [0; 14],
        }
    }
}

impl StrataAdapterDesc {
    /// The adapter name up to its terminator.
    pub fn name(&self) -> String {
        let name = self.name;
        let bytes: Vec<u8> = name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StrataDeviceCreateInfo {
    pub backend: u8,
    pub backend_padding: u8,
    pub adapter_index: u16,
    pub flags: u32,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StrataCapabilities {
    pub backend: u8,
    pub backend_padding: u8,
    pub reserved: u16,
    pub feature_flags: u32,
    pub max_buffer_size: u64,
    pub max_texture_dimension: u32,
    pub max_texture_array_layers: u32,
    pub max_sampler_anisotropy: f32,
    pub supports_hdr: u8,
    pub supports_presentation: u8,
    pub reserved_padding: [u8; 6],
    pub reserved_tail: [u8; 4],
}

impl From<&Capabilities> for StrataCapabilities {
    fn from(caps: &Capabilities) -> Self {
        Self {
            backend: caps.backend.as_raw(),
            feature_flags: caps.features.bits(),
            max_buffer_size: caps.max_buffer_size,
            max_texture_dimension: caps.max_texture_dimension,
            max_texture_array_layers: caps.max_texture_array_layers,
            max_sampler_anisotropy: caps.max_sampler_anisotropy,
            supports_hdr: u8::from(caps.supports_hdr),
            supports_presentation: u8::from(caps.supports_presentation),
            ..Default::default()
        }
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StrataFrameOptions {
    pub width: u32,
    pub height: u32,
    pub delta_time_ms: f32,
    pub vsync: u8,
    pub reserved: [u8; 3],
}

impl From<StrataFrameOptions> for FrameOptions {
    fn from(options: StrataFrameOptions) -> Self {
        FrameOptions {
            width: options.width,
            height: options.height,
            delta_time_ms: options.delta_time_ms,
            vsync: options.vsync != 0,
        }
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct StrataSurfaceInfoD3d12Hwnd {
    pub hwnd: *mut c_void,
    pub width: u32,
    pub height: u32,
    pub buffer_count: u32,
    pub flags: u32,
    pub present_interval: u32,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct StrataSurfaceInfoMetalLayer {
    pub layer: *mut c_void,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub flags: u32,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct StrataSurfaceInfoVulkan {
    pub surface: *mut c_void,
    pub width: u32,
    pub height: u32,
    pub min_image_count: u32,
    pub present_mode: u32,
    pub flags: u32,
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StrataVulkanFeatures {
    pub api_version: u32,
    pub independent_blend: u8,
    pub fill_mode_non_solid: u8,
    pub fragment_stores_and_atomics: u8,
    pub shader_clip_distance: u8,
    pub rasterization_order_color_attachment_access: u8,
    pub fragment_shader_pixel_interlock: u8,
    pub portability_subset: u8,
    pub reserved: [u8; 1],
}

impl From<StrataVulkanFeatures> for VulkanFeatures {
    fn from(raw: StrataVulkanFeatures) -> Self {
        VulkanFeatures {
            api_version: raw.api_version,
            independent_blend: raw.independent_blend != 0,
            fill_mode_non_solid: raw.fill_mode_non_solid != 0,
            fragment_stores_and_atomics: raw.fragment_stores_and_atomics != 0,
            shader_clip_distance: raw.shader_clip_distance != 0,
            rasterization_order_color_attachment_access: raw
                .rasterization_order_color_attachment_access
                != 0,
            fragment_shader_pixel_interlock: raw.fragment_shader_pixel_interlock != 0,
            portability_subset: raw.portability_subset != 0,
        }
    }
}

/// `vkGetInstanceProcAddr`.
pub type StrataVkGetInstanceProcAddr =
    unsafe extern "C" fn(instance: *mut c_void, name: *const c_char) -> *mut c_void;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct StrataDeviceCreateInfoVulkan {
    pub instance: *mut c_void,
    pub physical_device: *mut c_void,
    pub device: *mut c_void,
    pub features: StrataVulkanFeatures,
    pub get_instance_proc_addr: Option<StrataVkGetInstanceProcAddr>,
    pub graphics_queue: *mut c_void,
    pub graphics_queue_family_index: u32,
    pub present_queue: *mut c_void,
    pub present_queue_family_index: u32,
    pub allocator_callbacks: *mut c_void,
}

fn required(ptr: *mut c_void, name: &str) -> GpuResult<RawHandle> {
    RawHandle::from_ptr(ptr).ok_or_else(|| GpuError::invalid(format!("{name} must not be null")))
}

impl TryFrom<StrataDeviceCreateInfoVulkan> for VulkanImport {
    type Error = GpuError;

    fn try_from(info: StrataDeviceCreateInfoVulkan) -> GpuResult<Self> {
        Ok(VulkanImport {
            instance: required(info.instance, "instance")?,
            physical_device: required(info.physical_device, "physical_device")?,
            device: required(info.device, "device")?,
            features: info.features.into(),
            get_instance_proc_addr: info
                .get_instance_proc_addr
                .and_then(|f| RawHandle::from_raw(f as usize)),
            graphics_queue: required(info.graphics_queue, "graphics_queue")?,
            graphics_queue_family_index: info.graphics_queue_family_index,
            present_queue: RawHandle::from_ptr(info.present_queue),
            present_queue_family_index: info.present_queue_family_index,
            allocator_callbacks: RawHandle::from_ptr(info.allocator_callbacks),
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StrataMappedMemory {
    pub data: *mut c_void,
    pub length: usize,
}

impl Default for StrataMappedMemory {
    fn default() -> Self {
        Self {
            data: ptr::null_mut(),
            length: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StrataImageSampler {
    pub wrap_x: u8,
    pub wrap_y: u8,
    pub filter: u8,
    pub reserved: u8,
}

impl TryFrom<StrataImageSampler> for ImageSampler {
    type Error = GpuError;

    fn try_from(raw: StrataImageSampler) -> GpuResult<Self> {
        let wrap = |value| {
            ImageWrap::from_raw(value)
                .ok_or_else(|| GpuError::invalid(format!("unknown image wrap {value}")))
        };
        Ok(ImageSampler {
            wrap_x: wrap(raw.wrap_x)?,
            wrap_y: wrap(raw.wrap_y)?,
            filter: ImageFilter::from_raw(raw.filter)
                .ok_or_else(|| GpuError::invalid(format!("unknown image filter {}", raw.filter)))?,
        })
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StrataTextStyle {
    pub size: f32,
    pub line_height: f32,
    pub letter_spacing: f32,
    pub width: f32,
    pub paragraph_spacing: f32,
    pub align: u8,
    pub wrap: u8,
    pub direction: u8,
    pub reserved: u8,
}

impl TryFrom<StrataTextStyle> for TextStyle {
    type Error = GpuError;

    fn try_from(raw: StrataTextStyle) -> GpuResult<Self> {
        let align = TextAlign::from_raw(raw.align)
            .ok_or_else(|| GpuError::invalid(format!("unknown text align {}", raw.align)))?;
        let wrap = TextWrap::from_raw(raw.wrap)
            .ok_or_else(|| GpuError::invalid(format!("unknown text wrap {}", raw.wrap)))?;
        let direction = TextDirection::from_raw(raw.direction)
            .ok_or_else(|| GpuError::invalid(format!("unknown text direction {}", raw.direction)))?;
        TextStyle::normalize(
            raw.size,
            raw.line_height,
            raw.letter_spacing,
            raw.width,
            raw.paragraph_spacing,
            align,
            wrap,
            direction,
        )
        .ok_or_else(|| GpuError::invalid("text size must be positive"))
    }
}

/// Decodes a backend tag.
pub fn backend_from_raw(raw: u8) -> GpuResult<BackendKind> {
    BackendKind::from_raw(raw).ok_or_else(|| GpuError::invalid(format!("unknown backend {raw}")))
}

const _: () = assert!(std::mem::size_of::<StrataAdapterDesc>() == 304);
const _: () = assert!(std::mem::size_of::<StrataCapabilities>() == 40);
const _: () = assert!(std::mem::size_of::<StrataDeviceCreateInfo>() == 8);
const _: () = assert!(std::mem::size_of::<StrataVulkanFeatures>() == 12);
const _: () = assert!(std::mem::size_of::<StrataFrameOptions>() == 16);
const _: () = assert!(std::mem::size_of::<StrataTextStyle>() == 24);
const _: () = assert!(std::mem::size_of::<StrataImageSampler>() == 4);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<StrataDeviceCreateInfoVulkan>() == 76);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<StrataSurfaceInfoVulkan>() == 28);

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::api::FeatureFlags;

    #[test]
    fn adapter_names_are_truncated_and_terminated() {
        let mut info = AdapterInfo::null();
        info.name = "x".repeat(400);
        let desc = StrataAdapterDesc::from(&info);
        assert_eq!(desc.name().len(), MAX_ADAPTER_NAME - 1);
        let name = desc.name;
        assert_eq!(name[MAX_ADAPTER_NAME - 1], 0);
        let vendor = desc.vendor_id;
        assert_eq!(vendor, 0xffff);
        let flags = desc.flags;
        assert_eq!(flags, FeatureFlags::HEADLESS_SUPPORTED.bits());
    }

    #[test]
    fn capabilities_copy_booleans_as_bytes() {
        let caps = StrataCapabilities::from(&Capabilities::headless());
        let (backend, presentation, hdr) =
            (caps.backend, caps.supports_presentation, caps.supports_hdr);
        assert_eq!(backend, BackendKind::Null.as_raw());
        assert_eq!(presentation, 0);
        assert_eq!(hdr, 0);
    }

    #[test]
    fn text_styles_reject_unknown_enums() {
        let style = StrataTextStyle {
            size: 12.0,
            align: 9,
            ..Default::default()
        };
        let err = TextStyle::try_from(style).unwrap_err();
        assert!(matches!(err, GpuError::InvalidParameter(_)));

        let style = StrataTextStyle {
            size: 12.0,
            ..Default::default()
        };
        let style = TextStyle::try_from(style).unwrap();
        assert_eq!(style.line_height, None);
        assert_eq!(style.width, None);
    }

    #[test]
    fn vulkan_import_requires_core_handles() {
        let info = StrataDeviceCreateInfoVulkan {
            instance: 0x10 as *mut c_void,
            physical_device: 0x20 as *mut c_void,
            device: ptr::null_mut(),
            features: StrataVulkanFeatures::default(),
            get_instance_proc_addr: None,
            graphics_queue: 0x40 as *mut c_void,
            graphics_queue_family_index: 0,
            present_queue: ptr::null_mut(),
            present_queue_family_index: 0,
            allocator_callbacks: ptr::null_mut(),
        };
        assert!(VulkanImport::try_from(info).is_err());

        let info = StrataDeviceCreateInfoVulkan {
            device: 0x30 as *mut c_void,
            ..info
        };
        let import = VulkanImport::try_from(info).unwrap();
        assert_eq!(import.effective_present_queue(), import.graphics_queue);
    }
}
