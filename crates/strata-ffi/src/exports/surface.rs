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

//! Presentation surfaces.

use crate::abi::{
    StrataContext, StrataDevice, StrataStatus, StrataSurface, StrataSurfaceInfoD3d12Hwnd,
    StrataSurfaceInfoMetalLayer, StrataSurfaceInfoVulkan,
};
use crate::call::{guard, out, read, write};
use crate::registry::{runtime, CONTEXTS, DEVICES, SURFACES};
use std::ffi::c_void;
use strata_core::renderer::api::{
    PresentFlags, RawHandle, SurfaceDescriptor, SurfaceFlags, SurfaceTarget,
};
use strata_core::{GpuError, GpuResult};

fn native_target(ptr: *mut c_void, name: &str) -> GpuResult<RawHandle> {
    RawHandle::from_ptr(ptr).ok_or_else(|| GpuError::invalid(format!("{name} must not be null")))
}

fn surface_flags(bits: u32) -> GpuResult<SurfaceFlags> {
    SurfaceFlags::from_bits(bits)
        .ok_or_else(|| GpuError::invalid(format!("unknown surface flags {bits:#x}")))
}

/// Resolves both handles, creates the surface and publishes it.
///
/// # Safety
/// `out_surface` must be null or valid for one write.
unsafe fn create(
    device: StrataDevice,
    context: StrataContext,
    descriptor: SurfaceDescriptor,
    out_surface: *mut StrataSurface,
) -> GpuResult<()> {
    let device = DEVICES.get(device.handle)?;
    let context = CONTEXTS.get(context.handle)?;
    let surface = runtime().create_surface(&device, &context, &descriptor)?;
    let handle = SURFACES.insert(surface);
    // SAFETY: checked by every caller.
    unsafe { write(out_surface, StrataSurface { handle }) };
    Ok(())
}

/// Creates a surface presenting to a Win32 window. Requires a D3D12 device.
///
/// # Safety
/// `info` and `out_surface` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn strata_surface_create_d3d12_hwnd(
    device: StrataDevice,
    context: StrataContext,
    info: *const StrataSurfaceInfoD3d12Hwnd,
    out_surface: *mut StrataSurface,
) -> StrataStatus {
    guard("strata_surface_create_d3d12_hwnd", || {
        out(out_surface, "out_surface")?;
        // SAFETY: upheld by the caller.
        let info = *unsafe { read(info, "info") }?;
        let descriptor = SurfaceDescriptor {
            target: SurfaceTarget::Win32Window {
                hwnd: native_target(info.hwnd, "hwnd")?,
            },
            width: info.width,
            height: info.height,
            buffer_count: info.buffer_count,
            present_interval: info.present_interval,
            sample_count: 1,
            flags: surface_flags(info.flags)?,
        };
        // SAFETY: checked non-null above.
        unsafe { create(device, context, descriptor, out_surface) }
    })
}

/// Creates a surface presenting to a `CAMetalLayer`. Requires a Metal device.
///
/// # Safety
/// `info` and `out_surface` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn strata_surface_create_metal_layer(
    device: StrataDevice,
    context: StrataContext,
    info: *const StrataSurfaceInfoMetalLayer,
    out_surface: *mut StrataSurface,
) -> StrataStatus {
    guard("strata_surface_create_metal_layer", || {
        out(out_surface, "out_surface")?;
        // SAFETY: upheld by the caller.
        let info = *unsafe { read(info, "info") }?;
        let descriptor = SurfaceDescriptor {
            target: SurfaceTarget::MetalLayer {
                layer: native_target(info.layer, "layer")?,
            },
            width: info.width,
            height: info.height,
            buffer_count: 0,
            present_interval: 0,
            sample_count: info.sample_count,
            flags: surface_flags(info.flags)?,
        };
        // SAFETY: checked non-null above.
        unsafe { create(device, context, descriptor, out_surface) }
    })
}

/// Creates a surface presenting to a `VkSurfaceKHR`.
///
/// # Safety
/// `info` and `out_surface` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn strata_surface_create_vulkan(
    device: StrataDevice,
    context: StrataContext,
    info: *const StrataSurfaceInfoVulkan,
    out_surface: *mut StrataSurface,
) -> StrataStatus {
    guard("strata_surface_create_vulkan", || {
        out(out_surface, "out_surface")?;
        // SAFETY: upheld by the caller.
        let info = *unsafe { read(info, "info") }?;
        let descriptor = SurfaceDescriptor {
            target: SurfaceTarget::Vulkan {
                surface: native_target(info.surface, "surface")?,
                present_mode: info.present_mode,
            },
            width: info.width,
            height: info.height,
            buffer_count: info.min_image_count,
            present_interval: 0,
            sample_count: 1,
            flags: surface_flags(info.flags)?,
        };
        // SAFETY: checked non-null above.
        unsafe { create(device, context, descriptor, out_surface) }
    })
}

refcount_exports!(StrataSurface, SURFACES, strata_surface_retain, strata_surface_release);

/// Reads the back buffer size.
///
/// # Safety
/// `out_width` and `out_height` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_surface_get_size(
    surface: StrataSurface,
    out_width: *mut u32,
    out_height: *mut u32,
) -> StrataStatus {
    guard("strata_surface_get_size", || {
        out(out_width, "out_width")?;
        out(out_height, "out_height")?;
        let (width, height) = SURFACES.get(surface.handle)?.size()?;
        // SAFETY: both checked non-null above.
        unsafe {
            write(out_width, width);
            write(out_height, height);
        }
        Ok(())
    })
}

/// Resizes the swapchain and its context.
#[no_mangle]
pub extern "C" fn strata_surface_resize(surface: StrataSurface, width: u32, height: u32) -> StrataStatus {
    guard("strata_surface_resize", || {
        SURFACES.get(surface.handle)?.resize(width, height)
    })
}

/// Presents the last submitted frame. Zero interval uses the surface default.
#[no_mangle]
pub extern "C" fn strata_surface_present(
    surface: StrataSurface,
    present_interval: u32,
    flags: u32,
) -> StrataStatus {
    guard("strata_surface_present", || {
        let flags = PresentFlags::from_bits(flags)
            .ok_or_else(|| GpuError::invalid(format!("unknown present flags {flags:#x}")))?;
        SURFACES.get(surface.handle)?.present(present_interval, flags)
    })
}
