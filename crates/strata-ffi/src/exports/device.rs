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

//! Adapter enumeration and device creation.

use crate::abi::{
    backend_from_raw, StrataAdapterDesc, StrataCapabilities, StrataDevice, StrataDeviceCreateInfo,
    StrataDeviceCreateInfoVulkan, StrataStatus,
};
use crate::call::{guard, out, read, write};
use crate::registry::{runtime, DEVICES};
use strata_core::renderer::api::{DeviceDescriptor, DeviceFlags, VulkanImport};
use strata_core::GpuError;

/// Lists adapters: hardware adapters in preference order, then the null
/// adapter.
///
/// `count` always receives the total. When `adapters` is non-null, the first
/// `min(capacity, total)` entries are written.
///
/// # Safety
/// `adapters` must be null or valid for `capacity` writes. `count` must be
/// null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_enumerate_adapters(
    adapters: *mut StrataAdapterDesc,
    capacity: usize,
    count: *mut usize,
) -> StrataStatus {
    guard("strata_enumerate_adapters", || {
        out(count, "count")?;
        let list = runtime().enumerate_adapters();
        // SAFETY: checked non-null above.
        unsafe { write(count, list.len()) };
        if !adapters.is_null() {
            for (index, info) in list.iter().take(capacity).enumerate() {
                // SAFETY: `index < capacity` and the caller sized the array.
                unsafe { write(adapters.add(index), StrataAdapterDesc::from(info)) };
            }
        }
        Ok(())
    })
}

/// Creates a device on the requested backend and adapter.
///
/// # Safety
/// `info` and `out_device` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn strata_device_create(
    info: *const StrataDeviceCreateInfo,
    out_device: *mut StrataDevice,
) -> StrataStatus {
    guard("strata_device_create", || {
        out(out_device, "out_device")?;
        // SAFETY: upheld by the caller.
        let info = *unsafe { read(info, "info") }?;
        let raw_flags = info.flags;
        let descriptor = DeviceDescriptor {
            backend: backend_from_raw(info.backend)?,
            adapter_index: info.adapter_index,
            flags: DeviceFlags::from_bits(raw_flags)
                .ok_or_else(|| GpuError::invalid(format!("unknown device flags {raw_flags:#x}")))?,
        };
        let device = runtime().create_device(&descriptor)?;
        let handle = DEVICES.insert(device);
        // SAFETY: checked non-null above.
        unsafe { write(out_device, StrataDevice { handle }) };
        Ok(())
    })
}

/// Wraps a Vulkan device owned by the host.
///
/// # Safety
/// `info` and `out_device` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn strata_device_create_vulkan(
    info: *const StrataDeviceCreateInfoVulkan,
    out_device: *mut StrataDevice,
) -> StrataStatus {
    guard("strata_device_create_vulkan", || {
        out(out_device, "out_device")?;
        // SAFETY: upheld by the caller.
        let info = *unsafe { read(info, "info") }?;
        let import = VulkanImport::try_from(info)?;
        let device = runtime().import_vulkan_device(&import)?;
        let handle = DEVICES.insert(device);
        // SAFETY: checked non-null above.
        unsafe { write(out_device, StrataDevice { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataDevice, DEVICES, strata_device_retain, strata_device_release);

/// Copies the device capabilities.
///
/// # Safety
/// `out_capabilities` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_device_capabilities(
    device: StrataDevice,
    out_capabilities: *mut StrataCapabilities,
) -> StrataStatus {
    guard("strata_device_capabilities", || {
        out(out_capabilities, "out_capabilities")?;
        let caps = DEVICES.get(device.handle)?.capabilities()?;
        // SAFETY: checked non-null above.
        unsafe { write(out_capabilities, StrataCapabilities::from(&caps)) };
        Ok(())
    })
}
