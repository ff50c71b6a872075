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

//! Context creation and the frame loop.

use crate::abi::{StrataContext, StrataDevice, StrataFence, StrataFrameOptions, StrataStatus};
use crate::call::{guard, out, write};
use crate::registry::{CONTEXTS, DEVICES, FENCES};
use strata_core::renderer::api::FrameOptions;
use strata_core::GpuError;
use strata_runtime::Context;

/// Creates a context rendering `width` x `height` frames on `device`.
///
/// # Safety
/// `out_context` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_context_create(
    device: StrataDevice,
    width: u32,
    height: u32,
    out_context: *mut StrataContext,
) -> StrataStatus {
    guard("strata_context_create", || {
        out(out_context, "out_context")?;
        let device = DEVICES.get(device.handle)?;
        let context = Context::create(&device, width, height)?;
        let handle = CONTEXTS.insert(context);
        // SAFETY: checked non-null above.
        unsafe { write(out_context, StrataContext { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataContext, CONTEXTS, strata_context_retain, strata_context_release);

/// Reads the current frame size.
///
/// # Safety
/// `out_width` and `out_height` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_context_get_size(
    context: StrataContext,
    out_width: *mut u32,
    out_height: *mut u32,
) -> StrataStatus {
    guard("strata_context_get_size", || {
        out(out_width, "out_width")?;
        out(out_height, "out_height")?;
        let (width, height) = CONTEXTS.get(context.handle)?.size()?;
        // SAFETY: both checked non-null above.
        unsafe {
            write(out_width, width);
            write(out_height, height);
        }
        Ok(())
    })
}

/// Changes the frame size. Rejected while a frame is being recorded.
#[no_mangle]
pub extern "C" fn strata_context_resize(context: StrataContext, width: u32, height: u32) -> StrataStatus {
    guard("strata_context_resize", || {
        CONTEXTS.get(context.handle)?.resize(width, height)
    })
}

/// Starts recording a frame. `options` may be null.
///
/// # Safety
/// `options` must be null or valid for one read.
#[no_mangle]
pub unsafe extern "C" fn strata_context_begin_frame(
    context: StrataContext,
    options: *const StrataFrameOptions,
) -> StrataStatus {
    guard("strata_context_begin_frame", || {
        let context = CONTEXTS.get(context.handle)?;
        // SAFETY: upheld by the caller.
        let options = unsafe { options.as_ref() }
            .map(|raw| FrameOptions::from(*raw))
            .unwrap_or_default();
        context.begin_frame(&options)
    })
}

/// Closes the frame being recorded.
#[no_mangle]
pub extern "C" fn strata_context_end_frame(context: StrataContext) -> StrataStatus {
    guard("strata_context_end_frame", || CONTEXTS.get(context.handle)?.end_frame())
}

/// Submits the ended frame and waits for the GPU to finish it.
#[no_mangle]
pub extern "C" fn strata_context_submit(context: StrataContext) -> StrataStatus {
    guard("strata_context_submit", || CONTEXTS.get(context.handle)?.submit())
}

/// Signals `fence` to `value` from the context's queue. Zero picks the next
/// value.
#[no_mangle]
pub extern "C" fn strata_context_signal_fence(
    context: StrataContext,
    fence: StrataFence,
    value: u64,
) -> StrataStatus {
    guard("strata_context_signal_fence", || {
        let context = CONTEXTS.get(context.handle)?;
        let fence = FENCES.get(fence.handle)?;
        context.signal_fence(&fence, value).map(|_| ())
    })
}

/// Copies the null backend's RGBA8 framebuffer.
///
/// # Safety
/// `out_pixels` must be null or valid for `buffer_length` writes.
#[no_mangle]
pub unsafe extern "C" fn strata_context_copy_cpu_framebuffer(
    context: StrataContext,
    out_pixels: *mut u8,
    buffer_length: usize,
) -> StrataStatus {
    guard("strata_context_copy_cpu_framebuffer", || {
        let context = CONTEXTS.get(context.handle)?;
        if out_pixels.is_null() {
            return Err(GpuError::NullPointer("out_pixels"));
        }
        // SAFETY: non-null and sized by the caller.
        let pixels = unsafe { std::slice::from_raw_parts_mut(out_pixels, buffer_length) };
        context.copy_cpu_framebuffer(pixels).map(|_| ())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::StrataDeviceCreateInfo;
    use crate::exports::device::{strata_device_create, strata_device_release};
    use strata_core::renderer::api::BackendKind;
    use strata_core::Status;

    #[test]
    fn each_submit_completes_exactly_one_frame() {
        let mut device = StrataDevice::NULL;
        let info = StrataDeviceCreateInfo {
            backend: BackendKind::Null.as_raw(),
            ..Default::default()
        };
        assert_eq!(unsafe { strata_device_create(&info, &mut device) }, 0);
        let mut context = StrataContext::NULL;
        assert_eq!(unsafe { strata_context_create(device, 128, 128, &mut context) }, 0);

        let handle = CONTEXTS.get(context.handle).unwrap();
        for expected in 1..=3u64 {
            assert_eq!(unsafe { strata_context_begin_frame(context, std::ptr::null()) }, 0);
            assert_eq!(strata_context_end_frame(context), 0);
            assert_eq!(strata_context_submit(context), 0);
            assert_eq!(handle.clock().unwrap().last_completed(), expected);
        }

        assert_eq!(strata_context_release(context), 0);
        assert_eq!(strata_device_release(device), 0);
        assert_eq!(
            strata_context_submit(context),
            Status::InvalidHandle.code()
        );
    }
}
