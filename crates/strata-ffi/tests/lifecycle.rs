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

//! Null-backend scenarios driven through the exported functions.

use std::ffi::c_char;
use std::ptr;
use strata_core::renderer::api::{AdapterInfo, BackendKind, FillRule, Mat2D, NULL_ADAPTER_NAME};
use strata_core::Status;
use strata_ffi::abi::{
    StrataAdapterDesc, StrataBuffer, StrataCapabilities, StrataContext, StrataDevice,
    StrataDeviceCreateInfo, StrataFence, StrataFrameOptions, StrataMappedMemory, StrataPaint,
    StrataPath, StrataStatus,
};
use strata_ffi::*;

const OK: StrataStatus = 0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn last_error() -> String {
    let required = unsafe { strata_get_last_error_message(ptr::null_mut(), 0) };
    let mut buffer = vec![0 as c_char; required.max(1)];
    unsafe { strata_get_last_error_message(buffer.as_mut_ptr(), buffer.len()) };
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8(bytes).expect("utf-8 error text")
}

fn null_device() -> StrataDevice {
    let info = StrataDeviceCreateInfo {
        backend: BackendKind::Null.as_raw(),
        ..Default::default()
    };
    let mut device = StrataDevice::NULL;
    assert_eq!(unsafe { strata_device_create(&info, &mut device) }, OK);
    assert!(!device.is_null());
    device
}

fn context(device: StrataDevice, width: u32, height: u32) -> StrataContext {
    let mut context = StrataContext::NULL;
    assert_eq!(
        unsafe { strata_context_create(device, width, height, &mut context) },
        OK
    );
    context
}

fn frame(context: StrataContext) -> (StrataStatus, StrataStatus, StrataStatus) {
    (
        unsafe { strata_context_begin_frame(context, ptr::null()) },
        strata_context_end_frame(context),
        strata_context_submit(context),
    )
}

#[test]
fn enumeration_uses_a_two_phase_query() {
    init_logging();

    // --- 1. Count only ---
    let mut count = 0usize;
    assert_eq!(
        unsafe { strata_enumerate_adapters(ptr::null_mut(), 0, &mut count) },
        OK
    );
    assert!(count >= 1, "the null adapter is always listed");

    // --- 2. Full list, null adapter last ---
    let mut adapters = vec![StrataAdapterDesc::from(&AdapterInfo::null()); count];
    assert_eq!(
        unsafe { strata_enumerate_adapters(adapters.as_mut_ptr(), adapters.len(), &mut count) },
        OK
    );
    let last = adapters[count - 1];
    assert_eq!(last.backend, BackendKind::Null.as_raw());
    assert_eq!(last.name(), NULL_ADAPTER_NAME);

    // --- 3. Short buffers are never overrun ---
    let mut short = vec![last; 2];
    short[1].vendor_id = 0x1234;
    assert_eq!(
        unsafe { strata_enumerate_adapters(short.as_mut_ptr(), 1, &mut count) },
        OK
    );
    let untouched = short[1].vendor_id;
    assert_eq!(untouched, 0x1234);

    // --- 4. Missing count ---
    assert_eq!(
        unsafe { strata_enumerate_adapters(ptr::null_mut(), 0, ptr::null_mut()) },
        Status::NullPointer.code()
    );
    assert_eq!(last_error(), "count pointer is null");
}

#[test]
fn null_device_runs_three_frames() {
    init_logging();
    let device = null_device();

    let mut caps = StrataCapabilities::default();
    assert_eq!(unsafe { strata_device_capabilities(device, &mut caps) }, OK);
    let (backend, presentation) = (caps.backend, caps.supports_presentation);
    assert_eq!(backend, BackendKind::Null.as_raw());
    assert_eq!(presentation, 0);

    let context = context(device, 128, 128);
    for _ in 0..3 {
        assert_eq!(frame(context), (OK, OK, OK));
    }

    let (mut width, mut height) = (0u32, 0u32);
    assert_eq!(
        unsafe { strata_context_get_size(context, &mut width, &mut height) },
        OK
    );
    assert_eq!((width, height), (128, 128));

    assert_eq!(strata_context_release(context), OK);
    assert_eq!(strata_device_release(device), OK);
}

#[test]
fn refcounts_balance_before_destruction() {
    init_logging();
    let device = null_device();

    for _ in 0..3 {
        assert_eq!(strata_device_retain(device), OK);
    }
    for _ in 0..3 {
        assert_eq!(strata_device_release(device), OK);
    }
    let mut caps = StrataCapabilities::default();
    assert_eq!(unsafe { strata_device_capabilities(device, &mut caps) }, OK);

    assert_eq!(strata_device_release(device), OK);
    assert_eq!(
        unsafe { strata_device_capabilities(device, &mut caps) },
        Status::InvalidHandle.code()
    );
    assert_eq!(strata_device_retain(device), Status::InvalidHandle.code());
    assert_eq!(
        strata_device_release(StrataDevice::NULL),
        Status::InvalidHandle.code()
    );
}

#[test]
fn children_keep_their_device_alive() {
    init_logging();
    let device = null_device();
    let context = context(device, 16, 16);

    // Dropping the caller's reference leaves the context's.
    assert_eq!(strata_device_release(device), OK);
    assert_eq!(frame(context), (OK, OK, OK));

    let mut fence = StrataFence::NULL;
    assert_eq!(
        unsafe { strata_fence_create(device, &mut fence) },
        OK,
        "the device is still alive while the context holds it"
    );
    assert_eq!(strata_fence_release(fence), OK);
    assert_eq!(strata_context_release(context), OK);

    let mut caps = StrataCapabilities::default();
    assert_eq!(
        unsafe { strata_device_capabilities(device, &mut caps) },
        Status::InvalidHandle.code()
    );
}

#[test]
fn frame_calls_out_of_order_are_rejected() {
    init_logging();
    let device = null_device();
    let context = context(device, 64, 64);
    let invalid = Status::InvalidParameter.code();

    // --- 1. end and submit without a frame ---
    assert_eq!(strata_context_end_frame(context), invalid);
    assert_eq!(strata_context_submit(context), invalid);

    // --- 2. begin twice, then finish normally ---
    assert_eq!(unsafe { strata_context_begin_frame(context, ptr::null()) }, OK);
    assert_eq!(unsafe { strata_context_begin_frame(context, ptr::null()) }, invalid);
    assert!(!last_error().is_empty());
    assert_eq!(strata_context_submit(context), invalid);
    assert_eq!(strata_context_resize(context, 32, 32), invalid);
    assert_eq!(strata_context_end_frame(context), OK);
    assert_eq!(strata_context_submit(context), OK);
    assert_eq!(last_error(), "", "success clears the last error");

    // --- 3. Frame options resize the context ---
    let options = StrataFrameOptions {
        width: 48,
        height: 24,
        ..Default::default()
    };
    assert_eq!(unsafe { strata_context_begin_frame(context, &options) }, OK);
    assert_eq!(strata_context_end_frame(context), OK);
    assert_eq!(strata_context_submit(context), OK);
    let (mut width, mut height) = (0u32, 0u32);
    unsafe { strata_context_get_size(context, &mut width, &mut height) };
    assert_eq!((width, height), (48, 24));

    assert_eq!(strata_context_resize(context, 0, 10), invalid);
    assert_eq!(strata_context_release(context), OK);
    assert_eq!(strata_device_release(device), OK);
}

#[test]
fn cpu_framebuffer_copies_are_checked() {
    init_logging();
    let device = null_device();
    let context = context(device, 4, 2);
    assert_eq!(frame(context), (OK, OK, OK));

    let mut pixels = vec![0xaa_u8; 4 * 2 * 4];
    assert_eq!(
        unsafe { strata_context_copy_cpu_framebuffer(context, ptr::null_mut(), 32) },
        Status::NullPointer.code()
    );
    assert_eq!(
        unsafe { strata_context_copy_cpu_framebuffer(context, pixels.as_mut_ptr(), 31) },
        Status::InvalidParameter.code()
    );
    assert_eq!(
        unsafe { strata_context_copy_cpu_framebuffer(context, pixels.as_mut_ptr(), pixels.len()) },
        OK
    );
    assert!(pixels.iter().all(|&b| b == 0));

    assert_eq!(strata_context_release(context), OK);
    assert_eq!(strata_device_release(device), OK);
}

#[test]
fn fences_on_the_null_device_are_monotonic() {
    init_logging();
    let device = null_device();
    let context = context(device, 8, 8);
    let mut fence = StrataFence::NULL;
    assert_eq!(unsafe { strata_fence_create(device, &mut fence) }, OK);

    let mut value = u64::MAX;
    assert_eq!(unsafe { strata_fence_get_completed_value(fence, &mut value) }, OK);
    assert_eq!(value, 0);

    // Zero picks the next value.
    assert_eq!(strata_context_signal_fence(context, fence, 0), OK);
    assert_eq!(strata_context_signal_fence(context, fence, 5), OK);
    assert_eq!(unsafe { strata_fence_get_completed_value(fence, &mut value) }, OK);
    assert_eq!(value, 5);
    assert_eq!(
        strata_context_signal_fence(context, fence, 5),
        Status::InvalidParameter.code()
    );

    assert_eq!(strata_fence_wait(fence, 5, 0), OK);
    assert_eq!(strata_fence_wait(fence, 3, 0), OK);
    assert_eq!(
        strata_fence_wait(fence, 6, 10),
        Status::InvalidParameter.code(),
        "an elapsed timeout is a usage error"
    );

    // A fence only accepts signals from its own device.
    let other = null_device();
    let foreign = context_on(other);
    assert_eq!(
        strata_context_signal_fence(foreign, fence, 0),
        Status::InvalidParameter.code()
    );

    for status in [
        strata_context_release(foreign),
        strata_device_release(other),
        strata_fence_release(fence),
        strata_context_release(context),
        strata_device_release(device),
    ] {
        assert_eq!(status, OK);
    }
}

fn context_on(device: StrataDevice) -> StrataContext {
    context(device, 8, 8)
}

#[test]
fn device_requests_are_validated() {
    init_logging();
    let mut device = StrataDevice::NULL;
    let request = |backend: u8, flags: u32, device: &mut StrataDevice| {
        let info = StrataDeviceCreateInfo {
            backend,
            flags,
            ..Default::default()
        };
        unsafe { strata_device_create(&info, device) }
    };

    assert_eq!(request(0, 0, &mut device), Status::InvalidParameter.code());
    assert_eq!(request(200, 0, &mut device), Status::InvalidParameter.code());
    assert_eq!(
        request(BackendKind::D3d11.as_raw(), 0, &mut device),
        Status::Unsupported.code()
    );
    assert_eq!(
        request(BackendKind::Null.as_raw(), 1 << 20, &mut device),
        Status::InvalidParameter.code()
    );
    assert!(device.is_null(), "failed calls publish nothing");

    let info = StrataDeviceCreateInfo::default();
    assert_eq!(
        unsafe { strata_device_create(&info, ptr::null_mut()) },
        Status::NullPointer.code()
    );
    assert_eq!(
        unsafe { strata_device_create(ptr::null(), &mut device) },
        Status::NullPointer.code()
    );
}

#[test]
fn null_contexts_have_no_render_context() {
    init_logging();
    let device = null_device();
    let context = context(device, 8, 8);

    let mut path = StrataPath::NULL;
    assert_eq!(
        unsafe { strata_path_create(context, FillRule::NonZero.as_raw(), &mut path) },
        Status::Unsupported.code()
    );
    assert_eq!(
        unsafe { strata_path_create(context, 7, &mut path) },
        Status::InvalidParameter.code()
    );
    let mut paint = StrataPaint::NULL;
    assert_eq!(
        unsafe { strata_paint_create(context, &mut paint) },
        Status::Unsupported.code()
    );
    let mut buffer = StrataBuffer::NULL;
    assert_eq!(
        unsafe { strata_buffer_create(context, 1, 0, 64, &mut buffer) },
        Status::Unsupported.code()
    );
    assert!(path.is_null() && paint.is_null() && buffer.is_null());

    // Stale handles are reported before anything else.
    assert_eq!(strata_path_close(path), Status::InvalidHandle.code());
    assert_eq!(
        unsafe { strata_path_add_path(path, path, &Mat2D::IDENTITY) },
        Status::InvalidHandle.code()
    );
    let mut mapping = StrataMappedMemory::default();
    assert_eq!(
        unsafe { strata_buffer_map(buffer, 0, &mut mapping) },
        Status::InvalidHandle.code()
    );

    assert_eq!(strata_context_release(context), OK);
    assert_eq!(strata_device_release(device), OK);
}

#[test]
fn self_test_passes_on_the_null_device() {
    init_logging();
    strata_init_logging();
    assert_eq!(strata_run_self_test(), OK);
    strata_clear_last_error();
    assert_eq!(last_error(), "");
}
