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

use crate::abi::{StrataDevice, StrataFence, StrataStatus};
use crate::call::{guard, out, write};
use crate::registry::{DEVICES, FENCES};
use strata_runtime::Fence;

/// Creates a fence at value zero.
///
/// # Safety
/// `out_fence` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_fence_create(device: StrataDevice, out_fence: *mut StrataFence) -> StrataStatus {
    guard("strata_fence_create", || {
        out(out_fence, "out_fence")?;
        let device = DEVICES.get(device.handle)?;
        let handle = FENCES.insert(Fence::create(&device)?);
        // SAFETY: checked non-null above.
        unsafe { write(out_fence, StrataFence { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataFence, FENCES, strata_fence_retain, strata_fence_release);

/// Reads the highest value the GPU has reached.
///
/// # Safety
/// `out_value` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_fence_get_completed_value(
    fence: StrataFence,
    out_value: *mut u64,
) -> StrataStatus {
    guard("strata_fence_get_completed_value", || {
        out(out_value, "out_value")?;
        let value = FENCES.get(fence.handle)?.completed_value()?;
        // SAFETY: checked non-null above.
        unsafe { write(out_value, value) };
        Ok(())
    })
}

/// Blocks until the fence reaches `value`. `u64::MAX` waits forever; an
/// elapsed timeout is reported as `invalid_parameter`.
#[no_mangle]
pub extern "C" fn strata_fence_wait(fence: StrataFence, value: u64, timeout_ms: u64) -> StrataStatus {
    guard("strata_fence_wait", || FENCES.get(fence.handle)?.wait(value, timeout_ms))
}
