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

//! Boundary helpers: status conversion, panic containment and pointer checks.

use crate::abi::StrataStatus;
use crate::error;
use std::panic::{self, AssertUnwindSafe};
use strata_core::{GpuError, GpuResult, Status};

/// Runs `body`, records its outcome in the last-error slot and returns the
/// status code.
///
/// Panics are contained and reported as internal errors.
pub(crate) fn guard(name: &'static str, body: impl FnOnce() -> GpuResult<()>) -> StrataStatus {
    let outcome = panic::catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        log::error!("{name} panicked: {detail}");
        Err(GpuError::internal(format!("{name} panicked: {detail}")))
    });
    match outcome {
        Ok(()) => {
            error::clear();
            Status::Ok.code()
        }
        Err(err) => {
            if err.is_device_lost() {
                log::error!("{name}: {err}");
            } else {
                log::debug!("{name}: {err}");
            }
            error::set(&err.to_string());
            err.status().code()
        }
    }
}

/// Borrows the value behind `ptr`.
///
/// ## Safety
/// `ptr` must be null or point to a valid `T` for the returned lifetime.
pub(crate) unsafe fn read<'a, T>(ptr: *const T, name: &'static str) -> GpuResult<&'a T> {
    // SAFETY: upheld by the caller.
    unsafe { ptr.as_ref() }.ok_or(GpuError::NullPointer(name))
}

/// Checks that an output pointer is non-null.
pub(crate) fn out<T>(ptr: *mut T, name: &'static str) -> GpuResult<()> {
    if ptr.is_null() {
        return Err(GpuError::NullPointer(name));
    }
    Ok(())
}

/// Stores `value` through a pointer already checked by [`out`].
///
/// ## Safety
/// `ptr` must be valid for writes of `T`.
pub(crate) unsafe fn write<T>(ptr: *mut T, value: T) {
    // SAFETY: upheld by the caller. Packed targets may be unaligned.
    unsafe { ptr.write_unaligned(value) }
}

/// Borrows `len` elements starting at `ptr`. An empty slice needs no pointer.
///
/// ## Safety
/// `ptr` must be null or valid for reads of `len` elements.
pub(crate) unsafe fn slice<'a, T>(ptr: *const T, len: usize, name: &'static str) -> GpuResult<&'a [T]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(GpuError::NullPointer(name));
    }
    // SAFETY: upheld by the caller.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Decodes a one-byte enum tag.
pub(crate) fn tag<T>(raw: u8, decode: fn(u8) -> Option<T>, what: &str) -> GpuResult<T> {
    decode(raw).ok_or_else(|| GpuError::invalid(format!("unknown {what} {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_clears_the_previous_error() {
        let status = guard("failing", || Err(GpuError::invalid("nope")));
        assert_eq!(status, Status::InvalidParameter.code());
        assert_eq!(error::last_error().as_deref(), Some("Invalid parameter: nope"));

        assert_eq!(guard("passing", || Ok(())), 0);
        assert_eq!(error::last_error(), None);
    }

    #[test]
    fn panics_become_internal_errors() {
        let status = guard("exploding", || panic!("boom"));
        assert_eq!(status, Status::InternalError.code());
        let message = error::last_error().unwrap();
        assert!(message.contains("exploding panicked: boom"), "{message}");
    }

    #[test]
    fn empty_slices_accept_null() {
        let empty = unsafe { slice::<u8>(std::ptr::null(), 0, "data") }.unwrap();
        assert!(empty.is_empty());
        let err = unsafe { slice::<u8>(std::ptr::null(), 4, "data") }.unwrap_err();
        assert_eq!(err, GpuError::NullPointer("data"));
    }
}
