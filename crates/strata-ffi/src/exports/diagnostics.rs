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

//! Error text, self test and logging bootstrap.

use crate::abi::StrataStatus;
use crate::call::guard;
use crate::error;
use crate::registry::runtime;
use std::ffi::c_char;

/// Copies the calling thread's last error message, truncated and
/// NUL-terminated.
///
/// Returns the buffer length needed for the whole message including its
/// terminator, or zero when no error is recorded.
///
/// # Safety
/// `buffer` must be null or valid for `buffer_length` writes.
#[no_mangle]
pub unsafe extern "C" fn strata_get_last_error_message(buffer: *mut c_char, buffer_length: usize) -> usize {
    // SAFETY: upheld by the caller.
    unsafe { error::copy_into(buffer.cast(), buffer_length) }
}

/// Empties the calling thread's last error message.
#[no_mangle]
pub extern "C" fn strata_clear_last_error() {
    error::clear();
}

/// Renders one frame on each usable adapter, then on the null device.
#[no_mangle]
pub extern "C" fn strata_run_self_test() -> StrataStatus {
    guard("strata_run_self_test", || runtime().run_self_test())
}

/// Installs the `env_logger` backend. Honours `RUST_LOG`; later calls are
/// no-ops.
#[no_mangle]
pub extern "C" fn strata_init_logging() {
    if env_logger::try_init().is_ok() {
        log::info!("Strata logging initialised");
    }
}
