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

//! The closed set of status codes reported across the C boundary.

use std::fmt;

/// Outcome of every fallible operation exposed by Strata.
///
/// The numeric values are part of the binary contract and never change.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation succeeded.
    Ok = 0,
    /// A required pointer argument was null.
    NullPointer = -1,
    /// A handle was null, stale, or of the wrong kind.
    InvalidHandle = -2,
    /// An argument was out of range or the call was made in the wrong state.
    InvalidParameter = -3,
    /// An allocation or native resource creation failed.
    OutOfMemory = -4,
    /// The backend is not compiled in, or the operation is not defined for it.
    Unsupported = -5,
    /// The GPU was removed or reset. Devices and contexts must be recreated.
    DeviceLost = -6,
    /// The entry point is reserved but not wired to a backend yet.
    Unimplemented = -7,
    /// A native call failed for a reason not otherwise classified.
    InternalError = -8,
}

impl Status {
    /// Every status, in declaration order.
    pub const ALL: [Status; 9] = [
        Status::Ok,
        Status::NullPointer,
        Status::InvalidHandle,
        Status::InvalidParameter,
        Status::OutOfMemory,
        Status::Unsupported,
        Status::DeviceLost,
        Status::Unimplemented,
        Status::InternalError,
    ];

    /// Returns the raw code transmitted across the boundary.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Converts a raw code back into a status, if it is one of the known codes.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.code() == code)
    }

    /// Returns `true` for [`Status::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Returns the snake_case name used in the C header.
    pub const fn name(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::NullPointer => "null_pointer",
            Status::InvalidHandle => "invalid_handle",
            Status::InvalidParameter => "invalid_parameter",
            Status::OutOfMemory => "out_of_memory",
            Status::Unsupported => "unsupported",
            Status::DeviceLost => "device_lost",
            Status::Unimplemented => "unimplemented",
            Status::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_c_header() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::NullPointer.code(), -1);
        assert_eq!(Status::InvalidHandle.code(), -2);
        assert_eq!(Status::InvalidParameter.code(), -3);
        assert_eq!(Status::OutOfMemory.code(), -4);
        assert_eq!(Status::Unsupported.code(), -5);
        assert_eq!(Status::DeviceLost.code(), -6);
        assert_eq!(Status::Unimplemented.code(), -7);
        assert_eq!(Status::InternalError.code(), -8);
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(Status::from_code(-3), Some(Status::InvalidParameter));
        assert_eq!(Status::from_code(1), None);
        assert_eq!(Status::from_code(-9), None);
    }

    #[test]
    fn display_includes_name_and_code() {
        assert_eq!(format!("{}", Status::DeviceLost), "device_lost (-6)");
        assert!(Status::Ok.is_ok());
        assert!(!Status::Unsupported.is_ok());
    }
}
