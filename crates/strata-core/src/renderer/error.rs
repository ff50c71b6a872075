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

//! Defines the error types used by Strata and their mapping onto [`Status`].

use crate::status::Status;
use std::fmt;

/// An error raised by a Strata operation.
///
/// Every variant maps onto exactly one non-ok [`Status`]; the message is the
/// advisory text published through the last-error channel.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
    /// A required pointer argument was null. Carries the argument name.
    NullPointer(&'static str),
    /// A handle was null or already destroyed. Carries the handle kind.
    InvalidHandle(&'static str),
    /// An argument was out of range or a precondition was violated.
    InvalidParameter(String),
    /// An allocation or native resource creation failed.
    OutOfMemory(String),
    /// The backend or operation is not available.
    Unsupported(String),
    /// The GPU was removed or reset.
    DeviceLost(String),
    /// The entry point exists but is not wired to a backend.
    Unimplemented(String),
    /// An unexpected native failure or a broken internal invariant.
    Internal(String),
}

impl GpuError {
    /// Returns the status code reported for this error.
    pub fn status(&self) -> Status {
        match self {
            GpuError::NullPointer(_) => Status::NullPointer,
            GpuError::InvalidHandle(_) => Status::InvalidHandle,
            GpuError::InvalidParameter(_) => Status::InvalidParameter,
            GpuError::OutOfMemory(_) => Status::OutOfMemory,
            GpuError::Unsupported(_) => Status::Unsupported,
            GpuError::DeviceLost(_) => Status::DeviceLost,
            GpuError::Unimplemented(_) => Status::Unimplemented,
            GpuError::Internal(_) => Status::InternalError,
        }
    }

    /// Shorthand for [`GpuError::InvalidParameter`].
    pub fn invalid(message: impl Into<String>) -> Self {
        GpuError::InvalidParameter(message.into())
    }

    /// Shorthand for [`GpuError::Unsupported`].
    pub fn unsupported(message: impl Into<String>) -> Self {
        GpuError::Unsupported(message.into())
    }

    /// Shorthand for [`GpuError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        GpuError::Internal(message.into())
    }

    /// Returns `true` if the caller must recreate its device and contexts.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, GpuError::DeviceLost(_))
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NullPointer(argument) => write!(f, "{argument} pointer is null"),
            GpuError::InvalidHandle(kind) => {
                write!(f, "{kind} handle is null or has been released")
            }
            GpuError::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
            GpuError::OutOfMemory(msg) => write!(f, "Out of memory: {msg}"),
            GpuError::Unsupported(msg) => write!(f, "Unsupported: {msg}"),
            GpuError::DeviceLost(msg) => write!(f, "Device lost: {msg}"),
            GpuError::Unimplemented(msg) => write!(f, "Not implemented: {msg}"),
            GpuError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for GpuError {}

/// A failure reported by the native graphics API of a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// The adapter was physically removed or the driver was updated.
    DeviceRemoved(String),
    /// The driver reset the device after a hang.
    DeviceReset(String),
    /// The native API ran out of memory.
    OutOfMemory(String),
    /// A bounded wait elapsed before the awaited value was reached.
    Timeout,
    /// The native API does not support the request.
    Unsupported(String),
    /// Any other native failure.
    Failed(String),
}

impl NativeError {
    /// Returns `true` for device removal or reset.
    pub fn is_device_loss(&self) -> bool {
        matches!(
            self,
            NativeError::DeviceRemoved(_) | NativeError::DeviceReset(_)
        )
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeError::DeviceRemoved(msg) => write!(f, "device removed: {msg}"),
            NativeError::DeviceReset(msg) => write!(f, "device reset: {msg}"),
            NativeError::OutOfMemory(msg) => write!(f, "native allocation failed: {msg}"),
            NativeError::Timeout => write!(f, "wait timed out"),
            NativeError::Unsupported(msg) => write!(f, "not supported by the native API: {msg}"),
            NativeError::Failed(msg) => write!(f, "native call failed: {msg}"),
        }
    }
}

impl std::error::Error for NativeError {}

impl From<NativeError> for GpuError {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::DeviceRemoved(_) | NativeError::DeviceReset(_) => {
                GpuError::DeviceLost(err.to_string())
            }
            NativeError::OutOfMemory(msg) => GpuError::OutOfMemory(msg),
            // Bounded waits report elapsed timeouts as a usage error.
            NativeError::Timeout => GpuError::InvalidParameter(err.to_string()),
            NativeError::Unsupported(msg) => GpuError::Unsupported(msg),
            NativeError::Failed(_) => GpuError::Internal(err.to_string()),
        }
    }
}

/// Result alias for Strata operations.
pub type GpuResult<T> = Result<T, GpuError>;

/// Result alias for native collaborator calls.
pub type NativeResult<T> = Result<T, NativeError>;
