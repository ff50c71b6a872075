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

//! C ABI for the Strata GPU lifecycle layer.
//!
//! Every function returns a [`StrataStatus`](abi::StrataStatus) unless noted,
//! clears the calling thread's last error on success and records a message
//! on failure. Handles are opaque, pointer-sized and never zero.
//!
//! The exported functions share one [`Runtime`](strata_runtime::Runtime),
//! built on first use from `STRATA_CONFIG` with the platform's native APIs.
//! Hosts that bring their own native APIs call [`install_runtime`] first.

pub mod abi;
mod call;
mod error;
pub mod exports;
mod registry;

pub use error::last_error;
pub use exports::assets::*;
pub use exports::context::*;
pub use exports::device::*;
pub use exports::diagnostics::*;
pub use exports::draw::*;
pub use exports::fence::*;
pub use exports::surface::*;
pub use registry::{install_runtime, runtime};
