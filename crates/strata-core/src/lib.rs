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

//! # Strata Core
//!
//! Foundational crate containing the status codes, value types and collaborator
//! contracts shared by every layer of Strata.
//!
//! Strata sits between application code and a GPU path renderer. It does not
//! rasterize anything itself: the native graphics API is reached through the
//! [`renderer::traits::native`] contracts and the wrapped rendering engine through
//! the [`renderer::traits::engine`] contracts.

#![warn(missing_docs)]

pub mod renderer;
pub mod status;

pub use renderer::error::{GpuError, GpuResult, NativeError, NativeResult};
pub use status::Status;
