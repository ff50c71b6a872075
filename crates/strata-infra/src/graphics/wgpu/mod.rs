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

//! Hardware backend built on `wgpu`.
//!
//! One [`WgpuApi`] exists per native API family (Direct3D 12, Metal, Vulkan),
//! each with its own `wgpu::Instance` restricted to that family. wgpu exposes a
//! single in-order queue per device, so the copy and direct queues of a
//! [`WgpuDevice`] share it and GPU-side waits between them are implicit.
//!
//! The Vulkan API can also wrap a device the host created itself, through
//! wgpu-hal interop.

mod backend;
mod command;
mod device;
#[cfg(any(windows, target_os = "linux", target_os = "android"))]
mod interop;
mod surface;

pub use self::backend::WgpuApi;
pub use self::command::{WgpuCommandAllocator, WgpuCommandList};
pub use self::device::{WgpuDevice, WgpuFence, WgpuQueue, WgpuTexture};
pub use self::surface::WgpuSwapChain;
