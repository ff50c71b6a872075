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

//! Presentable surface targets and swapchain configuration.

use super::backend::{BackendKind, RawHandle};
use super::util::SurfaceFlags;

/// Sentinel meaning no back-buffer render target is lent to a context.
pub const NO_BORROWED_BUFFER: u32 = u32::MAX;

/// Minimum number of images in a swapchain.
pub const MIN_BUFFER_COUNT: u32 = 2;

/// The window-system object a swapchain presents to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTarget {
    /// A Win32 `HWND`.
    Win32Window {
        /// The window handle.
        hwnd: RawHandle,
    },
    /// A `CAMetalLayer`.
    MetalLayer {
        /// The layer pointer.
        layer: RawHandle,
    },
    /// A `VkSurfaceKHR` created by the host.
    Vulkan {
        /// The surface handle.
        surface: RawHandle,
        /// Requested `VkPresentModeKHR`.
        present_mode: u32,
    },
}

impl SurfaceTarget {
    /// Backend that can present to this target.
    pub fn backend(&self) -> BackendKind {
        match self {
            SurfaceTarget::Win32Window { .. } => BackendKind::D3d12,
            SurfaceTarget::MetalLayer { .. } => BackendKind::Metal,
            SurfaceTarget::Vulkan { .. } => BackendKind::Vulkan,
        }
    }
}

/// Caller-facing surface creation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDescriptor {
    /// Where frames are presented.
    pub target: SurfaceTarget,
    /// Width, or 0 for the context width.
    pub width: u32,
    /// Height, or 0 for the context height.
    pub height: u32,
    /// Requested image count, or 0 for the default.
    pub buffer_count: u32,
    /// Present interval used when `present` is called with 0, or 0 for 1.
    pub present_interval: u32,
    /// MSAA sample count, or 0 for 1.
    pub sample_count: u32,
    /// Creation options.
    pub flags: SurfaceFlags,
}

/// Resolved swapchain parameters passed to the native API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainConfig {
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Number of images.
    pub buffer_count: u32,
    /// MSAA sample count.
    pub sample_count: u32,
    /// Whether the swapchain is created with tearing support.
    pub allow_tearing: bool,
    /// Whether the surface was asked to synchronize with vertical blank.
    pub vsync: bool,
}
