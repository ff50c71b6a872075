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

//! Narrow contracts over a native graphics API.
//!
//! A backend provides one [`NativeApi`] that enumerates adapters and opens
//! [`NativeDevice`]s. Everything the frame state machine needs from the GPU is
//! reached through these traits: command allocators and lists for the copy and
//! direct queues, timeline fences, textures used as render targets, and
//! swapchains that lend their back buffers.

use crate::renderer::api::{
    AdapterInfo, BackendKind, Capabilities, Color, DeviceFlags, SurfaceTarget, SwapChainConfig,
    VulkanImport,
};
use crate::renderer::error::{NativeError, NativeResult};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// The two hardware queues a context drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Upload and copy work.
    Copy,
    /// Graphics work.
    Direct,
}

/// A physical adapter as reported by a [`NativeApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct NativeAdapter {
    /// Public description.
    pub info: AdapterInfo,
    /// Whether the adapter is a software rasterizer.
    pub software: bool,
    /// Position of the adapter in the API's own enumeration.
    pub ordinal: usize,
}

/// Entry point of one native graphics API.
pub trait NativeApi: Send + Sync + Debug {
    /// Backend implemented by this API.
    fn backend(&self) -> BackendKind;

    /// Lists the physical adapters, hardware and software alike, in the API's order.
    fn enumerate_adapters(&self) -> NativeResult<Vec<NativeAdapter>>;

    /// Checks that a device can be created on `adapter` at the minimum feature level.
    fn probe(&self, adapter: &NativeAdapter) -> NativeResult<()>;

    /// Opens a device on `adapter`.
    fn open_device(
        &self,
        adapter: &NativeAdapter,
        flags: DeviceFlags,
    ) -> NativeResult<Arc<dyn NativeDevice>>;

    /// Wraps externally created Vulkan objects without taking ownership of them.
    ///
    /// Only Vulkan providers implement this.
    fn import_vulkan(&self, _import: &VulkanImport) -> NativeResult<Arc<dyn NativeDevice>> {
        Err(NativeError::Unsupported(format!(
            "{} cannot import Vulkan handles",
            self.backend()
        )))
    }
}

/// A logical GPU device with its queues.
pub trait NativeDevice: Send + Sync + Debug {
    /// Backend of the device.
    fn backend(&self) -> BackendKind;

    /// Capability record of the device.
    fn capabilities(&self) -> Capabilities;

    /// Returns the queue of the given kind.
    fn queue(&self, kind: QueueKind) -> Arc<dyn CommandQueue>;

    /// Creates a command allocator for the given queue.
    fn create_command_allocator(&self, kind: QueueKind)
        -> NativeResult<Box<dyn CommandAllocator>>;

    /// Creates a command list recording from `allocator`. The list starts open.
    fn create_command_list(
        &self,
        kind: QueueKind,
        allocator: &mut dyn CommandAllocator,
    ) -> NativeResult<Box<dyn CommandList>>;

    /// Creates a timeline fence whose completed value starts at `initial`.
    fn create_fence(&self, initial: u64) -> NativeResult<Arc<dyn NativeFence>>;

    /// Creates a texture usable as a render target.
    fn create_texture(
        &self,
        width: u32,
        height: u32,
        label: &str,
    ) -> NativeResult<Arc<dyn NativeTexture>>;

    /// Creates a swapchain presenting to `target`.
    fn create_swap_chain(
        &self,
        target: &SurfaceTarget,
        config: &SwapChainConfig,
    ) -> NativeResult<Box<dyn SwapChain>>;
}

/// Backing memory for recorded commands.
pub trait CommandAllocator: Send + Debug {
    /// Queue this allocator records for.
    fn kind(&self) -> QueueKind;

    /// Reclaims the memory of every list recorded from this allocator.
    ///
    /// Must only be called once the GPU finished executing those lists.
    fn reset(&mut self) -> NativeResult<()>;

    /// Downcasting hook for backend implementations.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// GPU work handed to a command list by the rendering engine.
#[derive(Debug)]
pub enum EncodedWork<'a> {
    /// Copy staged bytes to GPU memory.
    Upload {
        /// Debug label.
        label: &'a str,
        /// Bytes to upload.
        bytes: &'a [u8],
    },
    /// A render pass drawing into `target`.
    RenderPass {
        /// Debug label.
        label: &'a str,
        /// Attachment, or `None` for a pass that only advances engine state.
        target: Option<&'a dyn NativeTexture>,
        /// What happens to the attachment at the start of the pass.
        load: LoadAction,
        /// Number of draws issued by the pass.
        draw_count: u32,
    },
}

/// Load operation of a render pass attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAction {
    /// Clear to the given `0xAARRGGBB` color.
    Clear(Color),
    /// Keep the previous contents.
    Load,
}

/// A list of recorded commands for one queue.
pub trait CommandList: Send + Debug {
    /// Queue the list is recorded for.
    fn kind(&self) -> QueueKind;

    /// Reopens the list for recording from `allocator`.
    fn reset(&mut self, allocator: &mut dyn CommandAllocator) -> NativeResult<()>;

    /// Records engine work.
    fn encode(&mut self, work: &EncodedWork<'_>) -> NativeResult<()>;

    /// Finishes recording.
    fn close(&mut self) -> NativeResult<()>;

    /// Whether [`CommandList::close`] has been called since the last reset.
    fn is_closed(&self) -> bool;

    /// Downcasting hook for backend implementations.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A hardware queue.
pub trait CommandQueue: Send + Sync + Debug {
    /// Kind of the queue.
    fn kind(&self) -> QueueKind;

    /// Submits a closed command list.
    fn execute(&self, list: &mut dyn CommandList) -> NativeResult<()>;

    /// Sets `fence` to `value` once all previously submitted work completes.
    fn signal(&self, fence: &dyn NativeFence, value: u64) -> NativeResult<()>;

    /// Makes later submissions on this queue wait on the GPU until `fence` reaches `value`.
    fn wait(&self, fence: &dyn NativeFence, value: u64) -> NativeResult<()>;
}

/// A monotonically increasing GPU timeline.
pub trait NativeFence: Send + Sync + Debug {
    /// Highest value the GPU has completed.
    fn completed_value(&self) -> u64;

    /// Blocks until the completed value reaches `value`.
    ///
    /// `None` waits without bound. An elapsed bound yields [`NativeError::Timeout`].
    fn wait(&self, value: u64, timeout: Option<Duration>) -> NativeResult<()>;

    /// Downcasting hook for backend implementations.
    fn as_any(&self) -> &dyn Any;
}

/// A GPU texture.
pub trait NativeTexture: Send + Sync + Debug {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// Downcasting hook for backend implementations.
    fn as_any(&self) -> &dyn Any;
}

/// A presentable chain of back buffers.
pub trait SwapChain: Send + Debug {
    /// Number of images.
    fn buffer_count(&self) -> u32;

    /// Current image size.
    fn size(&self) -> (u32, u32);

    /// Whether the chain can present without waiting for vertical sync.
    ///
    /// False unless tearing was requested at creation and the surface offers it.
    fn tearing_enabled(&self) -> bool;

    /// Index of the image the next frame renders into.
    fn current_back_buffer_index(&mut self) -> NativeResult<u32>;

    /// Returns the texture of image `index`.
    fn back_buffer(&mut self, index: u32) -> NativeResult<Arc<dyn NativeTexture>>;

    /// Resizes every image. No back-buffer texture may be referenced elsewhere.
    fn resize(&mut self, width: u32, height: u32) -> NativeResult<()>;

    /// Presents the current image.
    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> NativeResult<()>;
}
