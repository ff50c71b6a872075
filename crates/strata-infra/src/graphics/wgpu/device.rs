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

//! wgpu devices, the shared queue, fences and textures.

use super::command::{WgpuCommandAllocator, WgpuCommandList};
use super::surface::WgpuSwapChain;
use crate::sync::lock;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use strata_core::renderer::api::{
    BackendKind, Capabilities, DeviceFlags, SurfaceTarget, SwapChainConfig,
};
use strata_core::renderer::traits::{
    CommandAllocator, CommandList, CommandQueue, NativeDevice, NativeFence, NativeTexture,
    QueueKind, SwapChain,
};
use strata_core::{NativeError, NativeResult};

const FENCE_POLL_INTERVAL: Duration = Duration::from_micros(200);

/// Set once wgpu reports the device as lost.
#[derive(Debug, Clone, Default)]
pub(crate) struct LostFlag(Arc<AtomicBool>);

impl LostFlag {
    pub(crate) fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn check(&self) -> NativeResult<()> {
        if self.0.load(Ordering::Acquire) {
            Err(NativeError::DeviceRemoved("wgpu reported the device as lost".into()))
        } else {
            Ok(())
        }
    }
}

/// A texture created by or presented through a wgpu device.
#[derive(Debug)]
pub enum WgpuTexture {
    /// A texture owned by Strata.
    Owned {
        /// The texture.
        texture: wgpu::Texture,
        /// Default view of the texture.
        view: wgpu::TextureView,
    },
    /// The image currently acquired from a swapchain.
    Surface {
        /// Slot holding the acquired image, shared with the swapchain.
        frame: Arc<Mutex<Option<wgpu::SurfaceTexture>>>,
        /// Image size when the slot was lent out.
        size: (u32, u32),
    },
}

impl WgpuTexture {
    /// Returns a view to render into.
    pub fn view(&self) -> NativeResult<wgpu::TextureView> {
        match self {
            WgpuTexture::Owned { view, .. } => Ok(view.clone()),
            WgpuTexture::Surface { frame, .. } => lock(frame)
                .as_ref()
                .map(|acquired| {
                    acquired
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default())
                })
                .ok_or_else(|| NativeError::Failed("no swapchain image is acquired".into())),
        }
    }
}

impl NativeTexture for WgpuTexture {
    fn size(&self) -> (u32, u32) {
        match self {
            WgpuTexture::Owned { texture, .. } => (texture.width(), texture.height()),
            WgpuTexture::Surface { size, .. } => *size,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A timeline fence emulated with queue completion callbacks.
#[derive(Debug)]
pub struct WgpuFence {
    completed: Arc<AtomicU64>,
    device: wgpu::Device,
    lost: LostFlag,
}

impl WgpuFence {
    pub(crate) fn completion(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.completed)
    }
}

impl NativeFence for WgpuFence {
    fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn wait(&self, value: u64, timeout: Option<Duration>) -> NativeResult<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if self.completed_value() >= value {
                return Ok(());
            }
            self.lost.check()?;
            self.device
                .poll(wgpu::PollType::Poll)
                .map_err(|e| NativeError::Failed(format!("device poll failed: {e}")))?;
            if self.completed_value() >= value {
                return Ok(());
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(NativeError::Timeout);
            }
            thread::sleep(FENCE_POLL_INTERVAL);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One face of the device's single wgpu queue.
#[derive(Debug)]
pub struct WgpuQueue {
    kind: QueueKind,
    queue: wgpu::Queue,
    lost: LostFlag,
}

impl CommandQueue for WgpuQueue {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn execute(&self, list: &mut dyn CommandList) -> NativeResult<()> {
        self.lost.check()?;
        let list = list
            .as_any_mut()
            .downcast_mut::<WgpuCommandList>()
            .ok_or_else(|| NativeError::Failed("command list does not belong to wgpu".into()))?;
        list.submit(&self.queue)
    }

    fn signal(&self, fence: &dyn NativeFence, value: u64) -> NativeResult<()> {
        self.lost.check()?;
        let fence = fence
            .as_any()
            .downcast_ref::<WgpuFence>()
            .ok_or_else(|| NativeError::Failed("fence does not belong to wgpu".into()))?;
        let completed = fence.completion();
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
        Ok(())
    }

    fn wait(&self, _fence: &dyn NativeFence, _value: u64) -> NativeResult<()> {
        // Both queue kinds share one in-order wgpu queue.
        self.lost.check()
    }
}

/// A logical device opened through wgpu.
#[derive(Debug)]
pub struct WgpuDevice {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    copy_queue: Arc<WgpuQueue>,
    direct_queue: Arc<WgpuQueue>,
    capabilities: Capabilities,
    flags: DeviceFlags,
    lost: LostFlag,
}

impl WgpuDevice {
    pub(crate) fn new(
        instance: wgpu::Instance,
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        capabilities: Capabilities,
        flags: DeviceFlags,
    ) -> Self {
        let lost = LostFlag::default();
        {
            let lost = lost.clone();
            device.set_device_lost_callback(move |reason, message| {
                log::error!("wgpu device lost ({reason:?}): {message}");
                lost.mark();
            });
        }
        device.on_uncaptured_error(Arc::new(|e| {
            log::error!("wgpu uncaptured error: {e:?}");
        }));

        let make_queue = |kind| {
            Arc::new(WgpuQueue {
                kind,
                queue: queue.clone(),
                lost: lost.clone(),
            })
        };
        Self {
            copy_queue: make_queue(QueueKind::Copy),
            direct_queue: make_queue(QueueKind::Direct),
            instance,
            adapter,
            device,
            capabilities,
            flags,
            lost,
        }
    }

    /// The underlying wgpu device.
    pub fn wgpu_device(&self) -> &wgpu::Device {
        &self.device
    }

    fn label<'a>(&self, label: &'a str) -> Option<&'a str> {
        self.flags
            .contains(DeviceFlags::DEBUG_MARKERS)
            .then_some(label)
    }
}

impl NativeDevice for WgpuDevice {
    fn backend(&self) -> BackendKind {
        self.capabilities.backend
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn queue(&self, kind: QueueKind) -> Arc<dyn CommandQueue> {
        let queue = match kind {
            QueueKind::Copy => &self.copy_queue,
            QueueKind::Direct => &self.direct_queue,
        };
        Arc::clone(queue) as Arc<dyn CommandQueue>
    }

    fn create_command_allocator(
        &self,
        kind: QueueKind,
    ) -> NativeResult<Box<dyn CommandAllocator>> {
        Ok(Box::new(WgpuCommandAllocator::new(kind)))
    }

    fn create_command_list(
        &self,
        kind: QueueKind,
        allocator: &mut dyn CommandAllocator,
    ) -> NativeResult<Box<dyn CommandList>> {
        self.lost.check()?;
        let mut list = WgpuCommandList::new(
            kind,
            self.device.clone(),
            self.flags.contains(DeviceFlags::DEBUG_MARKERS),
        );
        list.reset(allocator)?;
        Ok(Box::new(list))
    }

    fn create_fence(&self, initial: u64) -> NativeResult<Arc<dyn NativeFence>> {
        Ok(Arc::new(WgpuFence {
            completed: Arc::new(AtomicU64::new(initial)),
            device: self.device.clone(),
            lost: self.lost.clone(),
        }))
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        label: &str,
    ) -> NativeResult<Arc<dyn NativeTexture>> {
        self.lost.check()?;
        let max = self.capabilities.max_texture_dimension;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(NativeError::Failed(format!(
                "texture extent {width}x{height} outside 1..={max}"
            )));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: self.label(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Arc::new(WgpuTexture::Owned { texture, view }))
    }

    fn create_swap_chain(
        &self,
        target: &SurfaceTarget,
        config: &SwapChainConfig,
    ) -> NativeResult<Box<dyn SwapChain>> {
        self.lost.check()?;
        let chain = WgpuSwapChain::new(
            &self.instance,
            &self.adapter,
            self.device.clone(),
            target,
            config,
            self.lost.clone(),
        )?;
        Ok(Box::new(chain))
    }
}
