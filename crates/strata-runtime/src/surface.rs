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

//! Presentable surfaces.
//!
//! A [`Surface`] owns a native swapchain and one render target per back
//! buffer. The attached [`Context`] borrows the target of the current back
//! buffer while it records a frame; `present` and `resize` take it back
//! before touching the swapchain.

use crate::config::RuntimeConfig;
use crate::context::{Context, TargetSlot};
use crate::device::Device;
use crate::frame::FramePhase;
use crate::handle::{Handle, HandleKind, Retained};
use crate::sync::lock;
use std::sync::{Arc, Mutex};
use strata_core::renderer::api::{
    BackendKind, PresentFlags, SurfaceDescriptor, SurfaceFlags, SurfaceTarget, SwapChainConfig,
    NO_BORROWED_BUFFER,
};
use strata_core::renderer::traits::{RenderContext, RenderTarget, SwapChain};
use strata_core::{GpuError, GpuResult, NativeError};

/// Device loss keeps its status, every other swapchain failure is internal.
fn swap_chain_error(err: NativeError) -> GpuError {
    if err.is_device_loss() {
        GpuError::from(err)
    } else {
        GpuError::internal(err.to_string())
    }
}

/// Swapchain state shared between a surface and its context.
#[derive(Debug)]
pub(crate) struct Presentation {
    swap_chain: Box<dyn SwapChain>,
    targets: Vec<Option<Arc<dyn RenderTarget>>>,
    borrowed: u32,
    width: u32,
    height: u32,
    present_interval: u32,
    allow_tearing: bool,
    vsync: bool,
}

impl Presentation {
    fn new(
        swap_chain: Box<dyn SwapChain>,
        present_interval: u32,
        allow_tearing: bool,
        vsync: bool,
    ) -> Self {
        let (width, height) = swap_chain.size();
        let targets = vec![None; swap_chain.buffer_count() as usize];
        Self {
            swap_chain,
            targets,
            borrowed: NO_BORROWED_BUFFER,
            width,
            height,
            present_interval,
            allow_tearing,
            vsync,
        }
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn target_for(
        &mut self,
        index: u32,
        render: &mut dyn RenderContext,
    ) -> GpuResult<Arc<dyn RenderTarget>> {
        if let Some(target) = self.targets[index as usize].take() {
            return Ok(target);
        }
        let texture = self
            .swap_chain
            .back_buffer(index)
            .map_err(swap_chain_error)?;
        render.make_render_target(self.width, self.height, Some(texture))
    }

    /// Builds a render target for every back buffer.
    fn rebuild_targets(&mut self, render: &mut dyn RenderContext) -> GpuResult<()> {
        for index in 0..self.targets.len() as u32 {
            let target = self.target_for(index, render)?;
            self.targets[index as usize] = Some(target);
        }
        Ok(())
    }

    /// Lends the target of the current back buffer to `slot`.
    ///
    /// A target still held for another index is handed back first. Missing
    /// targets are created on demand.
    pub(crate) fn borrow_current(
        &mut self,
        slot: &mut Option<TargetSlot>,
        render: &mut dyn RenderContext,
    ) -> GpuResult<()> {
        let index = self
            .swap_chain
            .current_back_buffer_index()
            .map_err(swap_chain_error)?;
        if index as usize >= self.targets.len() {
            return Err(GpuError::internal(format!(
                "back buffer index {index} out of range for {} buffers",
                self.targets.len()
            )));
        }
        if let Some(TargetSlot::Borrowed { index: held, .. }) = slot {
            if *held == index {
                return Ok(());
            }
        }
        self.give_back(slot);
        let target = self.target_for(index, render)?;
        *slot = Some(TargetSlot::Borrowed { index, target });
        self.borrowed = index;
        Ok(())
    }

    /// Takes a borrowed target out of `slot` and stores it again.
    pub(crate) fn give_back(&mut self, slot: &mut Option<TargetSlot>) {
        match slot.take() {
            Some(TargetSlot::Borrowed { index, target }) => {
                if let Some(entry) = self.targets.get_mut(index as usize) {
                    *entry = Some(target);
                }
            }
            other => *slot = other,
        }
        self.borrowed = NO_BORROWED_BUFFER;
    }

    fn resize(
        &mut self,
        width: u32,
        height: u32,
        render: &mut dyn RenderContext,
    ) -> GpuResult<()> {
        // Every back buffer reference must be gone before the swapchain resizes.
        self.targets = vec![None; self.swap_chain.buffer_count() as usize];
        self.swap_chain
            .resize(width, height)
            .map_err(swap_chain_error)?;
        self.targets = vec![None; self.swap_chain.buffer_count() as usize];
        self.width = width;
        self.height = height;
        self.rebuild_targets(render)
    }

    fn present(&mut self, interval: u32, flags: PresentFlags) -> GpuResult<()> {
        let tearing =
            flags.contains(PresentFlags::ALLOW_TEARING) && self.allow_tearing && interval == 0;
        let sync_interval = match (tearing, interval) {
            (true, _) => 0,
            (false, 0) => self.present_interval,
            (false, interval) => interval,
        };
        self.swap_chain
            .present(sync_interval, tearing)
            .map_err(swap_chain_error)
    }
}

/// A swapchain bound to one device and one context.
#[derive(Debug)]
pub struct Surface {
    device: Retained<Device>,
    context: Retained<Context>,
    backend: BackendKind,
    presentation: Arc<Mutex<Presentation>>,
}

impl HandleKind for Surface {
    const KIND: &'static str = "surface";
}

fn check_target(target: &SurfaceTarget, backend: BackendKind) -> GpuResult<()> {
    match (target, backend) {
        (SurfaceTarget::Win32Window { .. }, BackendKind::D3d12)
        | (SurfaceTarget::MetalLayer { .. }, BackendKind::Metal) => Ok(()),
        (SurfaceTarget::Vulkan { .. }, BackendKind::Vulkan) => Err(GpuError::Unimplemented(
            "Vulkan surfaces are not implemented".into(),
        )),
        (target, backend) => Err(GpuError::unsupported(format!(
            "a {backend} device cannot present to a {} target",
            target.backend()
        ))),
    }
}

impl Surface {
    /// Creates a surface presenting `context`'s frames.
    ///
    /// Zero dimensions take the context size. The context is resized to the
    /// surface and renders into its back buffers until the surface is released.
    pub fn create(
        device: &Handle<Device>,
        context: &Handle<Context>,
        descriptor: &SurfaceDescriptor,
        config: &RuntimeConfig,
    ) -> GpuResult<Handle<Surface>> {
        let backend = device.backend()?;
        check_target(&descriptor.target, backend)?;

        let (owner, attached, (context_width, context_height)) =
            context.with(|context| Ok((context.device().clone(), context.has_surface(), context.size())))?;
        if !owner.ptr_eq(device) {
            return Err(GpuError::invalid("context belongs to a different device"));
        }
        if attached {
            return Err(GpuError::invalid("context already has a surface"));
        }

        let native = device.with(|device| Ok(Arc::clone(device.native()?)))?;
        let width = if descriptor.width != 0 { descriptor.width } else { context_width };
        let height = if descriptor.height != 0 { descriptor.height } else { context_height };
        let swap_config = SwapChainConfig {
            width,
            height,
            buffer_count: config.buffer_count(descriptor.buffer_count),
            sample_count: descriptor.sample_count.max(1),
            allow_tearing: descriptor.flags.contains(SurfaceFlags::ALLOW_TEARING),
            vsync: descriptor.flags.contains(SurfaceFlags::ENABLE_VSYNC),
        };
        let swap_chain = native.create_swap_chain(&descriptor.target, &swap_config)?;
        let allow_tearing = swap_chain.tearing_enabled();

        let device_edge = Retained::new(device)?;
        let context_edge = Retained::new(context)?;
        let presentation = Arc::new(Mutex::new(Presentation::new(
            swap_chain,
            config.present_interval(descriptor.present_interval),
            allow_tearing,
            swap_config.vsync,
        )));
        context.with(|context| {
            if context.has_surface() {
                return Err(GpuError::invalid("context already has a surface"));
            }
            lock(&presentation).rebuild_targets(context.render_context()?)?;
            context.attach(Arc::clone(&presentation), width, height)
        })?;

        log::info!(
            "Created {backend} surface ({width}x{height}, {} buffers, tearing {})",
            swap_config.buffer_count,
            if allow_tearing { "on" } else { "off" }
        );
        Ok(Handle::new(Surface {
            device: device_edge,
            context: context_edge,
            backend,
            presentation,
        }))
    }

    /// The owning device.
    pub fn device(&self) -> &Handle<Device> {
        self.device.handle()
    }

    /// The context rendering into this surface.
    pub fn context(&self) -> &Handle<Context> {
        self.context.handle()
    }

    /// Current size.
    pub fn size(&self) -> (u32, u32) {
        lock(&self.presentation).size()
    }

    /// Back buffer currently lent to the context, or [`NO_BORROWED_BUFFER`].
    pub fn borrowed_index(&self) -> u32 {
        lock(&self.presentation).borrowed
    }

    /// Number of swapchain images.
    pub fn buffer_count(&self) -> u32 {
        lock(&self.presentation).targets.len() as u32
    }

    /// Interval used when `present` is called with 0.
    pub fn present_interval(&self) -> u32 {
        lock(&self.presentation).present_interval
    }

    /// Whether tearing was negotiated at creation.
    pub fn allows_tearing(&self) -> bool {
        lock(&self.presentation).allow_tearing
    }

    /// Whether the surface was created with vertical sync requested.
    pub fn vsync(&self) -> bool {
        lock(&self.presentation).vsync
    }

    /// Resizes the swapchain and rebuilds the back buffer targets.
    ///
    /// Rejected while the context has a frame in progress.
    pub fn resize(&mut self, width: u32, height: u32) -> GpuResult<()> {
        if width == 0 || height == 0 {
            return Err(GpuError::invalid("surface dimensions must be non-zero"));
        }
        let presentation = &self.presentation;
        self.context.with(|context| {
            if context.clock().phase() == FramePhase::Active {
                return Err(GpuError::invalid(
                    "cannot resize the surface while a frame is active",
                ));
            }
            let mut presentation = lock(presentation);
            context.return_target(&mut presentation);
            presentation.resize(width, height, context.render_context()?)?;
            context.set_size(width, height);
            Ok(())
        })?;
        log::info!("Resized {} surface to {width}x{height}", self.backend);
        Ok(())
    }

    /// Presents the last submitted frame.
    ///
    /// `interval` 0 uses the surface default. Tearing is used only when
    /// requested in `flags`, negotiated at creation and `interval` is 0.
    pub fn present(&mut self, interval: u32, flags: PresentFlags) -> GpuResult<()> {
        let presentation = &self.presentation;
        let result = self.context.with(|context| {
            context.clock().check_idle("present")?;
            let mut presentation = lock(presentation);
            context.return_target(&mut presentation);
            presentation.present(interval, flags)
        });
        if let Err(err) = &result {
            if err.is_device_lost() {
                log::error!("Device lost while presenting a {} surface: {err}", self.backend);
            }
        }
        result
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        let presentation = &self.presentation;
        let detached = self.context.with(|context| {
            context.detach(presentation);
            Ok(())
        });
        if let Err(err) = detached {
            log::warn!("Could not detach surface from its context: {err}");
        }
        log::info!("Destroying {} surface", self.backend);
    }
}

impl Handle<Surface> {
    /// Current size.
    pub fn size(&self) -> GpuResult<(u32, u32)> {
        self.with(|surface| Ok(surface.size()))
    }

    /// See [`Surface::resize`].
    pub fn resize(&self, width: u32, height: u32) -> GpuResult<()> {
        self.with(|surface| surface.resize(width, height))
    }

    /// See [`Surface::present`].
    pub fn present(&self, interval: u32, flags: PresentFlags) -> GpuResult<()> {
        self.with(|surface| surface.present(interval, flags))
    }

    /// See [`Surface::borrowed_index`].
    pub fn borrowed_index(&self) -> GpuResult<u32> {
        self.with(|surface| Ok(surface.borrowed_index()))
    }
}
