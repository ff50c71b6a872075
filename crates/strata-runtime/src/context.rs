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

//! Contexts: the per-frame state machine.
//!
//! A [`Context`] records frames for one device. Null-device contexts draw into
//! a CPU framebuffer; native contexts own the render engine's context, a pair
//! of command lists and the fences bridging the copy and direct queues.
//! A context with a [`crate::Surface`] attached renders into the surface's
//! current back buffer, borrowing its render target for the duration of the
//! frame.

use crate::device::{Device, DeviceBinding};
use crate::frame::{CommandSet, FrameClock, FramePhase, FrameSync};
use crate::handle::{Handle, HandleKind, Retained};
use crate::surface::Presentation;
use crate::sync::lock;
use std::sync::{Arc, Mutex};
use strata_core::renderer::api::{BackendKind, FlushTag, FrameDescriptor, FrameOptions};
use strata_core::renderer::traits::{
    CommandQueue, FlushResources, NativeDevice, QueueKind, RenderContext, RenderEngine,
    RenderTarget,
};
use strata_core::{GpuError, GpuResult};

/// The render target a native context draws into.
#[derive(Debug)]
pub(crate) enum TargetSlot {
    /// Offscreen target owned by the context.
    Owned(Arc<dyn RenderTarget>),
    /// Target lent by the attached surface for back buffer `index`.
    Borrowed {
        index: u32,
        target: Arc<dyn RenderTarget>,
    },
}

impl TargetSlot {
    fn target(&self) -> &Arc<dyn RenderTarget> {
        match self {
            TargetSlot::Owned(target) | TargetSlot::Borrowed { target, .. } => target,
        }
    }
}

#[derive(Debug)]
pub(crate) struct NativeContext {
    native: Arc<dyn NativeDevice>,
    pub(crate) render: Box<dyn RenderContext>,
    commands: CommandSet,
    sync: FrameSync,
    pub(crate) target: Option<TargetSlot>,
}

impl NativeContext {
    fn new(native: Arc<dyn NativeDevice>, engine: &dyn RenderEngine) -> GpuResult<Self> {
        let render = engine.create_context(Arc::clone(&native))?;
        let commands = CommandSet::new(native.as_ref())?;
        let sync = FrameSync::new(native.as_ref())?;
        Ok(Self {
            native,
            render,
            commands,
            sync,
            target: None,
        })
    }

    fn ensure_owned_target(&mut self, width: u32, height: u32) -> GpuResult<()> {
        if let Some(TargetSlot::Owned(target)) = &self.target {
            if target.size() == (width, height) {
                return Ok(());
            }
        }
        let target = self.render.make_render_target(width, height, None)?;
        self.target = Some(TargetSlot::Owned(target));
        Ok(())
    }

    fn begin(
        &mut self,
        presentation: Option<&Arc<Mutex<Presentation>>>,
        width: u32,
        height: u32,
        frame_number: u64,
    ) -> GpuResult<(u32, u32)> {
        let (width, height) = match presentation {
            Some(presentation) => {
                let mut presentation = lock(presentation);
                presentation.borrow_current(&mut self.target, self.render.as_mut())?;
                presentation.size()
            }
            None => {
                self.ensure_owned_target(width, height)?;
                (width, height)
            }
        };
        self.commands.reset()?;
        self.render.begin_frame(&FrameDescriptor {
            width,
            height,
            clear_color: 0,
            frame_number,
        })?;
        Ok((width, height))
    }

    fn flush(&mut self, tag: FlushTag) -> GpuResult<()> {
        let NativeContext {
            render,
            commands,
            target,
            ..
        } = self;
        let target = target
            .as_ref()
            .ok_or_else(|| GpuError::internal("render target not initialized"))?
            .target();
        let (copy_list, direct_list) = commands.lists();
        render.flush(FlushResources {
            tag,
            target: target.as_ref(),
            copy_list,
            direct_list,
        })?;
        commands.close()
    }

    fn submit(&mut self, value: u64) -> GpuResult<()> {
        self.sync
            .submit(self.native.as_ref(), &mut self.commands, value)
    }
}

#[derive(Debug)]
enum ContextState {
    Null { framebuffer: Vec<u8> },
    Native(NativeContext),
}

fn allocate_framebuffer(width: u32, height: u32) -> GpuResult<Vec<u8>> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| {
            GpuError::OutOfMemory(format!("{width}x{height} framebuffer is too large"))
        })?;
    let mut framebuffer = Vec::new();
    framebuffer.try_reserve_exact(len).map_err(|_| {
        GpuError::OutOfMemory(format!("cannot allocate a {width}x{height} framebuffer"))
    })?;
    framebuffer.resize(len, 0);
    Ok(framebuffer)
}

/// A rendering context bound to one device.
#[derive(Debug)]
pub struct Context {
    device: Retained<Device>,
    backend: BackendKind,
    width: u32,
    height: u32,
    clock: FrameClock,
    state: ContextState,
    attachment: Option<Arc<Mutex<Presentation>>>,
}

impl HandleKind for Context {
    const KIND: &'static str = "context";

    fn before_release(&self) -> GpuResult<()> {
        if self.attachment.is_some() {
            return Err(GpuError::invalid(
                "context has an active surface; release the surface before the context",
            ));
        }
        Ok(())
    }
}

impl Context {
    /// Creates a `width` x `height` context on `device`.
    ///
    /// Contexts on the null device keep a zeroed RGBA8 framebuffer. Other
    /// devices get a render context from the device's engine.
    pub fn create(device: &Handle<Device>, width: u32, height: u32) -> GpuResult<Handle<Context>> {
        if width == 0 || height == 0 {
            return Err(GpuError::invalid("context dimensions must be non-zero"));
        }
        let edge = Retained::new(device)?;
        let (backend, state) = device.with(|device| {
            let state = match device.binding() {
                DeviceBinding::Null => ContextState::Null {
                    framebuffer: allocate_framebuffer(width, height)?,
                },
                _ => {
                    let native = Arc::clone(device.native()?);
                    let engine = device
                        .engine()
                        .ok_or_else(|| GpuError::internal("device has no render engine"))?;
                    ContextState::Native(NativeContext::new(native, engine.as_ref())?)
                }
            };
            Ok((device.backend(), state))
        })?;
        log::info!("Created {backend} context ({width}x{height})");
        Ok(Handle::new(Context {
            device: edge,
            backend,
            width,
            height,
            clock: FrameClock::new(),
            state,
            attachment: None,
        }))
    }

    /// The owning device.
    pub fn device(&self) -> &Handle<Device> {
        self.device.handle()
    }

    /// Backend of the owning device.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Current size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Frame counters and phase.
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Returns `true` while a surface is attached.
    pub fn has_surface(&self) -> bool {
        self.attachment.is_some()
    }

    /// The engine's render context. Null-device contexts have none.
    pub fn render_context(&mut self) -> GpuResult<&mut dyn RenderContext> {
        match &mut self.state {
            ContextState::Native(native) => Ok(native.render.as_mut()),
            ContextState::Null { .. } => Err(GpuError::unsupported(
                "context has no render context on the null backend",
            )),
        }
    }

    pub(crate) fn native(&mut self) -> GpuResult<&mut NativeContext> {
        match &mut self.state {
            ContextState::Native(native) => Ok(native),
            ContextState::Null { .. } => Err(GpuError::unsupported(
                "context has no native state on the null backend",
            )),
        }
    }

    /// Queue used for fence signals issued through this context.
    pub(crate) fn signal_queue(&self) -> Option<Arc<dyn CommandQueue>> {
        match &self.state {
            ContextState::Native(native) => Some(native.native.queue(QueueKind::Direct)),
            ContextState::Null { .. } => None,
        }
    }

    /// Starts a frame.
    ///
    /// Zero dimensions in `options` fall back to the current size. With a
    /// surface attached the frame renders into the current back buffer and
    /// takes the surface's size.
    pub fn begin_frame(&mut self, options: &FrameOptions) -> GpuResult<()> {
        self.clock.check_begin()?;
        let width = if options.width != 0 { options.width } else { self.width };
        let height = if options.height != 0 { options.height } else { self.height };
        if width == 0 || height == 0 {
            return Err(GpuError::invalid("frame dimensions must be non-zero"));
        }
        let frame_number = self.clock.frame_counter();

        let (width, height) = match &mut self.state {
            ContextState::Null { framebuffer } => {
                let required = width as usize * height as usize * 4;
                if framebuffer.len() == required {
                    framebuffer.fill(0);
                } else {
                    *framebuffer = allocate_framebuffer(width, height)?;
                }
                (width, height)
            }
            ContextState::Native(native) => {
                native.begin(self.attachment.as_ref(), width, height, frame_number)?
            }
        };

        self.width = width;
        self.height = height;
        self.clock.mark_active();
        log::debug!("Began frame {frame_number} ({width}x{height})");
        Ok(())
    }

    /// Flushes the frame's work into the command lists and closes them.
    pub fn end_frame(&mut self) -> GpuResult<()> {
        self.clock.check_end()?;
        if let ContextState::Native(native) = &mut self.state {
            native.flush(self.clock.flush_tag())?;
        }
        self.clock.mark_ended();
        log::debug!("Ended frame {}", self.clock.frame_counter());
        Ok(())
    }

    /// Executes the ended frame and waits for the GPU to finish it.
    pub fn submit(&mut self) -> GpuResult<()> {
        self.clock.check_submit()?;
        let frame = self.clock.frame_counter();
        if let ContextState::Native(native) = &mut self.state {
            if let Err(err) = native.submit(frame) {
                if err.is_device_lost() {
                    log::error!("Device lost while submitting frame {frame}: {err}");
                }
                return Err(err);
            }
        }
        self.clock.complete();
        if let ContextState::Native(native) = &mut self.state {
            native.commands.reset()?;
        }
        log::debug!("Submitted frame {frame}");
        Ok(())
    }

    /// Changes the size used by frames without explicit dimensions.
    pub fn resize(&mut self, width: u32, height: u32) -> GpuResult<()> {
        if width == 0 || height == 0 {
            return Err(GpuError::invalid("context dimensions must be non-zero"));
        }
        if self.clock.phase() == FramePhase::Active {
            return Err(GpuError::invalid("cannot resize the context while a frame is active"));
        }
        match &mut self.state {
            ContextState::Null { framebuffer } => {
                *framebuffer = allocate_framebuffer(width, height)?;
            }
            ContextState::Native(native) => {
                if matches!(native.target, Some(TargetSlot::Owned(_))) {
                    native.target = None;
                }
            }
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Copies the CPU framebuffer of a null-device context into `out`.
    ///
    /// ## Returns
    /// The number of bytes copied.
    pub fn copy_cpu_framebuffer(&self, out: &mut [u8]) -> GpuResult<usize> {
        match &self.state {
            ContextState::Null { framebuffer } => {
                if out.len() < framebuffer.len() {
                    return Err(GpuError::invalid(format!(
                        "framebuffer needs {} bytes, buffer holds {}",
                        framebuffer.len(),
                        out.len()
                    )));
                }
                out[..framebuffer.len()].copy_from_slice(framebuffer);
                Ok(framebuffer.len())
            }
            ContextState::Native(_) => Err(GpuError::unsupported(
                "CPU framebuffer is only available on the null backend",
            )),
        }
    }

    /// Size in bytes of the CPU framebuffer, if this is a null-device context.
    pub fn cpu_framebuffer_len(&self) -> Option<usize> {
        match &self.state {
            ContextState::Null { framebuffer } => Some(framebuffer.len()),
            ContextState::Native(_) => None,
        }
    }

    pub(crate) fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub(crate) fn attach(
        &mut self,
        presentation: Arc<Mutex<Presentation>>,
        width: u32,
        height: u32,
    ) -> GpuResult<()> {
        if self.attachment.is_some() {
            return Err(GpuError::invalid("context already has an attached surface"));
        }
        let native = self.native()?;
        if matches!(native.target, Some(TargetSlot::Owned(_))) {
            native.target = None;
        }
        self.attachment = Some(presentation);
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub(crate) fn detach(&mut self, presentation: &Arc<Mutex<Presentation>>) {
        let attached = self
            .attachment
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, presentation));
        if !attached {
            return;
        }
        self.return_target(&mut lock(presentation));
        self.attachment = None;
    }

    /// Hands a borrowed back buffer target back to `presentation`.
    pub(crate) fn return_target(&mut self, presentation: &mut Presentation) {
        if let ContextState::Native(native) = &mut self.state {
            presentation.give_back(&mut native.target);
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        log::info!(
            "Destroying {} context after {} frame(s)",
            self.backend,
            self.clock.last_completed()
        );
    }
}

impl Handle<Context> {
    /// Current size.
    pub fn size(&self) -> GpuResult<(u32, u32)> {
        self.with(|context| Ok(context.size()))
    }

    /// See [`Context::resize`].
    pub fn resize(&self, width: u32, height: u32) -> GpuResult<()> {
        self.with(|context| context.resize(width, height))
    }

    /// See [`Context::begin_frame`].
    pub fn begin_frame(&self, options: &FrameOptions) -> GpuResult<()> {
        self.with(|context| context.begin_frame(options))
    }

    /// See [`Context::end_frame`].
    pub fn end_frame(&self) -> GpuResult<()> {
        self.with(|context| context.end_frame())
    }

    /// See [`Context::submit`].
    pub fn submit(&self) -> GpuResult<()> {
        self.with(|context| context.submit())
    }

    /// Snapshot of the frame counters and phase.
    pub fn clock(&self) -> GpuResult<FrameClock> {
        self.with(|context| Ok(context.clock().clone()))
    }

    /// See [`Context::copy_cpu_framebuffer`].
    pub fn copy_cpu_framebuffer(&self, out: &mut [u8]) -> GpuResult<usize> {
        self.with(|context| context.copy_cpu_framebuffer(out))
    }

    /// The owning device.
    pub fn device(&self) -> GpuResult<Handle<Device>> {
        self.with(|context| Ok(context.device().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_context(width: u32, height: u32) -> Handle<Context> {
        let device = Handle::new(Device::null());
        let context = Context::create(&device, width, height).unwrap();
        device.release().unwrap();
        context
    }

    #[test]
    fn zero_sized_contexts_are_rejected() {
        let device = Handle::new(Device::null());
        let err = Context::create(&device, 0, 16).unwrap_err();
        assert!(matches!(err, GpuError::InvalidParameter(_)));
        assert_eq!(device.ref_count(), 1);
    }

    #[test]
    fn context_keeps_its_device_alive() {
        let device = Handle::new(Device::null());
        let context = Context::create(&device, 8, 8).unwrap();
        assert_eq!(device.ref_count(), 2);

        device.release().unwrap();
        assert!(device.is_alive());
        context.release().unwrap();
        assert!(!device.is_alive());
    }

    #[test]
    fn null_frames_clear_the_framebuffer() {
        let context = null_context(4, 2);
        let mut pixels = vec![0xffu8; 32];
        assert_eq!(context.copy_cpu_framebuffer(&mut pixels).unwrap(), 32);
        assert!(pixels.iter().all(|byte| *byte == 0));

        let mut small = vec![0u8; 31];
        assert!(matches!(
            context.copy_cpu_framebuffer(&mut small),
            Err(GpuError::InvalidParameter(_))
        ));
    }

    #[test]
    fn frame_options_override_the_size() {
        let context = null_context(16, 16);
        context.begin_frame(&FrameOptions::sized(32, 0)).unwrap();
        assert_eq!(context.size().unwrap(), (32, 16));
        context.end_frame().unwrap();
        context.submit().unwrap();

        let mut pixels = vec![0u8; 32 * 16 * 4];
        assert_eq!(context.copy_cpu_framebuffer(&mut pixels).unwrap(), pixels.len());
    }

    #[test]
    fn resize_is_rejected_during_a_frame() {
        let context = null_context(16, 16);
        context.begin_frame(&FrameOptions::default()).unwrap();
        assert!(context.resize(8, 8).is_err());
        context.end_frame().unwrap();
        context.submit().unwrap();

        context.resize(8, 8).unwrap();
        assert_eq!(context.size().unwrap(), (8, 8));
        assert!(matches!(context.resize(0, 8), Err(GpuError::InvalidParameter(_))));
    }

    #[test]
    fn null_contexts_have_no_render_context() {
        let context = null_context(4, 4);
        let err = context
            .with(|context| context.render_context().map(|_| ()))
            .unwrap_err();
        assert!(matches!(err, GpuError::Unsupported(_)));
    }
}
