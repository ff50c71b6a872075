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

//! Swapchains over `wgpu::Surface`.

use super::device::{LostFlag, WgpuTexture};
use crate::sync::lock;
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, Win32WindowHandle, WindowHandle, WindowsDisplayHandle,
};
use std::num::NonZeroIsize;
use std::sync::{Arc, Mutex};
use strata_core::renderer::api::{SurfaceTarget, SwapChainConfig};
use strata_core::renderer::traits::{NativeTexture, SwapChain};
use strata_core::{NativeError, NativeResult};
use wgpu::SurfaceTargetUnsafe;

/// A window owned by the host, described by its raw handles.
struct HostWindow {
    window: RawWindowHandle,
    display: RawDisplayHandle,
}

impl HasWindowHandle for HostWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        // SAFETY: the host keeps the window alive for as long as the surface exists.
        Ok(unsafe { WindowHandle::borrow_raw(self.window) })
    }
}

impl HasDisplayHandle for HostWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        // SAFETY: see `window_handle`.
        Ok(unsafe { DisplayHandle::borrow_raw(self.display) })
    }
}

fn surface_target(target: &SurfaceTarget) -> NativeResult<SurfaceTargetUnsafe> {
    match target {
        SurfaceTarget::Win32Window { hwnd } => {
            let hwnd = NonZeroIsize::new(hwnd.get() as isize)
                .ok_or_else(|| NativeError::Failed("HWND is null".into()))?;
            let window = HostWindow {
                window: RawWindowHandle::Win32(Win32WindowHandle::new(hwnd)),
                display: RawDisplayHandle::Windows(WindowsDisplayHandle::new()),
            };
            // SAFETY: the handles stay valid while the surface lives.
            unsafe { SurfaceTargetUnsafe::from_window(&window) }
                .map_err(|e| NativeError::Failed(format!("Failed to create surface target: {e}")))
        }
        #[cfg(any(target_os = "macos", target_os = "ios"))]
        SurfaceTarget::MetalLayer { layer } => {
            Ok(SurfaceTargetUnsafe::CoreAnimationLayer(layer.as_ptr()))
        }
        #[cfg(not(any(target_os = "macos", target_os = "ios")))]
        SurfaceTarget::MetalLayer { .. } => Err(NativeError::Unsupported(
            "Metal layers can only be presented on Apple platforms".into(),
        )),
        SurfaceTarget::Vulkan { .. } => Err(NativeError::Unsupported(
            "wgpu cannot adopt an existing VkSurfaceKHR".into(),
        )),
    }
}

/// A wgpu surface configured as a swapchain.
///
/// wgpu hands out one image at a time, so every back-buffer texture refers to the
/// same acquisition slot and the index only cycles for bookkeeping.
#[derive(Debug)]
pub struct WgpuSwapChain {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    config: wgpu::SurfaceConfiguration,
    buffer_count: u32,
    frame: Arc<Mutex<Option<wgpu::SurfaceTexture>>>,
    presented: u64,
    tearing_mode: Option<wgpu::PresentMode>,
    vsync_mode: wgpu::PresentMode,
    lost: LostFlag,
}

impl WgpuSwapChain {
    pub(crate) fn new(
        instance: &wgpu::Instance,
        adapter: &wgpu::Adapter,
        device: wgpu::Device,
        target: &SurfaceTarget,
        config: &SwapChainConfig,
        lost: LostFlag,
    ) -> NativeResult<Self> {
        let surface_target = surface_target(target)?;
        // SAFETY: the raw handles come from the host, which keeps them alive.
        let surface = unsafe { instance.create_surface_unsafe(surface_target) }
            .map_err(|e| NativeError::Failed(format!("Failed to create surface: {e}")))?;

        let caps = surface.get_capabilities(adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| {
                NativeError::Unsupported("adapter cannot present to this surface".into())
            })?;
        let tearing_mode = caps
            .present_modes
            .iter()
            .copied()
            .find(|m| *m == wgpu::PresentMode::Immediate);
        if config.allow_tearing && tearing_mode.is_none() {
            log::warn!("Surface does not offer immediate presentation, tearing disabled.");
        }
        let vsync_mode = wgpu::PresentMode::Fifo;
        let present_mode = if config.vsync {
            vsync_mode
        } else {
            caps.present_modes
                .iter()
                .copied()
                .find(|m| *m == wgpu::PresentMode::Mailbox)
                .unwrap_or(vsync_mode)
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: config.width.max(1),
            height: config.height.max(1),
            present_mode,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: config.buffer_count.saturating_sub(1).max(1),
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "wgpu swapchain configured: {}x{} {:?} {:?}",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            surface_config.present_mode
        );

        Ok(Self {
            surface,
            device,
            config: surface_config,
            buffer_count: config.buffer_count,
            frame: Arc::new(Mutex::new(None)),
            presented: 0,
            tearing_mode: tearing_mode.filter(|_| config.allow_tearing),
            vsync_mode: present_mode,
            lost,
        })
    }

    fn surface_error(&self, err: wgpu::SurfaceError) -> NativeError {
        if let Err(lost) = self.lost.check() {
            return lost;
        }
        match err {
            wgpu::SurfaceError::OutOfMemory => {
                NativeError::OutOfMemory("surface image allocation failed".into())
            }
            other => NativeError::Failed(format!("failed to acquire surface image: {other}")),
        }
    }

    fn acquire(&mut self) -> NativeResult<()> {
        if lock(&self.frame).is_some() {
            return Ok(());
        }
        let image = self
            .surface
            .get_current_texture()
            .map_err(|e| self.surface_error(e))?;
        *lock(&self.frame) = Some(image);
        Ok(())
    }
}

impl SwapChain for WgpuSwapChain {
    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn tearing_enabled(&self) -> bool {
        self.tearing_mode.is_some()
    }

    fn current_back_buffer_index(&mut self) -> NativeResult<u32> {
        self.acquire()?;
        Ok((self.presented % u64::from(self.buffer_count)) as u32)
    }

    fn back_buffer(&mut self, index: u32) -> NativeResult<Arc<dyn NativeTexture>> {
        if index >= self.buffer_count {
            return Err(NativeError::Failed(format!(
                "back buffer {index} out of range for {} buffers",
                self.buffer_count
            )));
        }
        Ok(Arc::new(WgpuTexture::Surface {
            frame: Arc::clone(&self.frame),
            size: self.size(),
        }))
    }

    fn resize(&mut self, width: u32, height: u32) -> NativeResult<()> {
        self.lost.check()?;
        // An acquired image must be released before the surface is reconfigured.
        lock(&self.frame).take();
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        Ok(())
    }

    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> NativeResult<()> {
        self.lost.check()?;
        self.acquire()?;
        let image = lock(&self.frame)
            .take()
            .ok_or_else(|| NativeError::Failed("no swapchain image to present".into()))?;
        image.present();
        self.presented += 1;

        // wgpu fixes the present mode at configuration time: the requested
        // interval applies from the next image on.
        let wanted = match self.tearing_mode {
            Some(mode) if sync_interval == 0 && allow_tearing => mode,
            _ => self.vsync_mode,
        };
        if wanted != self.config.present_mode {
            self.config.present_mode = wanted;
            self.surface.configure(&self.device, &self.config);
        }
        self.lost.check()
    }
}
