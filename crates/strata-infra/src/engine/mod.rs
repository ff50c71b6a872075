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

//! The recording render engine.
//!
//! A stand-in for a GPU path renderer with the same lifecycle: objects are
//! created by a per-device [`RecordingContext`], draws are recorded between
//! `begin_frame` and `flush`, and `flush` encodes the frame into the command
//! lists it is given: the draw records go to the copy list as an upload and a
//! render pass that clears and draws the target goes to the direct list.
//! Per-frame staging is retained until the frame is known to be complete.

mod paint;
mod path;
mod renderer;
mod resources;

pub use self::paint::RecordingPaint;
pub use self::path::{PathVerb, RecordingPath};
pub use self::renderer::{DrawKind, DrawRecord, RecordingRenderer};
pub use self::resources::{
    Gradient, GradientShape, RecordingBuffer, RecordingFont, RecordingImage, RecordingTarget,
};

use self::renderer::SharedRecording;
use crate::sync::lock;
use std::collections::VecDeque;
use std::sync::Arc;
use strata_core::renderer::api::{
    BufferFlags, BufferKind, FillRule, FrameDescriptor, GradientStop,
};
use strata_core::renderer::traits::{
    EncodedWork, Font, FlushResources, LoadAction, NativeDevice, NativeTexture, RenderBuffer,
    RenderContext, RenderEngine, RenderImage, RenderPaint, RenderPath, RenderShader,
    RenderTarget, Renderer,
};
use strata_core::{GpuError, GpuResult};

/// Engine creating [`RecordingContext`]s.
#[derive(Debug, Default)]
pub struct RecordingEngine;

impl RecordingEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

impl RenderEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn create_context(&self, device: Arc<dyn NativeDevice>) -> GpuResult<Box<dyn RenderContext>> {
        log::debug!("Creating recording render context on {}", device.backend());
        Ok(Box::new(RecordingContext::new(device)))
    }
}

/// Staging memory of one flushed frame.
#[derive(Debug)]
struct RetiredFrame {
    frame: u64,
    _records: Vec<DrawRecord>,
}

/// Per-device state of the recording engine.
#[derive(Debug)]
pub struct RecordingContext {
    device: Arc<dyn NativeDevice>,
    recording: SharedRecording,
    retired: VecDeque<RetiredFrame>,
    flushed: u64,
}

impl RecordingContext {
    /// Creates a context drawing with `device`.
    pub fn new(device: Arc<dyn NativeDevice>) -> Self {
        Self {
            device,
            recording: SharedRecording::default(),
            retired: VecDeque::new(),
            flushed: 0,
        }
    }

    /// Frames flushed so far.
    pub fn flushed_frames(&self) -> u64 {
        self.flushed
    }

    /// Frames whose staging memory may still be read by the GPU.
    pub fn frames_in_flight(&self) -> usize {
        self.retired.len()
    }

    fn recycle(&mut self, safe_frame: u64) {
        while self
            .retired
            .front()
            .is_some_and(|retired| retired.frame <= safe_frame)
        {
            self.retired.pop_front();
        }
    }
}

impl RenderContext for RecordingContext {
    fn make_render_target(
        &mut self,
        width: u32,
        height: u32,
        texture: Option<Arc<dyn NativeTexture>>,
    ) -> GpuResult<Arc<dyn RenderTarget>> {
        if width == 0 || height == 0 {
            return Err(GpuError::invalid(format!(
                "render target size {width}x{height} is empty"
            )));
        }
        let texture = match texture {
            Some(texture) => texture,
            None => self
                .device
                .create_texture(width, height, "Strata offscreen target")?,
        };
        Ok(Arc::new(RecordingTarget {
            width,
            height,
            texture: Some(texture),
        }))
    }

    fn begin_frame(&mut self, frame: &FrameDescriptor) -> GpuResult<()> {
        let mut recording = lock(&self.recording);
        recording.frame = Some(*frame);
        recording.draws.clear();
        Ok(())
    }

    fn flush(&mut self, mut resources: FlushResources<'_>) -> GpuResult<()> {
        let (frame, records) = {
            let mut recording = lock(&self.recording);
            let frame = recording
                .frame
                .take()
                .ok_or_else(|| GpuError::invalid("flush without a begun frame"))?;
            (frame, std::mem::take(&mut recording.draws))
        };

        resources.copy_list.encode(&EncodedWork::Upload {
            label: "Strata draw records",
            bytes: bytemuck::cast_slice(&records),
        })?;
        let texture = resources.target.texture();
        resources.direct_list.encode(&EncodedWork::RenderPass {
            label: "Strata frame",
            target: texture.as_deref(),
            load: LoadAction::Clear(frame.clear_color),
            draw_count: records.len() as u32,
        })?;

        self.flushed += 1;
        self.retired.push_back(RetiredFrame {
            frame: resources.tag.current_frame,
            _records: records,
        });
        self.recycle(resources.tag.safe_frame);
        log::trace!(
            "Flushed frame {} ({} in flight)",
            resources.tag.current_frame,
            self.retired.len()
        );
        Ok(())
    }

    fn make_path(&mut self, fill_rule: FillRule) -> GpuResult<Box<dyn RenderPath>> {
        Ok(Box::new(RecordingPath::new(fill_rule)))
    }

    fn make_paint(&mut self) -> GpuResult<Box<dyn RenderPaint>> {
        Ok(Box::new(RecordingPaint::default()))
    }

    fn make_renderer(&mut self) -> GpuResult<Box<dyn Renderer>> {
        Ok(Box::new(RecordingRenderer::new(Arc::clone(&self.recording))))
    }

    fn make_buffer(
        &mut self,
        kind: BufferKind,
        flags: BufferFlags,
        size: usize,
    ) -> GpuResult<Box<dyn RenderBuffer>> {
        let max = self.device.capabilities().max_buffer_size;
        if size as u64 > max {
            return Err(GpuError::OutOfMemory(format!(
                "buffer of {size} bytes exceeds the device limit of {max}"
            )));
        }
        Ok(Box::new(RecordingBuffer::new(kind, flags, size)))
    }

    fn decode_image(&mut self, bytes: &[u8]) -> GpuResult<Arc<dyn RenderImage>> {
        Ok(Arc::new(RecordingImage::decode(bytes)?))
    }

    fn decode_font(&mut self, bytes: &[u8]) -> GpuResult<Arc<dyn Font>> {
        Ok(Arc::new(RecordingFont::decode(bytes)?))
    }

    fn make_linear_gradient(
        &mut self,
        start: (f32, f32),
        end: (f32, f32),
        stops: &[GradientStop],
    ) -> GpuResult<Arc<dyn RenderShader>> {
        Ok(Arc::new(Gradient::new(
            GradientShape::Linear { start, end },
            stops,
        )?))
    }

    fn make_radial_gradient(
        &mut self,
        center: (f32, f32),
        radius: f32,
        stops: &[GradientStop],
    ) -> GpuResult<Arc<dyn RenderShader>> {
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(GpuError::invalid("gradient radius must be finite and non-negative"));
        }
        Ok(Arc::new(Gradient::new(
            GradientShape::Radial { center, radius },
            stops,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::soft::{JournalEntry, SoftApi};
    use strata_core::renderer::api::{BackendKind, DeviceFlags, FlushTag, TextStyle};
    use strata_core::renderer::traits::{NativeApi, QueueKind};

    fn context() -> (SoftApi, RecordingContext) {
        let api = SoftApi::new(BackendKind::D3d12);
        let adapter = api.enumerate_adapters().unwrap().remove(0);
        let device = api.open_device(&adapter, DeviceFlags::NONE).unwrap();
        (api, RecordingContext::new(device))
    }

    fn frame(number: u64) -> FrameDescriptor {
        FrameDescriptor {
            width: 16,
            height: 16,
            clear_color: 0xff000000,
            frame_number: number,
        }
    }

    #[test]
    fn flush_encodes_upload_then_render_pass() {
        let (api, mut ctx) = context();
        let device = Arc::clone(&ctx.device);
        let target = ctx.make_render_target(16, 16, None).unwrap();
        let mut copy_alloc = device.create_command_allocator(QueueKind::Copy).unwrap();
        let mut direct_alloc = device.create_command_allocator(QueueKind::Direct).unwrap();
        let mut copy = device
            .create_command_list(QueueKind::Copy, copy_alloc.as_mut())
            .unwrap();
        let mut direct = device
            .create_command_list(QueueKind::Direct, direct_alloc.as_mut())
            .unwrap();

        ctx.begin_frame(&frame(1)).unwrap();
        let mut renderer = ctx.make_renderer().unwrap();
        let path = ctx.make_path(FillRule::NonZero).unwrap();
        let paint = ctx.make_paint().unwrap();
        renderer.draw_path(path.as_ref(), paint.as_ref()).unwrap();

        ctx.flush(FlushResources {
            tag: FlushTag {
                current_frame: 1,
                safe_frame: 0,
            },
            target: target.as_ref(),
            copy_list: copy.as_mut(),
            direct_list: direct.as_mut(),
        })
        .unwrap();

        let encoded: Vec<_> = api
            .journal()
            .entries()
            .into_iter()
            .filter_map(|entry| match entry {
                JournalEntry::Encoded { queue, label } => Some((queue, label)),
                _ => None,
            })
            .collect();
        assert_eq!(
            encoded,
            vec![
                (QueueKind::Copy, "Strata draw records".to_string()),
                (QueueKind::Direct, "Strata frame".to_string()),
            ]
        );
        assert_eq!(ctx.flushed_frames(), 1);
    }

    #[test]
    fn staging_is_recycled_once_frames_complete() {
        let (_api, mut ctx) = context();
        let device = Arc::clone(&ctx.device);
        let target = ctx.make_render_target(16, 16, None).unwrap();
        let mut alloc = device.create_command_allocator(QueueKind::Direct).unwrap();
        let mut copy_alloc = device.create_command_allocator(QueueKind::Copy).unwrap();

        for number in 1..=3u64 {
            let mut copy = device
                .create_command_list(QueueKind::Copy, copy_alloc.as_mut())
                .unwrap();
            let mut direct = device
                .create_command_list(QueueKind::Direct, alloc.as_mut())
                .unwrap();
            ctx.begin_frame(&frame(number)).unwrap();
            ctx.flush(FlushResources {
                tag: FlushTag {
                    current_frame: number,
                    safe_frame: number - 1,
                },
                target: target.as_ref(),
                copy_list: copy.as_mut(),
                direct_list: direct.as_mut(),
            })
            .unwrap();
            assert_eq!(ctx.frames_in_flight(), 1);
        }
    }

    #[test]
    fn flush_without_begin_is_rejected() {
        let (_api, mut ctx) = context();
        let device = Arc::clone(&ctx.device);
        let target = ctx.make_render_target(4, 4, None).unwrap();
        let mut alloc = device.create_command_allocator(QueueKind::Copy).unwrap();
        let mut copy = device
            .create_command_list(QueueKind::Copy, alloc.as_mut())
            .unwrap();
        let mut direct_alloc = device.create_command_allocator(QueueKind::Direct).unwrap();
        let mut direct = device
            .create_command_list(QueueKind::Direct, direct_alloc.as_mut())
            .unwrap();
        let err = ctx
            .flush(FlushResources {
                tag: FlushTag {
                    current_frame: 1,
                    safe_frame: 0,
                },
                target: target.as_ref(),
                copy_list: copy.as_mut(),
                direct_list: direct.as_mut(),
            })
            .unwrap_err();
        assert!(matches!(err, GpuError::InvalidParameter(_)));
    }

    #[test]
    fn text_shaping_is_not_available() {
        let (_api, mut ctx) = context();
        let font = ctx.decode_font(b"OTTO\0\0\0\0").unwrap();
        let style = TextStyle::normalize(
            12.0,
            0.0,
            0.0,
            0.0,
            0.0,
            Default::default(),
            Default::default(),
            Default::default(),
        )
        .unwrap();
        let err = ctx
            .shape_text(font.as_ref(), "hi", &style, FillRule::NonZero)
            .unwrap_err();
        assert!(matches!(err, GpuError::Unsupported(_)));
    }

    #[test]
    fn oversized_buffers_are_out_of_memory() {
        let (_api, mut ctx) = context();
        let err = ctx
            .make_buffer(BufferKind::Vertex, BufferFlags::NONE, usize::MAX)
            .unwrap_err();
        assert!(matches!(err, GpuError::OutOfMemory(_)));
    }
}
