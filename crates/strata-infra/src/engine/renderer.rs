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

//! Draw recording.

use super::paint::RecordingPaint;
use super::path::RecordingPath;
use crate::sync::lock;
use bytemuck::{Pod, Zeroable};
use std::sync::{Arc, Mutex};
use strata_core::renderer::api::{BlendMode, FrameDescriptor, ImageSampler, Mat2D};
use strata_core::renderer::traits::{ImageMesh, RenderImage, RenderPaint, RenderPath, Renderer};
use strata_core::{GpuError, GpuResult};

/// Kind tag stored in [`DrawRecord::kind`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawKind {
    /// A filled or stroked path.
    Path = 0,
    /// A clip path.
    Clip = 1,
    /// An image quad.
    Image = 2,
    /// A textured mesh.
    Mesh = 3,
}

/// GPU-facing summary of one draw, uploaded through the copy queue.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawRecord {
    /// [`DrawKind`] as its raw value.
    pub kind: u32,
    /// Verb, vertex or index count depending on the kind.
    pub count: u32,
    /// Transform active when the draw was recorded.
    pub transform: Mat2D,
    /// Paint color, or opacity in the alpha byte for images.
    pub color: u32,
    /// Blend mode raw value.
    pub blend_mode: u32,
}

impl DrawRecord {
    fn new(kind: DrawKind, count: u32, transform: Mat2D, color: u32, blend: BlendMode) -> Self {
        Self {
            kind: kind as u32,
            count,
            transform,
            color,
            blend_mode: u32::from(blend.as_raw()),
        }
    }
}

/// The frame being recorded by a context and its renderers.
#[derive(Debug, Default)]
pub(crate) struct FrameRecording {
    pub(crate) frame: Option<FrameDescriptor>,
    pub(crate) draws: Vec<DrawRecord>,
}

pub(crate) type SharedRecording = Arc<Mutex<FrameRecording>>;

fn opacity_alpha(opacity: f32) -> u32 {
    ((opacity.clamp(0.0, 1.0) * 255.0).round() as u32) << 24
}

/// Records draws into the frame of the context that created it.
#[derive(Debug)]
pub struct RecordingRenderer {
    recording: SharedRecording,
    transform: Mat2D,
    saved: Vec<Mat2D>,
}

impl RecordingRenderer {
    pub(crate) fn new(recording: SharedRecording) -> Self {
        Self {
            recording,
            transform: Mat2D::IDENTITY,
            saved: Vec::new(),
        }
    }

    fn push(&self, record: DrawRecord) {
        lock(&self.recording).draws.push(record);
    }
}

fn recorded_path(path: &dyn RenderPath) -> GpuResult<&RecordingPath> {
    path.as_any()
        .downcast_ref::<RecordingPath>()
        .ok_or_else(|| GpuError::internal("path was not created by the recording engine"))
}

impl Renderer for RecordingRenderer {
    fn save(&mut self) {
        self.saved.push(self.transform);
    }

    fn restore(&mut self) {
        match self.saved.pop() {
            Some(transform) => self.transform = transform,
            None => log::warn!("Renderer restore without a matching save."),
        }
    }

    fn transform(&mut self, transform: &Mat2D) {
        self.transform = self.transform.multiply(transform);
    }

    fn draw_path(&mut self, path: &dyn RenderPath, paint: &dyn RenderPaint) -> GpuResult<()> {
        let path = recorded_path(path)?;
        let paint = paint
            .as_any()
            .downcast_ref::<RecordingPaint>()
            .ok_or_else(|| GpuError::internal("paint was not created by the recording engine"))?;
        self.push(DrawRecord::new(
            DrawKind::Path,
            path.verbs().len() as u32,
            self.transform,
            paint.color,
            paint.blend_mode,
        ));
        Ok(())
    }

    fn clip_path(&mut self, path: &dyn RenderPath) -> GpuResult<()> {
        let path = recorded_path(path)?;
        self.push(DrawRecord::new(
            DrawKind::Clip,
            path.verbs().len() as u32,
            self.transform,
            0,
            BlendMode::SrcOver,
        ));
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &dyn RenderImage,
        _sampler: ImageSampler,
        blend_mode: BlendMode,
        opacity: f32,
    ) -> GpuResult<()> {
        let (width, height) = image.size();
        self.push(DrawRecord::new(
            DrawKind::Image,
            width.saturating_mul(height),
            self.transform,
            opacity_alpha(opacity),
            blend_mode,
        ));
        Ok(())
    }

    fn draw_image_mesh(&mut self, mesh: ImageMesh<'_>) -> GpuResult<()> {
        if mesh.vertices.size() < mesh.vertex_count as usize * 8 {
            return Err(GpuError::invalid(format!(
                "vertex buffer holds fewer than {} vertices",
                mesh.vertex_count
            )));
        }
        if mesh.indices.size() < mesh.index_count as usize * 2 {
            return Err(GpuError::invalid(format!(
                "index buffer holds fewer than {} indices",
                mesh.index_count
            )));
        }
        self.push(DrawRecord::new(
            DrawKind::Mesh,
            mesh.index_count,
            self.transform,
            opacity_alpha(mesh.opacity),
            mesh.blend_mode,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::api::FillRule;

    #[test]
    fn draw_records_have_a_stable_layout() {
        assert_eq!(std::mem::size_of::<DrawRecord>(), 40);
    }

    #[test]
    fn save_and_restore_scope_transforms() {
        let recording = SharedRecording::default();
        let mut renderer = RecordingRenderer::new(Arc::clone(&recording));
        let mut path = RecordingPath::new(FillRule::NonZero);
        path.move_to(0.0, 0.0);
        let paint = RecordingPaint::default();

        renderer.save();
        renderer.transform(&Mat2D::translation(3.0, 4.0));
        renderer.draw_path(&path, &paint).unwrap();
        renderer.restore();
        renderer.draw_path(&path, &paint).unwrap();

        let recorded = lock(&recording);
        let draws = &recorded.draws;
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].transform, Mat2D::translation(3.0, 4.0));
        assert_eq!(draws[1].transform, Mat2D::IDENTITY);
        assert_eq!(draws[0].count, 1);
    }
}
