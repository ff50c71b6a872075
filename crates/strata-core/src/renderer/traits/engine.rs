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

//! Contracts of the wrapped path rendering engine.
//!
//! Strata never rasterizes anything. Drawing objects are created by a
//! [`RenderContext`] and only ever touched through these traits; the engine turns
//! the recorded draws into GPU work when the frame is flushed.

use super::native::{CommandList, NativeDevice, NativeTexture};
use crate::renderer::api::{
    BlendMode, BufferFlags, BufferKind, Color, FillRule, FlushTag, FrameDescriptor, GradientStop,
    ImageSampler, Mat2D, PaintStyle, StrokeCap, StrokeJoin, TextStyle,
};
use crate::renderer::error::{GpuError, GpuResult};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Factory of per-device render contexts.
pub trait RenderEngine: Send + Sync + Debug {
    /// Engine name, for logs.
    fn name(&self) -> &str;

    /// Creates a render context drawing with `device`.
    fn create_context(&self, device: Arc<dyn NativeDevice>) -> GpuResult<Box<dyn RenderContext>>;
}

/// A surface the engine draws into.
pub trait RenderTarget: Send + Sync + Debug {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// The texture backing the target, if any.
    fn texture(&self) -> Option<Arc<dyn NativeTexture>>;
}

/// Everything the engine needs to turn a frame into GPU work.
#[derive(Debug)]
pub struct FlushResources<'a> {
    /// Frame numbers for resource recycling.
    pub tag: FlushTag,
    /// Where the frame is drawn.
    pub target: &'a dyn RenderTarget,
    /// Open list on the copy queue.
    pub copy_list: &'a mut dyn CommandList,
    /// Open list on the direct queue.
    pub direct_list: &'a mut dyn CommandList,
}

/// Per-device engine state.
pub trait RenderContext: Send + Debug {
    /// Wraps `texture`, or a new texture when `None`, as a render target.
    fn make_render_target(
        &mut self,
        width: u32,
        height: u32,
        texture: Option<Arc<dyn NativeTexture>>,
    ) -> GpuResult<Arc<dyn RenderTarget>>;

    /// Starts recording a frame.
    fn begin_frame(&mut self, frame: &FrameDescriptor) -> GpuResult<()>;

    /// Encodes the recorded frame into the supplied command lists.
    fn flush(&mut self, resources: FlushResources<'_>) -> GpuResult<()>;

    /// Creates an empty path.
    fn make_path(&mut self, fill_rule: FillRule) -> GpuResult<Box<dyn RenderPath>>;

    /// Creates a paint with default state.
    fn make_paint(&mut self) -> GpuResult<Box<dyn RenderPaint>>;

    /// Creates a renderer recording into this context's current frame.
    fn make_renderer(&mut self) -> GpuResult<Box<dyn Renderer>>;

    /// Creates a zero-initialized geometry buffer of `size` bytes.
    fn make_buffer(
        &mut self,
        kind: BufferKind,
        flags: BufferFlags,
        size: usize,
    ) -> GpuResult<Box<dyn RenderBuffer>>;

    /// Decodes an encoded image (PNG, JPEG, ...).
    fn decode_image(&mut self, bytes: &[u8]) -> GpuResult<Arc<dyn RenderImage>>;

    /// Decodes a TrueType or OpenType font.
    fn decode_font(&mut self, bytes: &[u8]) -> GpuResult<Arc<dyn Font>>;

    /// Creates a linear gradient between two points.
    fn make_linear_gradient(
        &mut self,
        start: (f32, f32),
        end: (f32, f32),
        stops: &[GradientStop],
    ) -> GpuResult<Arc<dyn RenderShader>>;

    /// Creates a radial gradient.
    fn make_radial_gradient(
        &mut self,
        center: (f32, f32),
        radius: f32,
        stops: &[GradientStop],
    ) -> GpuResult<Arc<dyn RenderShader>>;

    /// Shapes `text` with `font` and returns the glyph outlines as a path.
    ///
    /// Engines built without a text shaper keep the default.
    fn shape_text(
        &mut self,
        font: &dyn Font,
        text: &str,
        style: &TextStyle,
        fill_rule: FillRule,
    ) -> GpuResult<Box<dyn RenderPath>> {
        let _ = (font, text, style, fill_rule);
        Err(GpuError::unsupported("text shaping is not available in this engine"))
    }
}

/// A vector path.
pub trait RenderPath: Send + Debug {
    /// Removes every verb.
    fn rewind(&mut self);

    /// Current fill rule.
    fn fill_rule(&self) -> FillRule;

    /// Changes the fill rule.
    fn set_fill_rule(&mut self, rule: FillRule);

    /// Starts a contour.
    fn move_to(&mut self, x: f32, y: f32);

    /// Adds a line segment.
    fn line_to(&mut self, x: f32, y: f32);

    /// Adds a cubic Bezier segment.
    fn cubic_to(&mut self, ox: f32, oy: f32, ix: f32, iy: f32, x: f32, y: f32);

    /// Closes the current contour.
    fn close(&mut self);

    /// Appends the contours of `other`, mapped through `transform`.
    fn add_path(&mut self, other: &dyn RenderPath, transform: &Mat2D) -> GpuResult<()>;

    /// Returns an independent copy.
    fn duplicate(&self) -> Box<dyn RenderPath>;

    /// Downcasting hook for engine implementations.
    fn as_any(&self) -> &dyn Any;
}

/// Fill or stroke state.
pub trait RenderPaint: Send + Debug {
    /// Fill or stroke.
    fn set_style(&mut self, style: PaintStyle);
    /// Solid color.
    fn set_color(&mut self, color: Color);
    /// Stroke width.
    fn set_thickness(&mut self, thickness: f32);
    /// Stroke join.
    fn set_join(&mut self, join: StrokeJoin);
    /// Stroke cap.
    fn set_cap(&mut self, cap: StrokeCap);
    /// Edge feathering radius.
    fn set_feather(&mut self, feather: f32);
    /// Blend mode.
    fn set_blend_mode(&mut self, mode: BlendMode);
    /// Gradient shader, or `None` for the solid color.
    fn set_shader(&mut self, shader: Option<Arc<dyn RenderShader>>);
    /// Downcasting hook for engine implementations.
    fn as_any(&self) -> &dyn Any;
}

/// Engine-side geometry storage.
pub trait RenderBuffer: Send + Debug {
    /// Index or vertex data.
    fn kind(&self) -> BufferKind;

    /// Size in bytes.
    fn size(&self) -> usize;

    /// CPU-visible contents.
    fn contents_mut(&mut self) -> &mut [u8];

    /// Publishes the CPU-visible contents to the GPU.
    fn commit(&mut self);

    /// Downcasting hook for engine implementations.
    fn as_any(&self) -> &dyn Any;
}

/// A decoded image.
pub trait RenderImage: Send + Sync + Debug {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    /// Downcasting hook for engine implementations.
    fn as_any(&self) -> &dyn Any;
}

/// A decoded font.
pub trait Font: Send + Sync + Debug {
    /// Downcasting hook for engine implementations.
    fn as_any(&self) -> &dyn Any;
}

/// A gradient usable by paints.
pub trait RenderShader: Send + Sync + Debug {
    /// Downcasting hook for engine implementations.
    fn as_any(&self) -> &dyn Any;
}

/// Arguments of [`Renderer::draw_image_mesh`].
#[derive(Debug, Clone, Copy)]
pub struct ImageMesh<'a> {
    /// Texture.
    pub image: &'a dyn RenderImage,
    /// Sampling state.
    pub sampler: ImageSampler,
    /// Vertex positions.
    pub vertices: &'a dyn RenderBuffer,
    /// Texture coordinates.
    pub uvs: &'a dyn RenderBuffer,
    /// Triangle indices.
    pub indices: &'a dyn RenderBuffer,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of indices.
    pub index_count: u32,
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
}

/// Records draws into the current frame of its context.
pub trait Renderer: Send + Debug {
    /// Pushes the transform and clip state.
    fn save(&mut self);

    /// Pops the transform and clip state.
    fn restore(&mut self);

    /// Multiplies the current transform by `transform`.
    fn transform(&mut self, transform: &Mat2D);

    /// Draws `path` with `paint`.
    fn draw_path(&mut self, path: &dyn RenderPath, paint: &dyn RenderPaint) -> GpuResult<()>;

    /// Intersects the clip with `path`.
    fn clip_path(&mut self, path: &dyn RenderPath) -> GpuResult<()>;

    /// Draws `image` in its own coordinate space.
    fn draw_image(
        &mut self,
        image: &dyn RenderImage,
        sampler: ImageSampler,
        blend_mode: BlendMode,
        opacity: f32,
    ) -> GpuResult<()>;

    /// Draws a textured triangle mesh.
    fn draw_image_mesh(&mut self, mesh: ImageMesh<'_>) -> GpuResult<()>;
}
