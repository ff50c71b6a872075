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

//! Engine resources: paths, paints, renderers, buffers, images, fonts and
//! shaders.
//!
//! These handles wrap one object each from the context's render engine. They
//! need a context with a render context; null-device contexts report
//! [`GpuError::Unsupported`].

use crate::context::Context;
use crate::handle::{Handle, HandleKind, Retained};
use std::ptr::NonNull;
use std::sync::Arc;
use strata_core::renderer::api::{
    BlendMode, BufferFlags, BufferKind, Color, FillRule, GradientStop, ImageSampler, MapFlags,
    Mat2D, PaintStyle, StrokeCap, StrokeJoin, TextStyle,
};
use strata_core::renderer::traits::{
    Font as EngineFont, ImageMesh, RenderBuffer, RenderImage, RenderPaint, RenderPath,
    RenderShader, Renderer as EngineRenderer,
};
use strata_core::{GpuError, GpuResult};

macro_rules! resource_kind {
    ($($ty:ident => $kind:literal),* $(,)?) => {
        $(impl HandleKind for $ty {
            const KIND: &'static str = $kind;
        })*
    };
}

resource_kind! {
    Path => "path",
    Paint => "paint",
    Renderer => "renderer",
    Buffer => "buffer",
    Image => "image",
    Font => "font",
    Shader => "shader",
}

/// A vector path.
#[derive(Debug)]
pub struct Path {
    inner: Box<dyn RenderPath>,
}

impl Path {
    /// Creates an empty path.
    pub fn create(context: &Handle<Context>, fill_rule: FillRule) -> GpuResult<Handle<Path>> {
        let inner = context.with(|context| context.render_context()?.make_path(fill_rule))?;
        Ok(Handle::new(Path { inner }))
    }

    /// Shapes `text` with `font` into a new path.
    pub fn from_text(
        context: &Handle<Context>,
        font: &Handle<Font>,
        text: &str,
        style: &TextStyle,
        fill_rule: FillRule,
    ) -> GpuResult<Handle<Path>> {
        if style.size.is_nan() || style.size <= 0.0 {
            return Err(GpuError::invalid("text size must be positive"));
        }
        let font = font.with(|font| Ok(Arc::clone(&font.inner)))?;
        let inner = context.with(|context| {
            context
                .render_context()?
                .shape_text(font.as_ref(), text, style, fill_rule)
        })?;
        Ok(Handle::new(Path { inner }))
    }

    /// The engine path.
    pub fn render_path(&self) -> &dyn RenderPath {
        self.inner.as_ref()
    }
}

impl Handle<Path> {
    /// Removes every segment.
    pub fn rewind(&self) -> GpuResult<()> {
        self.with(|path| {
            path.inner.rewind();
            Ok(())
        })
    }

    /// The fill rule.
    pub fn fill_rule(&self) -> GpuResult<FillRule> {
        self.with(|path| Ok(path.inner.fill_rule()))
    }

    /// Replaces the fill rule.
    pub fn set_fill_rule(&self, rule: FillRule) -> GpuResult<()> {
        self.with(|path| {
            path.inner.set_fill_rule(rule);
            Ok(())
        })
    }

    /// Starts a contour.
    pub fn move_to(&self, x: f32, y: f32) -> GpuResult<()> {
        self.with(|path| {
            path.inner.move_to(x, y);
            Ok(())
        })
    }

    /// Adds a line.
    pub fn line_to(&self, x: f32, y: f32) -> GpuResult<()> {
        self.with(|path| {
            path.inner.line_to(x, y);
            Ok(())
        })
    }

    /// Adds a cubic Bezier segment.
    #[allow(clippy::too_many_arguments)]
    pub fn cubic_to(&self, ox: f32, oy: f32, ix: f32, iy: f32, x: f32, y: f32) -> GpuResult<()> {
        self.with(|path| {
            path.inner.cubic_to(ox, oy, ix, iy, x, y);
            Ok(())
        })
    }

    /// Closes the current contour.
    pub fn close(&self) -> GpuResult<()> {
        self.with(|path| {
            path.inner.close();
            Ok(())
        })
    }

    /// Appends `source`, mapped through `transform` (identity when `None`).
    ///
    /// `source` may be this path.
    pub fn add_path(&self, source: &Handle<Path>, transform: Option<&Mat2D>) -> GpuResult<()> {
        let source = source.with(|source| Ok(source.inner.duplicate()))?;
        let transform = transform.copied().unwrap_or(Mat2D::IDENTITY);
        self.with(|path| path.inner.add_path(source.as_ref(), &transform))
    }
}

/// Fill and stroke state.
#[derive(Debug)]
pub struct Paint {
    inner: Box<dyn RenderPaint>,
}

impl Paint {
    /// Creates a paint with default state.
    pub fn create(context: &Handle<Context>) -> GpuResult<Handle<Paint>> {
        let inner = context.with(|context| context.render_context()?.make_paint())?;
        Ok(Handle::new(Paint { inner }))
    }

    /// The engine paint.
    pub fn render_paint(&self) -> &dyn RenderPaint {
        self.inner.as_ref()
    }
}

impl Handle<Paint> {
    fn update(&self, f: impl FnOnce(&mut dyn RenderPaint)) -> GpuResult<()> {
        self.with(|paint| {
            f(paint.inner.as_mut());
            Ok(())
        })
    }

    /// Fill or stroke.
    pub fn set_style(&self, style: PaintStyle) -> GpuResult<()> {
        self.update(|paint| paint.set_style(style))
    }

    /// Solid color, `0xAARRGGBB`.
    pub fn set_color(&self, color: Color) -> GpuResult<()> {
        self.update(|paint| paint.set_color(color))
    }

    /// Stroke width.
    pub fn set_thickness(&self, thickness: f32) -> GpuResult<()> {
        self.update(|paint| paint.set_thickness(thickness))
    }

    /// Stroke join.
    pub fn set_join(&self, join: StrokeJoin) -> GpuResult<()> {
        self.update(|paint| paint.set_join(join))
    }

    /// Stroke cap.
    pub fn set_cap(&self, cap: StrokeCap) -> GpuResult<()> {
        self.update(|paint| paint.set_cap(cap))
    }

    /// Edge feathering radius.
    pub fn set_feather(&self, feather: f32) -> GpuResult<()> {
        self.update(|paint| paint.set_feather(feather))
    }

    /// Blend mode.
    pub fn set_blend_mode(&self, mode: BlendMode) -> GpuResult<()> {
        self.update(|paint| paint.set_blend_mode(mode))
    }

    /// Sets or clears the shader.
    pub fn set_shader(&self, shader: Option<&Handle<Shader>>) -> GpuResult<()> {
        let shader = shader
            .map(|shader| shader.with(|shader| Ok(Arc::clone(&shader.inner))))
            .transpose()?;
        self.update(|paint| paint.set_shader(shader))
    }
}

/// Records draws into the current frame of a context.
#[derive(Debug)]
pub struct Renderer {
    context: Retained<Context>,
    inner: Box<dyn EngineRenderer>,
}

/// Arguments of [`Handle<Renderer>::draw_image_mesh`].
#[derive(Debug, Clone, Copy)]
pub struct MeshDraw<'a> {
    /// Texture.
    pub image: &'a Handle<Image>,
    /// Sampling state.
    pub sampler: ImageSampler,
    /// Vertex positions. Must be a vertex buffer.
    pub vertices: &'a Handle<Buffer>,
    /// Texture coordinates. Must be a vertex buffer.
    pub uvs: &'a Handle<Buffer>,
    /// Triangle indices. Must be an index buffer.
    pub indices: &'a Handle<Buffer>,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of indices.
    pub index_count: u32,
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
}

impl Renderer {
    /// Creates a renderer for `context`. The renderer keeps the context alive.
    pub fn create(context: &Handle<Context>) -> GpuResult<Handle<Renderer>> {
        let edge = Retained::new(context)?;
        let inner = context.with(|context| context.render_context()?.make_renderer())?;
        Ok(Handle::new(Renderer {
            context: edge,
            inner,
        }))
    }

    /// The context this renderer records into.
    pub fn context(&self) -> &Handle<Context> {
        self.context.handle()
    }
}

fn expect_kind(buffer: &Buffer, kind: BufferKind, role: &str) -> GpuResult<()> {
    if buffer.kind != kind {
        return Err(GpuError::invalid(format!(
            "{role} buffer must be a {kind:?} buffer, got {:?}",
            buffer.kind
        )));
    }
    Ok(())
}

impl Handle<Renderer> {
    /// Pushes the transform and clip state.
    pub fn save(&self) -> GpuResult<()> {
        self.with(|renderer| {
            renderer.inner.save();
            Ok(())
        })
    }

    /// Pops the transform and clip state.
    pub fn restore(&self) -> GpuResult<()> {
        self.with(|renderer| {
            renderer.inner.restore();
            Ok(())
        })
    }

    /// Multiplies the current transform.
    pub fn transform(&self, transform: &Mat2D) -> GpuResult<()> {
        self.with(|renderer| {
            renderer.inner.transform(transform);
            Ok(())
        })
    }

    /// Draws `path` with `paint`.
    pub fn draw_path(&self, path: &Handle<Path>, paint: &Handle<Paint>) -> GpuResult<()> {
        self.with(|renderer| {
            path.with(|path| {
                paint.with(|paint| renderer.inner.draw_path(path.inner.as_ref(), paint.inner.as_ref()))
            })
        })
    }

    /// Intersects the clip with `path`.
    pub fn clip_path(&self, path: &Handle<Path>) -> GpuResult<()> {
        self.with(|renderer| path.with(|path| renderer.inner.clip_path(path.inner.as_ref())))
    }

    /// Draws `image`.
    pub fn draw_image(
        &self,
        image: &Handle<Image>,
        sampler: ImageSampler,
        blend_mode: BlendMode,
        opacity: f32,
    ) -> GpuResult<()> {
        let image = image.with(|image| Ok(Arc::clone(&image.inner)))?;
        self.with(|renderer| {
            renderer
                .inner
                .draw_image(image.as_ref(), sampler, blend_mode, opacity)
        })
    }

    /// Draws a textured triangle mesh.
    pub fn draw_image_mesh(&self, mesh: MeshDraw<'_>) -> GpuResult<()> {
        if mesh.vertex_count == 0 || mesh.index_count == 0 {
            return Err(GpuError::invalid("mesh vertex and index counts must be non-zero"));
        }
        if mesh.indices.ptr_eq(mesh.vertices) || mesh.indices.ptr_eq(mesh.uvs) {
            return Err(GpuError::invalid("index buffer cannot also be a vertex buffer"));
        }
        let image = mesh.image.with(|image| Ok(Arc::clone(&image.inner)))?;

        self.with(|renderer| {
            mesh.indices.with(|indices| {
                expect_kind(indices, BufferKind::Index, "index")?;
                let mut draw = |vertices: &Buffer, uvs: &Buffer| -> GpuResult<()> {
                    expect_kind(vertices, BufferKind::Vertex, "vertex")?;
                    expect_kind(uvs, BufferKind::Vertex, "uv")?;
                    renderer.inner.draw_image_mesh(ImageMesh {
                        image: image.as_ref(),
                        sampler: mesh.sampler,
                        vertices: vertices.inner.as_ref(),
                        uvs: uvs.inner.as_ref(),
                        indices: indices.inner.as_ref(),
                        vertex_count: mesh.vertex_count,
                        index_count: mesh.index_count,
                        blend_mode: mesh.blend_mode,
                        opacity: mesh.opacity,
                    })
                };
                mesh.vertices.with(|vertices| {
                    if mesh.uvs.ptr_eq(mesh.vertices) {
                        draw(&*vertices, &*vertices)
                    } else {
                        mesh.uvs.with(|uvs| draw(&*vertices, &*uvs))
                    }
                })
            })
        })
    }
}

/// A pointer to the contents of a mapped [`Buffer`].
///
/// Valid until the buffer is unmapped or destroyed.
#[derive(Debug, Clone, Copy)]
pub struct MappedRange {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedRange {
    /// First mapped byte.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Number of mapped bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for an empty mapping.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// An index or vertex buffer.
#[derive(Debug)]
pub struct Buffer {
    inner: Box<dyn RenderBuffer>,
    kind: BufferKind,
    mapped: bool,
}

impl Buffer {
    /// Creates a zero-filled buffer of `size` bytes.
    pub fn create(
        context: &Handle<Context>,
        kind: BufferKind,
        flags: BufferFlags,
        size: usize,
    ) -> GpuResult<Handle<Buffer>> {
        if size == 0 {
            return Err(GpuError::invalid("buffer size must be non-zero"));
        }
        let inner =
            context.with(|context| context.render_context()?.make_buffer(kind, flags, size))?;
        Ok(Handle::new(Buffer {
            inner,
            kind,
            mapped: false,
        }))
    }

    /// The engine buffer.
    pub fn render_buffer(&self) -> &dyn RenderBuffer {
        self.inner.as_ref()
    }

    /// Index or vertex.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    /// Returns `true` between `map` and `unmap`.
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    /// Copies `data` to `offset`. Out-of-range writes copy nothing.
    pub fn upload(&mut self, offset: usize, data: &[u8]) -> GpuResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let size = self.size();
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= size)
            .ok_or_else(|| {
                GpuError::invalid(format!(
                    "upload of {} bytes at offset {offset} exceeds buffer size {size}",
                    data.len()
                ))
            })?;
        self.inner.contents_mut()[offset..end].copy_from_slice(data);
        self.inner.commit();
        Ok(())
    }

    /// Maps the whole buffer. Discarded ranges read back as zeros.
    pub fn map(&mut self, flags: MapFlags) -> GpuResult<MappedRange> {
        if self.mapped {
            return Err(GpuError::invalid("buffer is already mapped"));
        }
        let contents = self.inner.contents_mut();
        if flags.contains(MapFlags::DISCARD_RANGE) {
            contents.fill(0);
        }
        let len = contents.len();
        let ptr = NonNull::new(contents.as_mut_ptr())
            .ok_or_else(|| GpuError::internal("buffer has no backing storage"))?;
        self.mapped = true;
        Ok(MappedRange { ptr, len })
    }

    /// The mapped contents.
    pub fn mapped_mut(&mut self) -> GpuResult<&mut [u8]> {
        if !self.mapped {
            return Err(GpuError::invalid("buffer is not mapped"));
        }
        Ok(self.inner.contents_mut())
    }

    /// Ends the mapping and hands the contents to the engine.
    pub fn unmap(&mut self) -> GpuResult<()> {
        if !self.mapped {
            return Err(GpuError::invalid("buffer is not mapped"));
        }
        self.inner.commit();
        self.mapped = false;
        Ok(())
    }
}

impl Handle<Buffer> {
    /// See [`Buffer::upload`].
    pub fn upload(&self, offset: usize, data: &[u8]) -> GpuResult<()> {
        self.with(|buffer| buffer.upload(offset, data))
    }

    /// See [`Buffer::map`].
    pub fn map(&self, flags: MapFlags) -> GpuResult<MappedRange> {
        self.with(|buffer| buffer.map(flags))
    }

    /// See [`Buffer::unmap`].
    pub fn unmap(&self) -> GpuResult<()> {
        self.with(|buffer| buffer.unmap())
    }
}

/// A decoded image.
#[derive(Debug)]
pub struct Image {
    inner: Arc<dyn RenderImage>,
}

impl Image {
    /// Decodes an encoded image.
    pub fn decode(context: &Handle<Context>, bytes: &[u8]) -> GpuResult<Handle<Image>> {
        if bytes.is_empty() {
            return Err(GpuError::invalid("image data is empty"));
        }
        let inner = context.with(|context| context.render_context()?.decode_image(bytes))?;
        Ok(Handle::new(Image { inner }))
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.inner.size()
    }
}

impl Handle<Image> {
    /// See [`Image::size`].
    pub fn size(&self) -> GpuResult<(u32, u32)> {
        self.with(|image| Ok(image.size()))
    }
}

/// A decoded font.
#[derive(Debug)]
pub struct Font {
    inner: Arc<dyn EngineFont>,
}

impl Font {
    /// Decodes a TrueType or OpenType font.
    pub fn decode(context: &Handle<Context>, bytes: &[u8]) -> GpuResult<Handle<Font>> {
        if bytes.is_empty() {
            return Err(GpuError::invalid("font data is empty"));
        }
        let inner = context.with(|context| context.render_context()?.decode_font(bytes))?;
        Ok(Handle::new(Font { inner }))
    }
}

/// A gradient shader.
#[derive(Debug)]
pub struct Shader {
    inner: Arc<dyn RenderShader>,
}

fn check_stops(stops: &[GradientStop]) -> GpuResult<()> {
    if stops.is_empty() {
        return Err(GpuError::invalid("gradients need at least one stop"));
    }
    Ok(())
}

impl Shader {
    /// A linear gradient from `start` to `end`.
    pub fn linear(
        context: &Handle<Context>,
        start: (f32, f32),
        end: (f32, f32),
        stops: &[GradientStop],
    ) -> GpuResult<Handle<Shader>> {
        check_stops(stops)?;
        let inner = context.with(|context| {
            context
                .render_context()?
                .make_linear_gradient(start, end, stops)
        })?;
        Ok(Handle::new(Shader { inner }))
    }

    /// A radial gradient around `center`.
    pub fn radial(
        context: &Handle<Context>,
        center: (f32, f32),
        radius: f32,
        stops: &[GradientStop],
    ) -> GpuResult<Handle<Shader>> {
        check_stops(stops)?;
        let inner = context.with(|context| {
            context
                .render_context()?
                .make_radial_gradient(center, radius, stops)
        })?;
        Ok(Handle::new(Shader { inner }))
    }
}
