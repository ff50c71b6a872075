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

//! Paths, paints and renderers.

use crate::abi::{
    StrataBuffer, StrataContext, StrataImage, StrataImageSampler, StrataPaint, StrataPath,
    StrataRenderer, StrataShader, StrataStatus,
};
use crate::call::{guard, out, read, tag, write};
use crate::registry::{BUFFERS, CONTEXTS, IMAGES, PAINTS, PATHS, RENDERERS, SHADERS};
use strata_core::renderer::api::{
    BlendMode, Color, FillRule, ImageSampler, Mat2D, PaintStyle, StrokeCap, StrokeJoin,
};
use strata_runtime::{MeshDraw, Paint, Path, Renderer};

/// Creates an empty path.
///
/// # Safety
/// `out_path` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_path_create(
    context: StrataContext,
    fill_rule: u8,
    out_path: *mut StrataPath,
) -> StrataStatus {
    guard("strata_path_create", || {
        out(out_path, "out_path")?;
        let fill_rule = tag(fill_rule, FillRule::from_raw, "fill rule")?;
        let context = CONTEXTS.get(context.handle)?;
        let handle = PATHS.insert(Path::create(&context, fill_rule)?);
        // SAFETY: checked non-null above.
        unsafe { write(out_path, StrataPath { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataPath, PATHS, strata_path_retain, strata_path_release);

#[no_mangle]
pub extern "C" fn strata_path_rewind(path: StrataPath) -> StrataStatus {
    guard("strata_path_rewind", || PATHS.get(path.handle)?.rewind())
}

#[no_mangle]
pub extern "C" fn strata_path_set_fill_rule(path: StrataPath, fill_rule: u8) -> StrataStatus {
    guard("strata_path_set_fill_rule", || {
        let path = PATHS.get(path.handle)?;
        path.set_fill_rule(tag(fill_rule, FillRule::from_raw, "fill rule")?)
    })
}

#[no_mangle]
pub extern "C" fn strata_path_move_to(path: StrataPath, x: f32, y: f32) -> StrataStatus {
    guard("strata_path_move_to", || PATHS.get(path.handle)?.move_to(x, y))
}

#[no_mangle]
pub extern "C" fn strata_path_line_to(path: StrataPath, x: f32, y: f32) -> StrataStatus {
    guard("strata_path_line_to", || PATHS.get(path.handle)?.line_to(x, y))
}

#[no_mangle]
pub extern "C" fn strata_path_cubic_to(
    path: StrataPath,
    ox: f32,
    oy: f32,
    ix: f32,
    iy: f32,
    x: f32,
    y: f32,
) -> StrataStatus {
    guard("strata_path_cubic_to", || {
        PATHS.get(path.handle)?.cubic_to(ox, oy, ix, iy, x, y)
    })
}

#[no_mangle]
pub extern "C" fn strata_path_close(path: StrataPath) -> StrataStatus {
    guard("strata_path_close", || PATHS.get(path.handle)?.close())
}

/// Appends `source` to `destination`. A null transform is the identity.
///
/// # Safety
/// `transform` must be null or valid for one read.
#[no_mangle]
pub unsafe extern "C" fn strata_path_add_path(
    destination: StrataPath,
    source: StrataPath,
    transform: *const Mat2D,
) -> StrataStatus {
    guard("strata_path_add_path", || {
        let destination = PATHS.get(destination.handle)?;
        let source = PATHS.get(source.handle)?;
        // SAFETY: upheld by the caller.
        let transform = unsafe { transform.as_ref() };
        destination.add_path(&source, transform)
    })
}

/// Creates a paint with default settings.
///
/// # Safety
/// `out_paint` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_paint_create(context: StrataContext, out_paint: *mut StrataPaint) -> StrataStatus {
    guard("strata_paint_create", || {
        out(out_paint, "out_paint")?;
        let context = CONTEXTS.get(context.handle)?;
        let handle = PAINTS.insert(Paint::create(&context)?);
        // SAFETY: checked non-null above.
        unsafe { write(out_paint, StrataPaint { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataPaint, PAINTS, strata_paint_retain, strata_paint_release);

#[no_mangle]
pub extern "C" fn strata_paint_set_style(paint: StrataPaint, style: u8) -> StrataStatus {
    guard("strata_paint_set_style", || {
        let paint = PAINTS.get(paint.handle)?;
        paint.set_style(tag(style, PaintStyle::from_raw, "paint style")?)
    })
}

#[no_mangle]
pub extern "C" fn strata_paint_set_color(paint: StrataPaint, color: Color) -> StrataStatus {
    guard("strata_paint_set_color", || PAINTS.get(paint.handle)?.set_color(color))
}

#[no_mangle]
pub extern "C" fn strata_paint_set_thickness(paint: StrataPaint, thickness: f32) -> StrataStatus {
    guard("strata_paint_set_thickness", || {
        PAINTS.get(paint.handle)?.set_thickness(thickness)
    })
}

#[no_mangle]
pub extern "C" fn strata_paint_set_join(paint: StrataPaint, join: u8) -> StrataStatus {
    guard("strata_paint_set_join", || {
        let paint = PAINTS.get(paint.handle)?;
        paint.set_join(tag(join, StrokeJoin::from_raw, "stroke join")?)
    })
}

#[no_mangle]
pub extern "C" fn strata_paint_set_cap(paint: StrataPaint, cap: u8) -> StrataStatus {
    guard("strata_paint_set_cap", || {
        let paint = PAINTS.get(paint.handle)?;
        paint.set_cap(tag(cap, StrokeCap::from_raw, "stroke cap")?)
    })
}

#[no_mangle]
pub extern "C" fn strata_paint_set_feather(paint: StrataPaint, feather: f32) -> StrataStatus {
    guard("strata_paint_set_feather", || {
        PAINTS.get(paint.handle)?.set_feather(feather)
    })
}

#[no_mangle]
pub extern "C" fn strata_paint_set_blend_mode(paint: StrataPaint, blend_mode: u8) -> StrataStatus {
    guard("strata_paint_set_blend_mode", || {
        let paint = PAINTS.get(paint.handle)?;
        paint.set_blend_mode(tag(blend_mode, BlendMode::from_raw, "blend mode")?)
    })
}

/// Sets the paint's shader. A null shader clears it.
#[no_mangle]
pub extern "C" fn strata_paint_set_shader(paint: StrataPaint, shader: StrataShader) -> StrataStatus {
    guard("strata_paint_set_shader", || {
        let paint = PAINTS.get(paint.handle)?;
        let shader = SHADERS.get_optional(shader.handle)?;
        paint.set_shader(shader.as_ref())
    })
}

#[no_mangle]
pub extern "C" fn strata_paint_clear_shader(paint: StrataPaint) -> StrataStatus {
    guard("strata_paint_clear_shader", || PAINTS.get(paint.handle)?.set_shader(None))
}

/// Creates a renderer recording into `context`. The renderer keeps the
/// context alive.
///
/// # Safety
/// `out_renderer` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_renderer_create(
    context: StrataContext,
    out_renderer: *mut StrataRenderer,
) -> StrataStatus {
    guard("strata_renderer_create", || {
        out(out_renderer, "out_renderer")?;
        let context = CONTEXTS.get(context.handle)?;
        let handle = RENDERERS.insert(Renderer::create(&context)?);
        // SAFETY: checked non-null above.
        unsafe { write(out_renderer, StrataRenderer { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataRenderer, RENDERERS, strata_renderer_retain, strata_renderer_release);

#[no_mangle]
pub extern "C" fn strata_renderer_save(renderer: StrataRenderer) -> StrataStatus {
    guard("strata_renderer_save", || RENDERERS.get(renderer.handle)?.save())
}

#[no_mangle]
pub extern "C" fn strata_renderer_restore(renderer: StrataRenderer) -> StrataStatus {
    guard("strata_renderer_restore", || RENDERERS.get(renderer.handle)?.restore())
}

/// # Safety
/// `transform` must be null or valid for one read.
#[no_mangle]
pub unsafe extern "C" fn strata_renderer_transform(
    renderer: StrataRenderer,
    transform: *const Mat2D,
) -> StrataStatus {
    guard("strata_renderer_transform", || {
        let renderer = RENDERERS.get(renderer.handle)?;
        // SAFETY: upheld by the caller.
        let transform = unsafe { read(transform, "transform") }?;
        renderer.transform(transform)
    })
}

#[no_mangle]
pub extern "C" fn strata_renderer_draw_path(
    renderer: StrataRenderer,
    path: StrataPath,
    paint: StrataPaint,
) -> StrataStatus {
    guard("strata_renderer_draw_path", || {
        let renderer = RENDERERS.get(renderer.handle)?;
        let path = PATHS.get(path.handle)?;
        let paint = PAINTS.get(paint.handle)?;
        renderer.draw_path(&path, &paint)
    })
}

#[no_mangle]
pub extern "C" fn strata_renderer_clip_path(renderer: StrataRenderer, path: StrataPath) -> StrataStatus {
    guard("strata_renderer_clip_path", || {
        let renderer = RENDERERS.get(renderer.handle)?;
        renderer.clip_path(&PATHS.get(path.handle)?)
    })
}

/// # Safety
/// `sampler` must be null or valid for one read.
unsafe fn decode_sampler(sampler: *const StrataImageSampler) -> strata_core::GpuResult<ImageSampler> {
    // SAFETY: upheld by the caller.
    match unsafe { sampler.as_ref() } {
        Some(raw) => ImageSampler::try_from(*raw),
        None => Ok(ImageSampler::default()),
    }
}

/// Draws `image`. A null sampler clamps and filters bilinearly.
///
/// # Safety
/// `sampler_state` must be null or valid for one read.
#[no_mangle]
pub unsafe extern "C" fn strata_renderer_draw_image(
    renderer: StrataRenderer,
    image: StrataImage,
    sampler_state: *const StrataImageSampler,
    blend_mode: u8,
    opacity: f32,
) -> StrataStatus {
    guard("strata_renderer_draw_image", || {
        let renderer = RENDERERS.get(renderer.handle)?;
        let image = IMAGES.get(image.handle)?;
        // SAFETY: upheld by the caller.
        let sampler = unsafe { decode_sampler(sampler_state) }?;
        let blend_mode = tag(blend_mode, BlendMode::from_raw, "blend mode")?;
        renderer.draw_image(&image, sampler, blend_mode, opacity)
    })
}

/// Draws a textured triangle mesh.
///
/// # Safety
/// `sampler_state` must be null or valid for one read.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn strata_renderer_draw_image_mesh(
    renderer: StrataRenderer,
    image: StrataImage,
    sampler_state: *const StrataImageSampler,
    vertices: StrataBuffer,
    uvs: StrataBuffer,
    indices: StrataBuffer,
    vertex_count: u32,
    index_count: u32,
    blend_mode: u8,
    opacity: f32,
) -> StrataStatus {
    guard("strata_renderer_draw_image_mesh", || {
        let renderer = RENDERERS.get(renderer.handle)?;
        let image = IMAGES.get(image.handle)?;
        let vertices = BUFFERS.get(vertices.handle)?;
        let uvs = BUFFERS.get(uvs.handle)?;
        let indices = BUFFERS.get(indices.handle)?;
        // SAFETY: upheld by the caller.
        let sampler = unsafe { decode_sampler(sampler_state) }?;
        renderer.draw_image_mesh(MeshDraw {
            image: &image,
            sampler,
            vertices: &vertices,
            uvs: &uvs,
            indices: &indices,
            vertex_count,
            index_count,
            blend_mode: tag(blend_mode, BlendMode::from_raw, "blend mode")?,
            opacity,
        })
    })
}
