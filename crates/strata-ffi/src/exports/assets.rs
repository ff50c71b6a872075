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

//! Buffers, images, fonts, text and gradient shaders.

use crate::abi::{
    StrataBuffer, StrataColor, StrataContext, StrataFont, StrataImage, StrataMappedMemory,
    StrataPath, StrataShader, StrataStatus, StrataTextStyle,
};
use crate::call::{guard, out, read, slice, tag, write};
use crate::registry::{BUFFERS, CONTEXTS, FONTS, IMAGES, PATHS, SHADERS};
use std::ffi::{c_char, c_void};
use strata_core::renderer::api::{BufferFlags, BufferKind, FillRule, GradientStop, MapFlags, TextStyle};
use strata_core::{GpuError, GpuResult};
use strata_runtime::{Buffer, Font, Image, Path, Shader};

/// Creates a zero-filled index or vertex buffer.
///
/// # Safety
/// `out_buffer` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_buffer_create(
    context: StrataContext,
    kind: u8,
    flags: u32,
    size_in_bytes: usize,
    out_buffer: *mut StrataBuffer,
) -> StrataStatus {
    guard("strata_buffer_create", || {
        out(out_buffer, "out_buffer")?;
        let kind = tag(kind, BufferKind::from_raw, "buffer type")?;
        let flags = BufferFlags::from_bits(flags)
            .ok_or_else(|| GpuError::invalid(format!("unknown buffer flags {flags:#x}")))?;
        let context = CONTEXTS.get(context.handle)?;
        let handle = BUFFERS.insert(Buffer::create(&context, kind, flags, size_in_bytes)?);
        // SAFETY: checked non-null above.
        unsafe { write(out_buffer, StrataBuffer { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataBuffer, BUFFERS, strata_buffer_retain, strata_buffer_release);

/// Copies `data_length` bytes to `offset`. Out-of-range uploads copy nothing.
///
/// # Safety
/// `data` must be null or valid for `data_length` reads.
#[no_mangle]
pub unsafe extern "C" fn strata_buffer_upload(
    buffer: StrataBuffer,
    data: *const c_void,
    data_length: usize,
    offset: usize,
) -> StrataStatus {
    guard("strata_buffer_upload", || {
        let buffer = BUFFERS.get(buffer.handle)?;
        // SAFETY: upheld by the caller.
        let bytes = unsafe { slice(data.cast::<u8>(), data_length, "data") }?;
        buffer.upload(offset, bytes)
    })
}

/// Maps the whole buffer until [`strata_buffer_unmap`].
///
/// # Safety
/// `out_mapping` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_buffer_map(
    buffer: StrataBuffer,
    flags: u32,
    out_mapping: *mut StrataMappedMemory,
) -> StrataStatus {
    guard("strata_buffer_map", || {
        out(out_mapping, "out_mapping")?;
        let flags = MapFlags::from_bits(flags)
            .ok_or_else(|| GpuError::invalid(format!("unknown map flags {flags:#x}")))?;
        let range = BUFFERS.get(buffer.handle)?.map(flags)?;
        let mapping = StrataMappedMemory {
            data: range.as_ptr().cast(),
            length: range.len(),
        };
        // SAFETY: checked non-null above.
        unsafe { write(out_mapping, mapping) };
        Ok(())
    })
}

/// Ends the mapping. The whole buffer is committed; `mapping` and
/// `written_bytes` are accepted for symmetry and not inspected.
#[no_mangle]
pub extern "C" fn strata_buffer_unmap(
    buffer: StrataBuffer,
    _mapping: *const StrataMappedMemory,
    _written_bytes: usize,
) -> StrataStatus {
    guard("strata_buffer_unmap", || BUFFERS.get(buffer.handle)?.unmap())
}

/// Decodes an encoded image (PNG, JPEG, WebP).
///
/// # Safety
/// `encoded_data` must be null or valid for `encoded_length` reads.
#[no_mangle]
pub unsafe extern "C" fn strata_image_decode(
    context: StrataContext,
    encoded_data: *const u8,
    encoded_length: usize,
    out_image: *mut StrataImage,
) -> StrataStatus {
    guard("strata_image_decode", || {
        out(out_image, "out_image")?;
        let context = CONTEXTS.get(context.handle)?;
        // SAFETY: upheld by the caller.
        let bytes = unsafe { slice(encoded_data, encoded_length, "encoded_data") }?;
        let handle = IMAGES.insert(Image::decode(&context, bytes)?);
        // SAFETY: checked non-null above.
        unsafe { write(out_image, StrataImage { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataImage, IMAGES, strata_image_retain, strata_image_release);

/// # Safety
/// `out_width` and `out_height` must be null or valid for one write.
#[no_mangle]
pub unsafe extern "C" fn strata_image_get_size(
    image: StrataImage,
    out_width: *mut u32,
    out_height: *mut u32,
) -> StrataStatus {
    guard("strata_image_get_size", || {
        out(out_width, "out_width")?;
        out(out_height, "out_height")?;
        let (width, height) = IMAGES.get(image.handle)?.size()?;
        // SAFETY: both checked non-null above.
        unsafe {
            write(out_width, width);
            write(out_height, height);
        }
        Ok(())
    })
}

/// Decodes a TrueType or OpenType font.
///
/// # Safety
/// `font_data` must be null or valid for `font_length` reads.
#[no_mangle]
pub unsafe extern "C" fn strata_font_decode(
    context: StrataContext,
    font_data: *const u8,
    font_length: usize,
    out_font: *mut StrataFont,
) -> StrataStatus {
    guard("strata_font_decode", || {
        out(out_font, "out_font")?;
        let context = CONTEXTS.get(context.handle)?;
        // SAFETY: upheld by the caller.
        let bytes = unsafe { slice(font_data, font_length, "font_data") }?;
        let handle = FONTS.insert(Font::decode(&context, bytes)?);
        // SAFETY: checked non-null above.
        unsafe { write(out_font, StrataFont { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataFont, FONTS, strata_font_retain, strata_font_release);

/// Shapes UTF-8 text into a new path.
///
/// Non-positive line height and width mean automatic.
///
/// # Safety
/// `utf8_text` must be null or valid for `utf8_length` reads; `style` and
/// `out_path` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn strata_text_create_path(
    context: StrataContext,
    font: StrataFont,
    utf8_text: *const c_char,
    utf8_length: usize,
    style: *const StrataTextStyle,
    fill_rule: u8,
    out_path: *mut StrataPath,
) -> StrataStatus {
    guard("strata_text_create_path", || {
        out(out_path, "out_path")?;
        let context = CONTEXTS.get(context.handle)?;
        let font = FONTS.get(font.handle)?;
        // SAFETY: upheld by the caller.
        let style = *unsafe { read(style, "style") }?;
        // SAFETY: upheld by the caller.
        let bytes = unsafe { slice(utf8_text.cast::<u8>(), utf8_length, "utf8_text") }?;
        let text = std::str::from_utf8(bytes)
            .map_err(|err| GpuError::invalid(format!("text is not valid UTF-8: {err}")))?;
        let style = TextStyle::try_from(style)?;
        let fill_rule = tag(fill_rule, FillRule::from_raw, "fill rule")?;
        let handle = PATHS.insert(Path::from_text(&context, &font, text, &style, fill_rule)?);
        // SAFETY: checked non-null above.
        unsafe { write(out_path, StrataPath { handle }) };
        Ok(())
    })
}

/// Pairs colors with stop positions.
///
/// # Safety
/// Both pointers must be null or valid for `count` reads.
unsafe fn gradient_stops(
    colors: *const StrataColor,
    stops: *const f32,
    count: usize,
) -> GpuResult<Vec<GradientStop>> {
    if colors.is_null() || stops.is_null() || count == 0 {
        return Err(GpuError::invalid("gradients need colors and at least one stop"));
    }
    // SAFETY: non-null and sized by the caller.
    let (colors, positions) = unsafe {
        (
            std::slice::from_raw_parts(colors, count),
            std::slice::from_raw_parts(stops, count),
        )
    };
    Ok(colors
        .iter()
        .zip(positions)
        .map(|(&color, &position)| GradientStop { color, position })
        .collect())
}

/// # Safety
/// `colors` and `stops` must be null or valid for `stop_count` reads;
/// `out_shader` must be null or valid for one write.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn strata_shader_linear_gradient_create(
    context: StrataContext,
    start_x: f32,
    start_y: f32,
    end_x: f32,
    end_y: f32,
    colors: *const StrataColor,
    stops: *const f32,
    stop_count: usize,
    out_shader: *mut StrataShader,
) -> StrataStatus {
    guard("strata_shader_linear_gradient_create", || {
        out(out_shader, "out_shader")?;
        let context = CONTEXTS.get(context.handle)?;
        // SAFETY: upheld by the caller.
        let stops = unsafe { gradient_stops(colors, stops, stop_count) }?;
        let shader = Shader::linear(&context, (start_x, start_y), (end_x, end_y), &stops)?;
        let handle = SHADERS.insert(shader);
        // SAFETY: checked non-null above.
        unsafe { write(out_shader, StrataShader { handle }) };
        Ok(())
    })
}

/// # Safety
/// `colors` and `stops` must be null or valid for `stop_count` reads;
/// `out_shader` must be null or valid for one write.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn strata_shader_radial_gradient_create(
    context: StrataContext,
    center_x: f32,
    center_y: f32,
    radius: f32,
    colors: *const StrataColor,
    stops: *const f32,
    stop_count: usize,
    out_shader: *mut StrataShader,
) -> StrataStatus {
    guard("strata_shader_radial_gradient_create", || {
        out(out_shader, "out_shader")?;
        let context = CONTEXTS.get(context.handle)?;
        // SAFETY: upheld by the caller.
        let stops = unsafe { gradient_stops(colors, stops, stop_count) }?;
        let shader = Shader::radial(&context, (center_x, center_y), radius, &stops)?;
        let handle = SHADERS.insert(shader);
        // SAFETY: checked non-null above.
        unsafe { write(out_shader, StrataShader { handle }) };
        Ok(())
    })
}

refcount_exports!(StrataShader, SHADERS, strata_shader_retain, strata_shader_release);
