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

use anyhow::Result;
use approx::assert_relative_eq;
use std::io::Cursor;
use std::sync::Arc;
use strata_core::renderer::api::{
    BackendKind, BlendMode, BufferFlags, BufferKind, DeviceDescriptor, DeviceFlags, FillRule,
    FrameOptions, GradientStop, ImageSampler, MapFlags, Mat2D, PaintStyle, TextAlign,
    TextDirection, TextStyle, TextWrap,
};
use strata_core::renderer::traits::NativeApi;
use strata_core::{GpuError, Status};
use strata_infra::engine::{PathVerb, RecordingBuffer, RecordingPath};
use strata_infra::{RecordingEngine, SoftApi};
use strata_runtime::{
    Buffer, Context, Font, Handle, Image, MeshDraw, Paint, Path, Renderer, Shader,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn hardware_context() -> Result<Handle<Context>> {
    init_logging();
    let runtime = strata_runtime::Runtime::builder(Arc::new(RecordingEngine))
        .native_api(Arc::new(SoftApi::new(BackendKind::Metal)) as Arc<dyn NativeApi>)
        .build();
    let device = runtime.create_device(&DeviceDescriptor {
        backend: BackendKind::Metal,
        adapter_index: 0,
        flags: DeviceFlags::NONE,
    })?;
    let context = Context::create(&device, 64, 64)?;
    device.release()?;
    Ok(context)
}

fn png(width: u32, height: u32) -> Result<Vec<u8>> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

fn verbs(path: &Handle<Path>) -> Result<Vec<PathVerb>> {
    Ok(path.with(|path| {
        let recorded = path
            .render_path()
            .as_any()
            .downcast_ref::<RecordingPath>()
            .ok_or_else(|| GpuError::internal("not a recording path"))?;
        Ok(recorded.verbs().to_vec())
    })?)
}

#[test]
fn test_paths_record_geometry() -> Result<()> {
    // --- 1. Build a triangle ---
    let context = hardware_context()?;
    let path = Path::create(&context, FillRule::EvenOdd)?;
    path.move_to(0.0, 0.0)?;
    path.line_to(10.0, 0.0)?;
    path.cubic_to(10.0, 5.0, 5.0, 10.0, 0.0, 10.0)?;
    path.close()?;
    assert_eq!(path.fill_rule()?, FillRule::EvenOdd);
    assert_eq!(verbs(&path)?.len(), 4);

    // --- 2. Append a translated copy, including of itself ---
    let other = Path::create(&context, FillRule::NonZero)?;
    other.add_path(&path, Some(&Mat2D::translation(5.0, 7.0)))?;
    match verbs(&other)?.first() {
        Some(PathVerb::Move(x, y)) => {
            assert_relative_eq!(*x, 5.0);
            assert_relative_eq!(*y, 7.0);
        }
        verb => panic!("unexpected first verb {verb:?}"),
    }
    path.add_path(&path, None)?;
    assert_eq!(verbs(&path)?.len(), 8);

    // --- 3. Rewind keeps the fill rule ---
    path.rewind()?;
    path.set_fill_rule(FillRule::Clockwise)?;
    assert!(verbs(&path)?.is_empty());
    assert_eq!(path.fill_rule()?, FillRule::Clockwise);

    Ok(())
}

#[test]
fn test_renderer_draws_within_a_frame() -> Result<()> {
    // --- 1. Setup ---
    let context = hardware_context()?;
    let renderer = Renderer::create(&context)?;
    assert_eq!(context.ref_count(), 2);

    let path = Path::create(&context, FillRule::NonZero)?;
    path.move_to(0.0, 0.0)?;
    path.line_to(32.0, 32.0)?;
    let paint = Paint::create(&context)?;
    paint.set_style(PaintStyle::Stroke)?;
    paint.set_color(0xff00ff00)?;
    paint.set_thickness(2.0)?;
    paint.set_blend_mode(BlendMode::Screen)?;
    let gradient = Shader::linear(
        &context,
        (0.0, 0.0),
        (32.0, 0.0),
        &[
            GradientStop { color: 0xff000000, position: 0.0 },
            GradientStop { color: 0xffffffff, position: 1.0 },
        ],
    )?;
    paint.set_shader(Some(&gradient))?;
    paint.set_shader(None)?;

    // --- 2. Record a frame ---
    context.begin_frame(&FrameOptions::default())?;
    renderer.save()?;
    renderer.transform(&Mat2D::translation(4.0, 4.0))?;
    renderer.clip_path(&path)?;
    renderer.draw_path(&path, &paint)?;
    renderer.restore()?;

    let image = Image::decode(&context, &png(4, 2)?)?;
    assert_eq!(image.size()?, (4, 2));
    renderer.draw_image(&image, ImageSampler::default(), BlendMode::SrcOver, 0.5)?;
    context.end_frame()?;
    context.submit()?;

    // --- 3. The renderer holds its context ---
    assert!(renderer.release()?);
    assert_eq!(context.ref_count(), 1);

    Ok(())
}

#[test]
fn test_image_mesh_validates_buffers() -> Result<()> {
    let context = hardware_context()?;
    let renderer = Renderer::create(&context)?;
    let image = Image::decode(&context, &png(2, 2)?)?;
    let vertices = Buffer::create(&context, BufferKind::Vertex, BufferFlags::NONE, 64)?;
    let indices = Buffer::create(&context, BufferKind::Index, BufferFlags::NONE, 12)?;

    let mesh = MeshDraw {
        image: &image,
        sampler: ImageSampler::default(),
        vertices: &vertices,
        uvs: &vertices,
        indices: &indices,
        vertex_count: 4,
        index_count: 6,
        blend_mode: BlendMode::SrcOver,
        opacity: 1.0,
    };

    context.begin_frame(&FrameOptions::default())?;
    renderer.draw_image_mesh(mesh)?;

    let err = renderer
        .draw_image_mesh(MeshDraw { uvs: &indices, ..mesh })
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);
    let err = renderer
        .draw_image_mesh(MeshDraw { indices: &vertices, ..mesh })
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);
    let err = renderer
        .draw_image_mesh(MeshDraw { vertex_count: 0, ..mesh })
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);

    context.end_frame()?;
    context.submit()?;
    Ok(())
}

#[test]
fn test_buffer_upload_and_mapping() -> Result<()> {
    // --- 1. Uploads ---
    let context = hardware_context()?;
    let buffer = Buffer::create(&context, BufferKind::Vertex, BufferFlags::NONE, 8)?;
    buffer.upload(0, &[])?;
    buffer.upload(2, &[1, 2, 3])?;
    let err = buffer.upload(6, &[9, 9, 9]).unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);
    assert!(buffer.upload(usize::MAX, &[1]).is_err());

    let contents = |buffer: &Handle<Buffer>| -> Result<Vec<u8>> {
        Ok(buffer.with(|buffer| {
            let recorded = buffer
                .render_buffer()
                .as_any()
                .downcast_ref::<RecordingBuffer>()
                .ok_or_else(|| GpuError::internal("not a recording buffer"))?;
            Ok(recorded.bytes().to_vec())
        })?)
    };
    assert_eq!(contents(&buffer)?, vec![0, 0, 1, 2, 3, 0, 0, 0]);

    // --- 2. Map/unmap discipline ---
    assert!(matches!(buffer.unmap(), Err(GpuError::InvalidParameter(_))));
    let range = buffer.map(MapFlags::NONE)?;
    assert_eq!(range.len(), 8);
    assert!(matches!(buffer.map(MapFlags::NONE), Err(GpuError::InvalidParameter(_))));
    buffer.with(|buffer| {
        buffer.mapped_mut()?[0] = 42;
        Ok(())
    })?;
    buffer.unmap()?;
    assert_eq!(contents(&buffer)?[0], 42);

    // --- 3. Discarding mappings clear the contents ---
    buffer.map(MapFlags::DISCARD_RANGE)?;
    buffer.unmap()?;
    assert!(contents(&buffer)?.iter().all(|&b| b == 0));

    Ok(())
}

#[test]
fn test_fonts_and_text() -> Result<()> {
    let context = hardware_context()?;
    assert_eq!(
        Font::decode(&context, &[]).unwrap_err().status(),
        Status::InvalidParameter
    );
    let font = Font::decode(&context, b"OTTO\0\0\0\0\0\0\0\0")?;

    let style = TextStyle::normalize(
        16.0,
        0.0,
        0.0,
        -1.0,
        0.0,
        TextAlign::Left,
        TextWrap::Wrap,
        TextDirection::Automatic,
    )
    .ok_or_else(|| anyhow::anyhow!("style rejected"))?;
    assert_eq!(style.line_height, None);
    assert_eq!(style.width, None);

    let err = Path::from_text(&context, &font, "hello", &style, FillRule::NonZero).unwrap_err();
    assert_eq!(err.status(), Status::Unsupported);

    let zero = TextStyle { size: 0.0, ..style };
    let err = Path::from_text(&context, &font, "hello", &zero, FillRule::NonZero).unwrap_err();
    assert_eq!(err.status(), Status::InvalidParameter);

    Ok(())
}

#[test]
fn test_gradients_and_null_contexts() -> Result<()> {
    let context = hardware_context()?;
    let stops = [GradientStop { color: 0xffffffff, position: 0.5 }];
    Shader::radial(&context, (8.0, 8.0), 4.0, &stops)?;
    assert_eq!(
        Shader::radial(&context, (8.0, 8.0), 4.0, &[]).unwrap_err().status(),
        Status::InvalidParameter
    );

    // A null-device context has no engine objects.
    let runtime = strata_runtime::Runtime::builder(Arc::new(RecordingEngine)).build();
    let device = runtime.create_device(&DeviceDescriptor {
        backend: BackendKind::Null,
        adapter_index: 0,
        flags: DeviceFlags::NONE,
    })?;
    let null_context = Context::create(&device, 8, 8)?;
    assert_eq!(
        Path::create(&null_context, FillRule::NonZero).unwrap_err().status(),
        Status::Unsupported
    );
    assert_eq!(
        Shader::radial(&null_context, (0.0, 0.0), 1.0, &stops).unwrap_err().status(),
        Status::Unsupported
    );
    Ok(())
}
