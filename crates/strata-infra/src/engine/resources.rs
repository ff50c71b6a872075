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

//! Render targets, buffers, images, fonts and gradients of the recording engine.

use std::any::Any;
use std::sync::Arc;
use strata_core::renderer::api::{BufferFlags, BufferKind, GradientStop};
use strata_core::renderer::traits::{
    Font, NativeTexture, RenderBuffer, RenderImage, RenderShader, RenderTarget,
};
use strata_core::{GpuError, GpuResult};

/// A render target, optionally backed by a native texture.
#[derive(Debug)]
pub struct RecordingTarget {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) texture: Option<Arc<dyn NativeTexture>>,
}

impl RenderTarget for RecordingTarget {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn texture(&self) -> Option<Arc<dyn NativeTexture>> {
        self.texture.clone()
    }
}

/// A geometry buffer kept in CPU memory.
#[derive(Debug)]
pub struct RecordingBuffer {
    kind: BufferKind,
    flags: BufferFlags,
    bytes: Vec<u8>,
    commits: u32,
}

impl RecordingBuffer {
    pub(crate) fn new(kind: BufferKind, flags: BufferFlags, size: usize) -> Self {
        Self {
            kind,
            flags,
            bytes: vec![0; size],
            commits: 0,
        }
    }

    /// Creation flags.
    pub fn flags(&self) -> BufferFlags {
        self.flags
    }

    /// Number of times the contents were published.
    pub fn commits(&self) -> u32 {
        self.commits
    }

    /// Current contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl RenderBuffer for RecordingBuffer {
    fn kind(&self) -> BufferKind {
        self.kind
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn commit(&mut self) {
        self.commits += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A decoded RGBA8 image.
#[derive(Debug)]
pub struct RecordingImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RecordingImage {
    pub(crate) fn decode(bytes: &[u8]) -> GpuResult<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| GpuError::invalid(format!("image data could not be decoded: {e}")))?
            .to_rgba8();
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            pixels: decoded.into_raw(),
        })
    }

    /// RGBA8 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl RenderImage for RecordingImage {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// sfnt version tags accepted as font data.
const FONT_MAGIC: [[u8; 4]; 4] = [*b"\x00\x01\x00\x00", *b"OTTO", *b"true", *b"ttcf"];

/// Font bytes with a recognised sfnt header.
#[derive(Debug)]
pub struct RecordingFont {
    bytes: Vec<u8>,
}

impl RecordingFont {
    pub(crate) fn decode(bytes: &[u8]) -> GpuResult<Self> {
        let magic = bytes
            .get(..4)
            .ok_or_else(|| GpuError::invalid("font data is truncated"))?;
        if !FONT_MAGIC.iter().any(|m| m.as_slice() == magic) {
            return Err(GpuError::invalid("font data is not TrueType or OpenType"));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Raw font file.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Font for RecordingFont {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Geometry of a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientShape {
    /// Between two points.
    Linear {
        /// Start point.
        start: (f32, f32),
        /// End point.
        end: (f32, f32),
    },
    /// Around a center.
    Radial {
        /// Center point.
        center: (f32, f32),
        /// Radius.
        radius: f32,
    },
}

/// A gradient shader.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    shape: GradientShape,
    stops: Vec<GradientStop>,
}

impl Gradient {
    pub(crate) fn new(shape: GradientShape, stops: &[GradientStop]) -> GpuResult<Self> {
        if stops.is_empty() {
            return Err(GpuError::invalid("a gradient needs at least one stop"));
        }
        if stops.iter().any(|s| !s.position.is_finite()) {
            return Err(GpuError::invalid("gradient stop positions must be finite"));
        }
        Ok(Self {
            shape,
            stops: stops.to_vec(),
        })
    }

    /// Geometry.
    pub fn shape(&self) -> GradientShape {
        self.shape
    }

    /// Color stops.
    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }
}

impl RenderShader for Gradient {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn png_images_decode_to_rgba() {
        let image = RecordingImage::decode(&png(3, 2)).unwrap();
        assert_eq!(image.size(), (3, 2));
        assert_eq!(image.pixels().len(), 3 * 2 * 4);
        assert_eq!(&image.pixels()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_is_not_an_image() {
        let err = RecordingImage::decode(b"not an image").unwrap_err();
        assert!(matches!(err, GpuError::InvalidParameter(_)));
    }

    #[test]
    fn fonts_need_an_sfnt_header() {
        assert!(RecordingFont::decode(b"OTTO\0\0\0\0").is_ok());
        assert!(RecordingFont::decode(b"\x00\x01\x00\x00rest").is_ok());
        assert!(RecordingFont::decode(b"wOFF").is_err());
        assert!(RecordingFont::decode(b"OT").is_err());
    }

    #[test]
    fn gradients_reject_empty_stop_lists() {
        let shape = GradientShape::Radial {
            center: (0.0, 0.0),
            radius: 4.0,
        };
        assert!(Gradient::new(shape, &[]).is_err());
        let stops = [GradientStop {
            color: 0xffffffff,
            position: 0.5,
        }];
        assert_eq!(Gradient::new(shape, &stops).unwrap().stops().len(), 1);
    }
}
