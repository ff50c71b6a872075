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

//! Drawing enums and small value types forwarded to the rendering engine.

use bytemuck::{Pod, Zeroable};

/// A color packed as `0xAARRGGBB`.
pub type Color = u32;

/// Declares a `#[repr(u8)]` enum with a checked conversion from its raw value.
macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:literal,
            )*
        }
    ) => {
        $(#[$meta])*
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )*
        }

        impl $name {
            /// Converts a raw value, returning `None` for unknown values.
            pub const fn from_raw(raw: u8) -> Option<Self> {
                match raw {
                    $($value => Some($name::$variant),)*
                    _ => None,
                }
            }

            /// Returns the raw value.
            pub const fn as_raw(self) -> u8 {
                self as u8
            }
        }
    };
}

raw_enum! {
    /// How path winding is turned into coverage.
    pub enum FillRule {
        /// Non-zero winding.
        NonZero = 0,
        /// Even-odd winding.
        EvenOdd = 1,
        /// Only clockwise contours fill.
        Clockwise = 2,
    }
}

raw_enum! {
    /// Whether a paint fills or strokes.
    pub enum PaintStyle {
        /// Fill the path interior.
        Fill = 0,
        /// Stroke the path outline.
        Stroke = 1,
    }
}

raw_enum! {
    /// Stroke end caps.
    pub enum StrokeCap {
        /// Flat cap at the endpoint.
        Butt = 0,
        /// Semicircular cap.
        Round = 1,
        /// Square cap extending past the endpoint.
        Square = 2,
    }
}

raw_enum! {
    /// Stroke corner joins.
    pub enum StrokeJoin {
        /// Sharp corner.
        Miter = 0,
        /// Rounded corner.
        Round = 1,
        /// Beveled corner.
        Bevel = 2,
    }
}

raw_enum! {
    /// Blend modes understood by the engine.
    pub enum BlendMode {
        /// Source over destination.
        SrcOver = 3,
        /// Screen.
        Screen = 14,
        /// Overlay.
        Overlay = 15,
        /// Darken.
        Darken = 16,
        /// Lighten.
        Lighten = 17,
        /// Color dodge.
        ColorDodge = 18,
        /// Color burn.
        ColorBurn = 19,
        /// Hard light.
        HardLight = 20,
        /// Soft light.
        SoftLight = 21,
        /// Difference.
        Difference = 22,
        /// Exclusion.
        Exclusion = 23,
        /// Multiply.
        Multiply = 24,
        /// Hue.
        Hue = 25,
        /// Saturation.
        Saturation = 26,
        /// Color.
        Color = 27,
        /// Luminosity.
        Luminosity = 28,
    }
}

impl BlendMode {
    /// Returns `true` for modes that need advanced blend support on the GPU.
    pub const fn is_advanced(self) -> bool {
        !matches!(self, BlendMode::SrcOver)
    }
}

raw_enum! {
    /// Texture filtering.
    pub enum ImageFilter {
        /// Linear filtering.
        Bilinear = 0,
        /// Nearest-texel filtering.
        Nearest = 1,
    }
}

raw_enum! {
    /// Texture addressing outside `[0, 1]`.
    pub enum ImageWrap {
        /// Clamp to the edge.
        Clamp = 0,
        /// Repeat.
        Repeat = 1,
        /// Mirrored repeat.
        Mirror = 2,
    }
}

raw_enum! {
    /// Kind of engine-side geometry buffer.
    pub enum BufferKind {
        /// 16-bit indices.
        Index = 0,
        /// Vertex attributes.
        Vertex = 1,
    }
}

/// Sampling state for image draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSampler {
    /// Horizontal wrap.
    pub wrap_x: ImageWrap,
    /// Vertical wrap.
    pub wrap_y: ImageWrap,
    /// Filter.
    pub filter: ImageFilter,
}

impl Default for ImageSampler {
    fn default() -> Self {
        Self {
            wrap_x: ImageWrap::Clamp,
            wrap_y: ImageWrap::Clamp,
            filter: ImageFilter::Bilinear,
        }
    }
}

/// A 2D affine transform, laid out as `[xx, xy, yx, yy, tx, ty]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Mat2D {
    /// X axis, x component.
    pub xx: f32,
    /// X axis, y component.
    pub xy: f32,
    /// Y axis, x component.
    pub yx: f32,
    /// Y axis, y component.
    pub yy: f32,
    /// Translation x.
    pub tx: f32,
    /// Translation y.
    pub ty: f32,
}

impl Mat2D {
    /// The identity transform.
    pub const IDENTITY: Mat2D = Mat2D {
        xx: 1.0,
        xy: 0.0,
        yx: 0.0,
        yy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// A translation.
    pub const fn translation(tx: f32, ty: f32) -> Self {
        Mat2D {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    /// Maps a point through the transform.
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.xx * x + self.yx * y + self.tx,
            self.xy * x + self.yy * y + self.ty,
        )
    }

    /// Returns `self * rhs`: `rhs` is applied first.
    pub fn multiply(&self, rhs: &Mat2D) -> Mat2D {
        Mat2D {
            xx: self.xx * rhs.xx + self.yx * rhs.xy,
            xy: self.xy * rhs.xx + self.yy * rhs.xy,
            yx: self.xx * rhs.yx + self.yx * rhs.yy,
            yy: self.xy * rhs.yx + self.yy * rhs.yy,
            tx: self.xx * rhs.tx + self.yx * rhs.ty + self.tx,
            ty: self.xy * rhs.tx + self.yy * rhs.ty + self.ty,
        }
    }
}

impl Default for Mat2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One color stop of a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Stop color.
    pub color: Color,
    /// Position along the gradient in `[0, 1]`.
    pub position: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn raw_values_match_the_c_header() {
        assert_eq!(FillRule::from_raw(2), Some(FillRule::Clockwise));
        assert_eq!(FillRule::from_raw(3), None);
        assert_eq!(BlendMode::from_raw(3), Some(BlendMode::SrcOver));
        assert_eq!(BlendMode::from_raw(4), None);
        assert_eq!(BlendMode::Luminosity.as_raw(), 28);
        assert_eq!(BufferKind::from_raw(1), Some(BufferKind::Vertex));
        assert!(!BlendMode::SrcOver.is_advanced());
        assert!(BlendMode::Multiply.is_advanced());
    }

    #[test]
    fn translation_then_scale_composes_in_order() {
        let scale = Mat2D {
            xx: 2.0,
            yy: 3.0,
            ..Mat2D::IDENTITY
        };
        let shift = Mat2D::translation(10.0, -4.0);
        let combined = scale.multiply(&shift);
        let (x, y) = combined.map_point(1.0, 1.0);
        assert_relative_eq!(x, 22.0);
        assert_relative_eq!(y, -9.0);
    }

    #[test]
    fn identity_leaves_points_unchanged() {
        let (x, y) = Mat2D::default().map_point(3.5, -7.25);
        assert_relative_eq!(x, 3.5);
        assert_relative_eq!(y, -7.25);
    }
}
