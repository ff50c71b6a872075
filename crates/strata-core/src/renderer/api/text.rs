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

//! Text style parameters forwarded to the engine's shaper.

/// Horizontal alignment of shaped lines.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    /// Align to the left edge.
    #[default]
    Left = 0,
    /// Align to the right edge.
    Right = 1,
    /// Center each line.
    Center = 2,
}

impl TextAlign {
    /// Converts a raw value.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(TextAlign::Left),
            1 => Some(TextAlign::Right),
            2 => Some(TextAlign::Center),
            _ => None,
        }
    }
}

/// Line wrapping behaviour.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextWrap {
    /// Wrap at the layout width.
    #[default]
    Wrap = 0,
    /// Never wrap.
    NoWrap = 1,
}

impl TextWrap {
    /// Converts a raw value.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(TextWrap::Wrap),
            1 => Some(TextWrap::NoWrap),
            _ => None,
        }
    }
}

/// Paragraph direction.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    /// Detect from the text.
    #[default]
    Automatic = 0,
    /// Left to right.
    Ltr = 1,
    /// Right to left.
    Rtl = 2,
}

impl TextDirection {
    /// Converts a raw value.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(TextDirection::Automatic),
            1 => Some(TextDirection::Ltr),
            2 => Some(TextDirection::Rtl),
            _ => None,
        }
    }
}

/// A validated text style. `None` means automatic line height or unbounded width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in points. Always positive.
    pub size: f32,
    /// Line height, or `None` for the font's natural line height.
    pub line_height: Option<f32>,
    /// Extra spacing between letters.
    pub letter_spacing: f32,
    /// Layout width, or `None` for unbounded.
    pub width: Option<f32>,
    /// Extra spacing between paragraphs.
    pub paragraph_spacing: f32,
    /// Alignment.
    pub align: TextAlign,
    /// Wrapping.
    pub wrap: TextWrap,
    /// Direction.
    pub direction: TextDirection,
}

impl TextStyle {
    /// Normalizes raw style values: non-positive line heights and widths become automatic.
    ///
    /// Returns `None` when `size` is not a positive number.
    #[allow(clippy::too_many_arguments)]
    pub fn normalize(
        size: f32,
        line_height: f32,
        letter_spacing: f32,
        width: f32,
        paragraph_spacing: f32,
        align: TextAlign,
        wrap: TextWrap,
        direction: TextDirection,
    ) -> Option<Self> {
        if size.is_nan() || size <= 0.0 {
            return None;
        }
        Some(Self {
            size,
            line_height: (line_height > 0.0).then_some(line_height),
            letter_spacing,
            width: (width > 0.0).then_some(width),
            paragraph_spacing,
            align,
            wrap,
            direction,
        })
    }
}
