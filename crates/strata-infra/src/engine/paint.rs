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

//! Recorded paint state.

use std::any::Any;
use std::sync::Arc;
use strata_core::renderer::api::{BlendMode, Color, PaintStyle, StrokeCap, StrokeJoin};
use strata_core::renderer::traits::{RenderPaint, RenderShader};

/// Paint settings captured at draw time.
#[derive(Debug, Clone)]
pub struct RecordingPaint {
    /// Fill or stroke.
    pub style: PaintStyle,
    /// Solid color.
    pub color: Color,
    /// Stroke width.
    pub thickness: f32,
    /// Stroke join.
    pub join: StrokeJoin,
    /// Stroke cap.
    pub cap: StrokeCap,
    /// Feather radius.
    pub feather: f32,
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Gradient, if any.
    pub shader: Option<Arc<dyn RenderShader>>,
}

impl Default for RecordingPaint {
    fn default() -> Self {
        Self {
            style: PaintStyle::Fill,
            color: 0xff00_0000,
            thickness: 1.0,
            join: StrokeJoin::Miter,
            cap: StrokeCap::Butt,
            feather: 0.0,
            blend_mode: BlendMode::SrcOver,
            shader: None,
        }
    }
}

impl RenderPaint for RecordingPaint {
    fn set_style(&mut self, style: PaintStyle) {
        self.style = style;
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn set_thickness(&mut self, thickness: f32) {
        self.thickness = thickness;
    }

    fn set_join(&mut self, join: StrokeJoin) {
        self.join = join;
    }

    fn set_cap(&mut self, cap: StrokeCap) {
        self.cap = cap;
    }

    fn set_feather(&mut self, feather: f32) {
        self.feather = feather;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    fn set_shader(&mut self, shader: Option<Arc<dyn RenderShader>>) {
        self.shader = shader;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
