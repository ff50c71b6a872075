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

//! Per-frame parameters.

use super::draw::Color;

/// Options supplied by the caller to `begin_frame`.
///
/// A zero `width` or `height` falls back to the context's current size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameOptions {
    /// Requested frame width, or 0 for the context width.
    pub width: u32,
    /// Requested frame height, or 0 for the context height.
    pub height: u32,
    /// Time since the previous frame, in milliseconds.
    pub delta_time_ms: f32,
    /// Whether the caller wants vertical sync for this frame.
    pub vsync: bool,
}

impl FrameOptions {
    /// Options for a frame of the given size.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

/// What the rendering engine is told when a frame begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDescriptor {
    /// Resolved frame width.
    pub width: u32,
    /// Resolved frame height.
    pub height: u32,
    /// Color the render target is cleared to.
    pub clear_color: Color,
    /// Number of the frame being recorded.
    pub frame_number: u64,
}

/// Frame numbers attached to an engine flush.
///
/// Resources last used by a frame at or before `safe_frame` are no longer in
/// flight on the GPU and may be recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushTag {
    /// Frame whose work is being flushed.
    pub current_frame: u64,
    /// Most recent frame known to have completed on the GPU.
    pub safe_frame: u64,
}
