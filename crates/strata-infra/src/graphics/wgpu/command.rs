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

//! wgpu command allocators and lists.

use super::device::WgpuTexture;
use std::any::Any;
use strata_core::renderer::traits::{
    CommandAllocator, CommandList, EncodedWork, LoadAction, QueueKind,
};
use strata_core::renderer::api::Color;
use strata_core::{NativeError, NativeResult};

/// Converts a `0xAARRGGBB` color to a wgpu clear color.
pub(crate) fn to_wgpu_color(color: Color) -> wgpu::Color {
    let channel = |shift: u32| f64::from((color >> shift) & 0xff) / 255.0;
    wgpu::Color {
        r: channel(16),
        g: channel(8),
        b: channel(0),
        a: channel(24),
    }
}

/// wgpu manages command memory itself; the allocator only tracks its queue.
#[derive(Debug)]
pub struct WgpuCommandAllocator {
    kind: QueueKind,
}

impl WgpuCommandAllocator {
    pub(crate) fn new(kind: QueueKind) -> Self {
        Self { kind }
    }
}

impl CommandAllocator for WgpuCommandAllocator {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn reset(&mut self) -> NativeResult<()> {
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A wgpu command encoder plus the uploads staged alongside it.
#[derive(Debug)]
pub struct WgpuCommandList {
    kind: QueueKind,
    device: wgpu::Device,
    debug_labels: bool,
    encoder: Option<wgpu::CommandEncoder>,
    finished: Option<wgpu::CommandBuffer>,
    uploads: Vec<(wgpu::Buffer, Vec<u8>)>,
    // Kept alive until the next reset so the GPU never reads a freed buffer.
    in_flight: Vec<wgpu::Buffer>,
}

impl WgpuCommandList {
    pub(crate) fn new(kind: QueueKind, device: wgpu::Device, debug_labels: bool) -> Self {
        Self {
            kind,
            device,
            debug_labels,
            encoder: None,
            finished: None,
            uploads: Vec::new(),
            in_flight: Vec::new(),
        }
    }

    fn label<'a>(&self, label: &'a str) -> Option<&'a str> {
        self.debug_labels.then_some(label)
    }

    fn encoder(&mut self) -> NativeResult<&mut wgpu::CommandEncoder> {
        self.encoder
            .as_mut()
            .ok_or_else(|| NativeError::Failed("command list is closed".into()))
    }

    /// Writes the staged uploads and submits the closed command buffer.
    pub(crate) fn submit(&mut self, queue: &wgpu::Queue) -> NativeResult<()> {
        let commands = self.finished.take().ok_or_else(|| {
            NativeError::Failed("command list must be closed before execution".into())
        })?;
        for (buffer, bytes) in self.uploads.drain(..) {
            queue.write_buffer(&buffer, 0, &bytes);
            self.in_flight.push(buffer);
        }
        queue.submit(Some(commands));
        Ok(())
    }

    fn stage_upload(&mut self, label: &str, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let size = (bytes.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: self.label(label),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });
        let mut padded = bytes.to_vec();
        padded.resize(size as usize, 0);
        self.uploads.push((buffer, padded));
    }

    fn render_pass(
        &mut self,
        label: &str,
        texture: &WgpuTexture,
        load: LoadAction,
    ) -> NativeResult<()> {
        let view = texture.view()?;
        let label = self.label(label);
        let load = match load {
            LoadAction::Clear(color) => wgpu::LoadOp::Clear(to_wgpu_color(color)),
            LoadAction::Load => wgpu::LoadOp::Load,
        };
        let encoder = self.encoder()?;
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label,
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        drop(pass);
        Ok(())
    }
}

impl CommandList for WgpuCommandList {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn reset(&mut self, allocator: &mut dyn CommandAllocator) -> NativeResult<()> {
        if allocator.kind() != self.kind {
            return Err(NativeError::Failed(format!(
                "{:?} list cannot record from a {:?} allocator",
                self.kind,
                allocator.kind()
            )));
        }
        self.finished = None;
        self.uploads.clear();
        self.in_flight.clear();
        let label = match self.kind {
            QueueKind::Copy => "Strata copy list",
            QueueKind::Direct => "Strata direct list",
        };
        self.encoder = Some(
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: self.label(label),
                }),
        );
        Ok(())
    }

    fn encode(&mut self, work: &EncodedWork<'_>) -> NativeResult<()> {
        self.encoder()?;
        match work {
            EncodedWork::Upload { label, bytes } => {
                self.stage_upload(label, bytes);
                Ok(())
            }
            EncodedWork::RenderPass {
                label,
                target,
                load,
                ..
            } => {
                let Some(target) = target else {
                    return Ok(());
                };
                let texture = target
                    .as_any()
                    .downcast_ref::<WgpuTexture>()
                    .ok_or_else(|| {
                        NativeError::Failed("render target does not belong to wgpu".into())
                    })?;
                self.render_pass(label, texture, *load)
            }
        }
    }

    fn close(&mut self) -> NativeResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| NativeError::Failed("command list is already closed".into()))?;
        self.finished = Some(encoder.finish());
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.encoder.is_none()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn argb_colors_convert_per_channel() {
        let color = to_wgpu_color(0x80ff0000);
        assert_relative_eq!(color.r, 1.0);
        assert_relative_eq!(color.g, 0.0);
        assert_relative_eq!(color.a, 128.0 / 255.0);
    }
}
