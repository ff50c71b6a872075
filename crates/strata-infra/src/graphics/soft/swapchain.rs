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

//! Software swapchain: a ring of textures with a rotating current index.

use super::device::SoftTexture;
use super::fault::FaultPlan;
use super::journal::{Journal, JournalEntry};
use std::sync::Arc;
use strata_core::renderer::api::SwapChainConfig;
use strata_core::renderer::traits::{NativeTexture, SwapChain};
use strata_core::{NativeError, NativeResult};

/// Swapchain of the software backend.
#[derive(Debug)]
pub struct SoftSwapChain {
    buffers: Vec<Arc<SoftTexture>>,
    current: u32,
    width: u32,
    height: u32,
    tearing: bool,
    journal: Journal,
    faults: Arc<FaultPlan>,
}

impl SoftSwapChain {
    pub(crate) fn new(
        config: &SwapChainConfig,
        tearing: bool,
        journal: Journal,
        faults: Arc<FaultPlan>,
    ) -> Self {
        Self {
            buffers: Self::allocate(config.buffer_count, config.width, config.height),
            current: 0,
            width: config.width,
            height: config.height,
            tearing,
            journal,
            faults,
        }
    }

    fn allocate(count: u32, width: u32, height: u32) -> Vec<Arc<SoftTexture>> {
        (0..count)
            .map(|i| Arc::new(SoftTexture::new(width, height, format!("back buffer {i}"))))
            .collect()
    }
}

impl SwapChain for SoftSwapChain {
    fn buffer_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn tearing_enabled(&self) -> bool {
        self.tearing
    }

    fn current_back_buffer_index(&mut self) -> NativeResult<u32> {
        Ok(self.current)
    }

    fn back_buffer(&mut self, index: u32) -> NativeResult<Arc<dyn NativeTexture>> {
        self.buffers
            .get(index as usize)
            .map(|buffer| Arc::clone(buffer) as Arc<dyn NativeTexture>)
            .ok_or_else(|| {
                NativeError::Failed(format!(
                    "back buffer {index} out of range for {} buffers",
                    self.buffers.len()
                ))
            })
    }

    fn resize(&mut self, width: u32, height: u32) -> NativeResult<()> {
        if let Some(error) = self.faults.take_resize() {
            return Err(error);
        }
        if self.buffers.iter().any(|b| Arc::strong_count(b) > 1) {
            return Err(NativeError::Failed(
                "back buffers are still referenced during resize".into(),
            ));
        }
        self.buffers = Self::allocate(self.buffer_count(), width, height);
        self.width = width;
        self.height = height;
        self.current = 0;
        self.journal.record(JournalEntry::Resize { width, height });
        Ok(())
    }

    fn present(&mut self, sync_interval: u32, allow_tearing: bool) -> NativeResult<()> {
        if let Some(error) = self.faults.take_present() {
            return Err(error);
        }
        self.journal.record(JournalEntry::Present {
            index: self.current,
            sync_interval,
            allow_tearing,
        });
        self.current = (self.current + 1) % self.buffer_count();
        Ok(())
    }
}
