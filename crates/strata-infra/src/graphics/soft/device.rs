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

//! Software device, fences and textures.

use super::command::{SoftCommandAllocator, SoftCommandList, SoftQueue};
use super::fault::FaultPlan;
use super::journal::{Journal, JournalEntry};
use super::swapchain::SoftSwapChain;
use crate::sync::lock;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use strata_core::renderer::api::{BackendKind, Capabilities, SurfaceTarget, SwapChainConfig};
use strata_core::renderer::traits::{
    CommandAllocator, CommandList, CommandQueue, NativeDevice, NativeFence, NativeTexture,
    QueueKind, SwapChain,
};
use strata_core::{NativeError, NativeResult};

static NEXT_FENCE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// A host-side monotonically increasing counter with blocking waits.
#[derive(Debug)]
pub(crate) struct Timeline {
    value: Mutex<u64>,
    reached: Condvar,
}

impl Timeline {
    fn new(initial: u64) -> Self {
        Self {
            value: Mutex::new(initial),
            reached: Condvar::new(),
        }
    }

    pub(crate) fn value(&self) -> u64 {
        *lock(&self.value)
    }

    pub(crate) fn advance(&self, value: u64) {
        let mut current = lock(&self.value);
        if value > *current {
            *current = value;
            self.reached.notify_all();
        }
    }

    fn wait(&self, value: u64, timeout: Option<Duration>) -> NativeResult<()> {
        let mut current = lock(&self.value);
        match timeout {
            None => {
                while *current < value {
                    current = self
                        .reached
                        .wait(current)
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                }
                Ok(())
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while *current < value {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(NativeError::Timeout);
                    }
                    current = self
                        .reached
                        .wait_timeout(current, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|poisoned| poisoned.into_inner().0);
                }
                Ok(())
            }
        }
    }
}

/// A fence of the software backend.
#[derive(Debug)]
pub struct SoftFence {
    id: u64,
    pub(crate) timeline: Arc<Timeline>,
}

impl SoftFence {
    pub(crate) fn new(initial: u64) -> Self {
        Self {
            id: NEXT_FENCE_ID.fetch_add(1, Ordering::Relaxed),
            timeline: Arc::new(Timeline::new(initial)),
        }
    }

    /// Identity used in journal entries.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl NativeFence for SoftFence {
    fn completed_value(&self) -> u64 {
        self.timeline.value()
    }

    fn wait(&self, value: u64, timeout: Option<Duration>) -> NativeResult<()> {
        self.timeline.wait(value, timeout)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A texture of the software backend. Holds no pixels.
#[derive(Debug)]
pub struct SoftTexture {
    id: u64,
    width: u32,
    height: u32,
    label: String,
}

impl SoftTexture {
    pub(crate) fn new(width: u32, height: u32, label: impl Into<String>) -> Self {
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            label: label.into(),
        }
    }

    /// Unique texture identity.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl NativeTexture for SoftTexture {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A device of the software backend.
#[derive(Debug)]
pub struct SoftDevice {
    capabilities: Capabilities,
    copy_queue: Arc<SoftQueue>,
    direct_queue: Arc<SoftQueue>,
    tearing: bool,
    journal: Journal,
    faults: Arc<FaultPlan>,
}

impl SoftDevice {
    pub(crate) fn new(
        capabilities: Capabilities,
        tearing: bool,
        journal: Journal,
        faults: Arc<FaultPlan>,
    ) -> Self {
        Self {
            capabilities,
            copy_queue: Arc::new(SoftQueue::new(
                QueueKind::Copy,
                journal.clone(),
                Arc::clone(&faults),
            )),
            direct_queue: Arc::new(SoftQueue::new(
                QueueKind::Direct,
                journal.clone(),
                Arc::clone(&faults),
            )),
            tearing,
            journal,
            faults,
        }
    }
}

impl NativeDevice for SoftDevice {
    fn backend(&self) -> BackendKind {
        self.capabilities.backend
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn queue(&self, kind: QueueKind) -> Arc<dyn CommandQueue> {
        let queue = match kind {
            QueueKind::Copy => &self.copy_queue,
            QueueKind::Direct => &self.direct_queue,
        };
        Arc::clone(queue) as Arc<dyn CommandQueue>
    }

    fn create_command_allocator(
        &self,
        kind: QueueKind,
    ) -> NativeResult<Box<dyn CommandAllocator>> {
        Ok(Box::new(SoftCommandAllocator::new(kind, self.journal.clone())))
    }

    fn create_command_list(
        &self,
        kind: QueueKind,
        allocator: &mut dyn CommandAllocator,
    ) -> NativeResult<Box<dyn CommandList>> {
        if allocator.kind() != kind {
            return Err(NativeError::Failed(format!(
                "allocator for {:?} cannot back a {kind:?} list",
                allocator.kind()
            )));
        }
        Ok(Box::new(SoftCommandList::new(kind, self.journal.clone())))
    }

    fn create_fence(&self, initial: u64) -> NativeResult<Arc<dyn NativeFence>> {
        Ok(Arc::new(SoftFence::new(initial)))
    }

    fn create_texture(
        &self,
        width: u32,
        height: u32,
        label: &str,
    ) -> NativeResult<Arc<dyn NativeTexture>> {
        if width == 0 || height == 0 {
            return Err(NativeError::Failed(format!(
                "texture {label} has an empty extent {width}x{height}"
            )));
        }
        Ok(Arc::new(SoftTexture::new(width, height, label)))
    }

    fn create_swap_chain(
        &self,
        target: &SurfaceTarget,
        config: &SwapChainConfig,
    ) -> NativeResult<Box<dyn SwapChain>> {
        if target.backend() != self.backend() {
            return Err(NativeError::Unsupported(format!(
                "{} device cannot present to a {} target",
                self.backend(),
                target.backend()
            )));
        }
        if let Some(error) = self.faults.take_swap_chain() {
            return Err(error);
        }
        let tearing = config.allow_tearing && self.tearing;
        self.journal.record(JournalEntry::SwapChainCreated {
            buffer_count: config.buffer_count,
            allow_tearing: tearing,
        });
        Ok(Box::new(SoftSwapChain::new(
            config,
            tearing,
            self.journal.clone(),
            Arc::clone(&self.faults),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn timeline_wait_times_out_below_target() {
        let fence = SoftFence::new(0);
        let result = fence.wait(1, Some(Duration::from_millis(10)));
        assert_eq!(result, Err(NativeError::Timeout));
    }

    #[test]
    fn timeline_wakes_waiters_from_another_thread() {
        let fence = Arc::new(SoftFence::new(0));
        let timeline = Arc::clone(&fence.timeline);
        let signaler = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            timeline.advance(3);
        });
        fence.wait(3, None).unwrap();
        signaler.join().unwrap();
        assert_eq!(fence.completed_value(), 3);
    }

    #[test]
    fn swap_chains_only_tear_when_requested_and_offered() {
        let target = SurfaceTarget::Win32Window {
            hwnd: strata_core::renderer::api::RawHandle::from_raw(0x10).unwrap(),
        };
        let config = |allow_tearing| SwapChainConfig {
            width: 8,
            height: 8,
            buffer_count: 2,
            sample_count: 1,
            allow_tearing,
            vsync: false,
        };
        let device = |tearing| {
            let caps = Capabilities {
                backend: BackendKind::D3d12,
                ..Capabilities::headless()
            };
            SoftDevice::new(caps, tearing, Journal::new(), Arc::new(FaultPlan::default()))
        };

        for (offered, requested, expected) in [
            (true, true, true),
            (true, false, false),
            (false, true, false),
        ] {
            let chain = device(offered)
                .create_swap_chain(&target, &config(requested))
                .unwrap();
            assert_eq!(chain.tearing_enabled(), expected);
        }
    }

    #[test]
    fn timeline_never_moves_backwards() {
        let fence = SoftFence::new(5);
        fence.timeline.advance(2);
        assert_eq!(fence.completed_value(), 5);
    }
}
