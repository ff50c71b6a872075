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

//! Software command allocators, lists and queues.

use super::device::SoftFence;
use super::fault::FaultPlan;
use super::journal::{Journal, JournalEntry};
use std::any::Any;
use std::sync::Arc;
use strata_core::renderer::traits::{
    CommandAllocator, CommandList, CommandQueue, EncodedWork, NativeFence, QueueKind,
};
use strata_core::{NativeError, NativeResult};

fn soft_fence(fence: &dyn NativeFence) -> NativeResult<&SoftFence> {
    fence
        .as_any()
        .downcast_ref::<SoftFence>()
        .ok_or_else(|| NativeError::Failed("fence does not belong to the software backend".into()))
}

/// Command allocator of the software backend.
#[derive(Debug)]
pub struct SoftCommandAllocator {
    kind: QueueKind,
    resets: u64,
    journal: Journal,
}

impl SoftCommandAllocator {
    pub(crate) fn new(kind: QueueKind, journal: Journal) -> Self {
        Self {
            kind,
            resets: 0,
            journal,
        }
    }

    /// Number of resets so far.
    pub fn resets(&self) -> u64 {
        self.resets
    }
}

impl CommandAllocator for SoftCommandAllocator {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn reset(&mut self) -> NativeResult<()> {
        self.resets += 1;
        self.journal.record(JournalEntry::AllocatorReset(self.kind));
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Command list of the software backend.
#[derive(Debug)]
pub struct SoftCommandList {
    kind: QueueKind,
    closed: bool,
    labels: Vec<String>,
    journal: Journal,
}

impl SoftCommandList {
    pub(crate) fn new(kind: QueueKind, journal: Journal) -> Self {
        Self {
            kind,
            closed: false,
            labels: Vec::new(),
            journal,
        }
    }

    /// Labels of the work encoded since the last reset.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl CommandList for SoftCommandList {
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
        self.closed = false;
        self.labels.clear();
        self.journal.record(JournalEntry::ListReset(self.kind));
        Ok(())
    }

    fn encode(&mut self, work: &EncodedWork<'_>) -> NativeResult<()> {
        if self.closed {
            return Err(NativeError::Failed("command list is closed".into()));
        }
        let label = match work {
            EncodedWork::Upload { label, .. } => label,
            EncodedWork::RenderPass { label, .. } => label,
        };
        self.labels.push((*label).to_string());
        self.journal.record(JournalEntry::Encoded {
            queue: self.kind,
            label: (*label).to_string(),
        });
        Ok(())
    }

    fn close(&mut self) -> NativeResult<()> {
        if self.closed {
            return Err(NativeError::Failed("command list is already closed".into()));
        }
        self.closed = true;
        self.journal.record(JournalEntry::ListClosed(self.kind));
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Queue of the software backend. Work completes as soon as it is executed.
#[derive(Debug)]
pub struct SoftQueue {
    kind: QueueKind,
    journal: Journal,
    faults: Arc<FaultPlan>,
}

impl SoftQueue {
    pub(crate) fn new(kind: QueueKind, journal: Journal, faults: Arc<FaultPlan>) -> Self {
        Self {
            kind,
            journal,
            faults,
        }
    }
}

impl CommandQueue for SoftQueue {
    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn execute(&self, list: &mut dyn CommandList) -> NativeResult<()> {
        if list.kind() != self.kind {
            return Err(NativeError::Failed(format!(
                "{:?} list submitted to the {:?} queue",
                list.kind(),
                self.kind
            )));
        }
        if !list.is_closed() {
            return Err(NativeError::Failed(
                "command list must be closed before execution".into(),
            ));
        }
        self.journal.record(JournalEntry::Execute(self.kind));
        Ok(())
    }

    fn signal(&self, fence: &dyn NativeFence, value: u64) -> NativeResult<()> {
        let fence = soft_fence(fence)?;
        if let Some(error) = self.faults.take_signal() {
            return Err(error);
        }
        self.journal.record(JournalEntry::Signal {
            queue: self.kind,
            fence: fence.id(),
            value,
        });
        if !self.faults.hold_signal(&fence.timeline, value) {
            fence.timeline.advance(value);
        }
        Ok(())
    }

    fn wait(&self, fence: &dyn NativeFence, value: u64) -> NativeResult<()> {
        let fence = soft_fence(fence)?;
        self.journal.record(JournalEntry::Wait {
            queue: self.kind,
            fence: fence.id(),
            value,
        });
        Ok(())
    }
}
