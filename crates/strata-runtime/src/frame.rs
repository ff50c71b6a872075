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

//! The per-context frame state machine and its queue synchronization.

use std::sync::Arc;
use strata_core::renderer::api::FlushTag;
use strata_core::renderer::traits::{
    CommandAllocator, CommandList, NativeDevice, NativeFence, QueueKind,
};
use strata_core::{GpuError, GpuResult};

/// Where a context is in its frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// No frame in progress.
    Idle,
    /// Between `begin_frame` and `end_frame`.
    Active,
    /// Ended but not yet submitted.
    Ended,
}

/// Frame counters and phase of one context.
///
/// `frame_counter` numbers the frame being recorded and starts at one;
/// `last_completed` is the newest frame the GPU has finished, zero before the
/// first submit.
#[derive(Debug, Clone)]
pub struct FrameClock {
    phase: FramePhase,
    frame_counter: u64,
    last_completed: u64,
}

impl FrameClock {
    /// A clock before its first frame.
    pub fn new() -> Self {
        Self {
            phase: FramePhase::Idle,
            frame_counter: 1,
            last_completed: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Number of the frame being recorded, or the next one when idle.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Newest completed frame.
    pub fn last_completed(&self) -> u64 {
        self.last_completed
    }

    /// Fails unless a frame may begin.
    pub fn check_begin(&self) -> GpuResult<()> {
        match self.phase {
            FramePhase::Idle => Ok(()),
            FramePhase::Active => Err(GpuError::invalid(
                "begin_frame called while a frame is already active",
            )),
            FramePhase::Ended => Err(GpuError::invalid(
                "submit must be called before the next begin_frame",
            )),
        }
    }

    /// Fails unless a frame is active.
    pub fn check_end(&self) -> GpuResult<()> {
        match self.phase {
            FramePhase::Active => Ok(()),
            _ => Err(GpuError::invalid("begin_frame must be called before end_frame")),
        }
    }

    /// Fails unless a frame has ended.
    pub fn check_submit(&self) -> GpuResult<()> {
        match self.phase {
            FramePhase::Ended => Ok(()),
            _ => Err(GpuError::invalid("end_frame must be called before submit")),
        }
    }

    /// Fails unless idle. `operation` names the caller in the message.
    pub fn check_idle(&self, operation: &str) -> GpuResult<()> {
        match self.phase {
            FramePhase::Idle => Ok(()),
            FramePhase::Active => Err(GpuError::invalid(format!(
                "cannot {operation} while a frame is active"
            ))),
            FramePhase::Ended => Err(GpuError::invalid(format!(
                "submit must be called before {operation}"
            ))),
        }
    }

    pub(crate) fn mark_active(&mut self) {
        self.phase = FramePhase::Active;
    }

    pub(crate) fn mark_ended(&mut self) {
        self.phase = FramePhase::Ended;
    }

    /// Records the current frame as complete and moves to the next one.
    pub(crate) fn complete(&mut self) {
        self.last_completed = self.frame_counter;
        self.frame_counter += 1;
        self.phase = FramePhase::Idle;
    }

    /// Tag handed to the engine's flush.
    pub fn flush_tag(&self) -> FlushTag {
        FlushTag {
            current_frame: self.frame_counter,
            safe_frame: self.last_completed,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Command allocators and lists of the copy and direct queues.
#[derive(Debug)]
pub(crate) struct CommandSet {
    copy_allocator: Box<dyn CommandAllocator>,
    direct_allocator: Box<dyn CommandAllocator>,
    copy_list: Box<dyn CommandList>,
    direct_list: Box<dyn CommandList>,
}

impl CommandSet {
    pub(crate) fn new(native: &dyn NativeDevice) -> GpuResult<Self> {
        let mut copy_allocator = native.create_command_allocator(QueueKind::Copy)?;
        let mut direct_allocator = native.create_command_allocator(QueueKind::Direct)?;
        let copy_list = native.create_command_list(QueueKind::Copy, copy_allocator.as_mut())?;
        let direct_list =
            native.create_command_list(QueueKind::Direct, direct_allocator.as_mut())?;
        Ok(Self {
            copy_allocator,
            direct_allocator,
            copy_list,
            direct_list,
        })
    }

    /// Recycles both allocators and reopens both lists.
    pub(crate) fn reset(&mut self) -> GpuResult<()> {
        self.direct_allocator.reset()?;
        self.copy_allocator.reset()?;
        self.direct_list.reset(self.direct_allocator.as_mut())?;
        self.copy_list.reset(self.copy_allocator.as_mut())?;
        Ok(())
    }

    pub(crate) fn close(&mut self) -> GpuResult<()> {
        self.copy_list.close()?;
        self.direct_list.close()?;
        Ok(())
    }

    /// The copy and direct lists.
    pub(crate) fn lists(&mut self) -> (&mut dyn CommandList, &mut dyn CommandList) {
        (self.copy_list.as_mut(), self.direct_list.as_mut())
    }
}

/// Fences bridging the copy queue to the direct queue.
#[derive(Debug)]
pub(crate) struct FrameSync {
    copy_fence: Arc<dyn NativeFence>,
    direct_fence: Arc<dyn NativeFence>,
}

impl FrameSync {
    pub(crate) fn new(native: &dyn NativeDevice) -> GpuResult<Self> {
        Ok(Self {
            copy_fence: native.create_fence(0)?,
            direct_fence: native.create_fence(0)?,
        })
    }

    /// Executes both lists in order and blocks until both queues reach `value`.
    ///
    /// The copy list runs first and signals the copy fence; the direct queue
    /// waits on that value on the GPU before running the direct list.
    pub(crate) fn submit(
        &self,
        native: &dyn NativeDevice,
        commands: &mut CommandSet,
        value: u64,
    ) -> GpuResult<()> {
        let copy_queue = native.queue(QueueKind::Copy);
        let direct_queue = native.queue(QueueKind::Direct);

        copy_queue.execute(commands.copy_list.as_mut())?;
        copy_queue.signal(self.copy_fence.as_ref(), value)?;
        direct_queue.wait(self.copy_fence.as_ref(), value)?;
        direct_queue.execute(commands.direct_list.as_mut())?;
        direct_queue.signal(self.direct_fence.as_ref(), value)?;

        self.copy_fence.wait(value, None)?;
        self.direct_fence.wait(value, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::api::{BackendKind, DeviceFlags};
    use strata_core::renderer::traits::NativeApi;
    use strata_infra::{JournalEntry, SoftApi};

    #[test]
    fn clock_walks_the_frame_cycle() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.flush_tag(), FlushTag { current_frame: 1, safe_frame: 0 });
        assert!(clock.check_end().is_err());
        assert!(clock.check_submit().is_err());

        clock.check_begin().unwrap();
        clock.mark_active();
        assert!(clock.check_begin().is_err());
        assert!(clock.check_idle("present").is_err());

        clock.check_end().unwrap();
        clock.mark_ended();
        let err = clock.check_idle("present").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter: submit must be called before present"
        );

        clock.check_submit().unwrap();
        clock.complete();
        assert_eq!(clock.phase(), FramePhase::Idle);
        assert_eq!(clock.frame_counter(), 2);
        assert_eq!(clock.last_completed(), 1);
    }

    #[test]
    fn submit_orders_copy_before_direct() {
        let api = SoftApi::new(BackendKind::D3d12);
        let adapter = api.enumerate_adapters().unwrap().remove(0);
        let native = api.open_device(&adapter, DeviceFlags::NONE).unwrap();
        let mut commands = CommandSet::new(native.as_ref()).unwrap();
        let sync = FrameSync::new(native.as_ref()).unwrap();
        let journal = api.journal();

        commands.reset().unwrap();
        commands.close().unwrap();
        journal.clear();
        sync.submit(native.as_ref(), &mut commands, 1).unwrap();

        let order: Vec<_> = journal
            .entries()
            .into_iter()
            .map(|entry| match entry {
                JournalEntry::Execute(queue) => format!("execute {queue:?}"),
                JournalEntry::Signal { queue, value, .. } => format!("signal {queue:?} {value}"),
                JournalEntry::Wait { queue, value, .. } => format!("wait {queue:?} {value}"),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(
            order,
            vec![
                "execute Copy",
                "signal Copy 1",
                "wait Direct 1",
                "execute Direct",
                "signal Direct 1",
            ]
        );
        assert_eq!(sync.copy_fence.completed_value(), 1);
        assert_eq!(sync.direct_fence.completed_value(), 1);
    }

    #[test]
    fn open_lists_cannot_be_submitted() {
        let api = SoftApi::new(BackendKind::Vulkan);
        let adapter = api.enumerate_adapters().unwrap().remove(0);
        let native = api.open_device(&adapter, DeviceFlags::NONE).unwrap();
        let mut commands = CommandSet::new(native.as_ref()).unwrap();
        let sync = FrameSync::new(native.as_ref()).unwrap();

        let err = sync.submit(native.as_ref(), &mut commands, 1).unwrap_err();
        assert_eq!(err.status(), strata_core::Status::InternalError);
    }
}
