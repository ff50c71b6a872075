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

//! Timeline fences.
//!
//! Hardware devices back fences with a native timeline signaled from the
//! context's direct queue. Null devices have no GPU, so their fences are host
//! timelines that complete as soon as they are signaled.

use crate::context::Context;
use crate::device::{Device, DeviceBinding};
use crate::handle::{Handle, HandleKind, Retained};
use crate::sync::lock;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use strata_core::renderer::traits::{CommandQueue, NativeFence};
use strata_core::{GpuError, GpuResult, NativeError};

/// Wait timeout meaning "block until the value is reached".
pub const INFINITE_TIMEOUT_MS: u64 = u64::MAX;

#[derive(Debug, Default)]
struct HostTimeline {
    value: Mutex<u64>,
    advanced: Condvar,
}

impl HostTimeline {
    fn completed(&self) -> u64 {
        *lock(&self.value)
    }

    fn signal(&self, value: u64) {
        let mut current = lock(&self.value);
        if value > *current {
            *current = value;
        }
        self.advanced.notify_all();
    }

    fn wait(&self, value: u64, timeout: Option<Duration>) -> GpuResult<()> {
        let current = lock(&self.value);
        match timeout {
            None => {
                let _reached = self
                    .advanced
                    .wait_while(current, |current| *current < value)
                    .unwrap_or_else(PoisonError::into_inner);
                Ok(())
            }
            Some(timeout) => {
                let (current, _) = self
                    .advanced
                    .wait_timeout_while(current, timeout, |current| *current < value)
                    .unwrap_or_else(PoisonError::into_inner);
                if *current < value {
                    return Err(NativeError::Timeout.into());
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Timeline {
    Native(Arc<dyn NativeFence>),
    Host(Arc<HostTimeline>),
}

impl Timeline {
    fn completed(&self) -> u64 {
        match self {
            Timeline::Native(fence) => fence.completed_value(),
            Timeline::Host(timeline) => timeline.completed(),
        }
    }

    fn wait(&self, value: u64, timeout: Option<Duration>) -> GpuResult<()> {
        if self.completed() >= value {
            return Ok(());
        }
        match self {
            Timeline::Native(fence) => Ok(fence.wait(value, timeout)?),
            Timeline::Host(timeline) => timeline.wait(value, timeout),
        }
    }
}

/// A monotonically increasing GPU counter bound to one device.
#[derive(Debug)]
pub struct Fence {
    device: Retained<Device>,
    last_signaled: u64,
    timeline: Timeline,
}

impl HandleKind for Fence {
    const KIND: &'static str = "fence";
}

impl Fence {
    /// Creates a fence on `device` with a completed value of 0.
    pub fn create(device: &Handle<Device>) -> GpuResult<Handle<Fence>> {
        let edge = Retained::new(device)?;
        let timeline = device.with(|device| match device.binding() {
            DeviceBinding::Null => Ok(Timeline::Host(Arc::default())),
            _ => Ok(Timeline::Native(device.native()?.create_fence(0)?)),
        })?;
        Ok(Handle::new(Fence {
            device: edge,
            last_signaled: 0,
            timeline,
        }))
    }

    /// The owning device.
    pub fn device(&self) -> &Handle<Device> {
        self.device.handle()
    }

    /// Highest value a signal was requested for.
    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    /// Highest value the timeline has reached.
    pub fn completed_value(&self) -> u64 {
        self.timeline.completed()
    }

    /// Requests a signal of `value`, or of the next value when `value` is 0.
    ///
    /// The bookkeeping is rolled back if the queue rejects the signal.
    fn signal(&mut self, queue: Option<&dyn CommandQueue>, value: u64) -> GpuResult<u64> {
        let value = match value {
            0 => self
                .last_signaled
                .checked_add(1)
                .ok_or_else(|| GpuError::invalid("fence value overflow"))?,
            value => value,
        };
        if value <= self.last_signaled {
            return Err(GpuError::invalid(format!(
                "fence value {value} must exceed the last signaled value {}",
                self.last_signaled
            )));
        }

        let previous = self.last_signaled;
        self.last_signaled = value;
        let result = match (&self.timeline, queue) {
            (Timeline::Native(fence), Some(queue)) => {
                queue.signal(fence.as_ref(), value).map_err(GpuError::from)
            }
            (Timeline::Host(timeline), _) => {
                timeline.signal(value);
                Ok(())
            }
            (Timeline::Native(_), None) => {
                Err(GpuError::internal("native fence signaled without a queue"))
            }
        };
        if let Err(err) = result {
            self.last_signaled = previous;
            return Err(err);
        }
        Ok(value)
    }
}

impl Handle<Fence> {
    /// See [`Fence::completed_value`].
    pub fn completed_value(&self) -> GpuResult<u64> {
        self.with(|fence| Ok(fence.completed_value()))
    }

    /// Blocks until the fence reaches `value` or `timeout_ms` elapses.
    ///
    /// [`INFINITE_TIMEOUT_MS`] waits without bound. The fence is not locked
    /// while waiting, so other threads can signal it.
    pub fn wait(&self, value: u64, timeout_ms: u64) -> GpuResult<()> {
        let timeline = self.with(|fence| Ok(fence.timeline.clone()))?;
        let timeout = (timeout_ms != INFINITE_TIMEOUT_MS).then(|| Duration::from_millis(timeout_ms));
        timeline.wait(value, timeout)
    }
}

impl Handle<Context> {
    /// Signals `fence` with `value` from this context's direct queue.
    ///
    /// `value` 0 signals the value after the last one. Returns the value
    /// signaled.
    pub fn signal_fence(&self, fence: &Handle<Fence>, value: u64) -> GpuResult<u64> {
        self.with(|context| {
            let queue = context.signal_queue();
            let device = context.device().clone();
            fence.with(|fence| {
                if !fence.device().ptr_eq(&device) {
                    return Err(GpuError::invalid(
                        "fence and context belong to different devices",
                    ));
                }
                fence.signal(queue.as_deref(), value)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn null_pair() -> (Handle<Context>, Handle<Fence>) {
        let device = Handle::new(Device::null());
        let context = Context::create(&device, 4, 4).unwrap();
        let fence = Fence::create(&device).unwrap();
        device.release().unwrap();
        (context, fence)
    }

    #[test]
    fn signals_must_increase() {
        let (context, fence) = null_pair();
        assert_eq!(context.signal_fence(&fence, 5).unwrap(), 5);
        assert!(matches!(
            context.signal_fence(&fence, 5),
            Err(GpuError::InvalidParameter(_))
        ));
        assert!(matches!(
            context.signal_fence(&fence, 3),
            Err(GpuError::InvalidParameter(_))
        ));
        assert_eq!(fence.with(|fence| Ok(fence.last_signaled())).unwrap(), 5);

        assert_eq!(context.signal_fence(&fence, 0).unwrap(), 6);
        assert_eq!(fence.completed_value().unwrap(), 6);
    }

    #[test]
    fn wait_returns_once_signaled() {
        let (context, fence) = null_pair();
        context.signal_fence(&fence, 2).unwrap();
        fence.wait(2, 0).unwrap();
        fence.wait(1, INFINITE_TIMEOUT_MS).unwrap();
    }

    #[test]
    fn wait_times_out_as_invalid_parameter() {
        let (_context, fence) = null_pair();
        let err = fence.wait(1, 10).unwrap_err();
        assert!(matches!(err, GpuError::InvalidParameter(_)));
    }

    #[test]
    fn waiters_wake_on_signal_from_another_thread() {
        let (context, fence) = null_pair();
        let waiter = {
            let fence = fence.clone();
            thread::spawn(move || fence.wait(3, INFINITE_TIMEOUT_MS))
        };
        thread::sleep(Duration::from_millis(20));
        context.signal_fence(&fence, 3).unwrap();
        waiter.join().unwrap().unwrap();
    }

    #[test]
    fn fences_of_another_device_are_rejected() {
        let (context, _) = null_pair();
        let other = Handle::new(Device::null());
        let fence = Fence::create(&other).unwrap();
        assert!(matches!(
            context.signal_fence(&fence, 1),
            Err(GpuError::InvalidParameter(_))
        ));
        assert_eq!(fence.with(|fence| Ok(fence.last_signaled())).unwrap(), 0);
    }
}
